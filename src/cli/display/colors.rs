//! Color theme for CLI output

use crate::domain::resource::ExistenceState;
use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub info: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            info: TableColor::Cyan,
            muted: TableColor::DarkGrey,
        }
    }
}

impl ColorTheme {
    pub fn get_state_color(&self, state: ExistenceState) -> TableColor {
        match state {
            ExistenceState::Active => self.success,
            ExistenceState::Pending => self.warning,
            ExistenceState::Absent => self.error,
        }
    }

    /// Get color based on running/desired task counts
    pub fn get_count_color(&self, running: u32, desired: u32) -> TableColor {
        if desired == 0 {
            self.muted
        } else if running >= desired {
            self.success
        } else if running > 0 {
            self.warning
        } else {
            self.error
        }
    }

    /// Color for a cluster with `present` of `total` children
    pub fn get_completeness_color(&self, present: usize, total: usize) -> TableColor {
        if total == 0 {
            self.muted
        } else if present == total {
            self.success
        } else if present > 0 {
            self.warning
        } else {
            self.error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_theme() {
        let theme = ColorTheme::default();
        assert_eq!(theme.success, TableColor::Green);
        assert_eq!(theme.warning, TableColor::Yellow);
        assert_eq!(theme.error, TableColor::Red);
    }

    #[test]
    fn test_get_state_color() {
        let theme = ColorTheme::default();
        assert_eq!(theme.get_state_color(ExistenceState::Active), TableColor::Green);
        assert_eq!(theme.get_state_color(ExistenceState::Pending), TableColor::Yellow);
        assert_eq!(theme.get_state_color(ExistenceState::Absent), TableColor::Red);
    }

    #[test]
    fn test_get_count_color() {
        let theme = ColorTheme::default();
        assert_eq!(theme.get_count_color(3, 3), TableColor::Green);
        assert_eq!(theme.get_count_color(2, 3), TableColor::Yellow);
        assert_eq!(theme.get_count_color(0, 3), TableColor::Red);
        assert_eq!(theme.get_count_color(0, 0), TableColor::DarkGrey);
        assert_eq!(theme.get_completeness_color(3, 7), TableColor::Yellow);
    }
}
