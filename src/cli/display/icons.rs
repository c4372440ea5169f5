//! Status icons for CLI output

use crate::domain::resource::ExistenceState;

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// Success icon (resource active, all tasks running)
    pub const SUCCESS: &'static str = "✓";

    /// Warning icon (partially present)
    pub const WARNING: &'static str = "⚠";

    /// Error icon (missing)
    pub const ERROR: &'static str = "✗";

    /// Pending icon (created but not yet visible)
    pub const PENDING: &'static str = "⏳";

    pub const UNKNOWN: &'static str = "?";

    pub fn for_state(state: ExistenceState) -> &'static str {
        match state {
            ExistenceState::Active => Self::SUCCESS,
            ExistenceState::Pending => Self::PENDING,
            ExistenceState::Absent => Self::ERROR,
        }
    }

    /// Icon for running/desired task counts of a service
    pub fn get_count_icon(running: u32, desired: u32) -> &'static str {
        if desired == 0 {
            Self::UNKNOWN
        } else if running >= desired {
            Self::SUCCESS
        } else if running > 0 {
            Self::WARNING
        } else {
            Self::ERROR
        }
    }

    /// Overall text for a cluster with `present` of `total` children
    pub fn get_status_text(present: usize, total: usize) -> &'static str {
        if total == 0 {
            "Unknown"
        } else if present == total {
            "Complete"
        } else if present > 0 {
            "Partial"
        } else {
            "Absent"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_state() {
        assert_eq!(StatusIcon::for_state(ExistenceState::Active), StatusIcon::SUCCESS);
        assert_eq!(StatusIcon::for_state(ExistenceState::Pending), StatusIcon::PENDING);
        assert_eq!(StatusIcon::for_state(ExistenceState::Absent), StatusIcon::ERROR);
    }

    #[test]
    fn test_get_count_icon() {
        assert_eq!(StatusIcon::get_count_icon(3, 3), StatusIcon::SUCCESS);
        assert_eq!(StatusIcon::get_count_icon(2, 3), StatusIcon::WARNING);
        assert_eq!(StatusIcon::get_count_icon(0, 3), StatusIcon::ERROR);
        assert_eq!(StatusIcon::get_count_icon(0, 0), StatusIcon::UNKNOWN);
    }

    #[test]
    fn test_get_status_text() {
        assert_eq!(StatusIcon::get_status_text(7, 7), "Complete");
        assert_eq!(StatusIcon::get_status_text(2, 7), "Partial");
        assert_eq!(StatusIcon::get_status_text(0, 7), "Absent");
        assert_eq!(StatusIcon::get_status_text(0, 0), "Unknown");
    }
}
