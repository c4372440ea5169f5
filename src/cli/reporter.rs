//! Console progress output for cluster jobs

use crate::domain::report::Reporter;
use clap::ValueEnum;
use colored::Colorize;
use serde_json::Value;

/// How much job progress reaches the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum ReportLevel {
    /// Warnings and errors only
    Quiet,
    /// Step headings and messages
    Jobs,
    /// Everything, including provider responses
    Data,
}

pub struct ConsoleReporter {
    level: ReportLevel,
}

impl ConsoleReporter {
    pub fn new(level: ReportLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> ReportLevel {
        self.level
    }

    fn shows(&self, level: ReportLevel) -> bool {
        self.level >= level
    }
}

impl Reporter for ConsoleReporter {
    fn heading(&self, title: &str) {
        if self.shows(ReportLevel::Jobs) {
            println!("{} {}", "→".cyan(), title.bold());
        }
    }

    fn message(&self, text: &str) {
        if self.shows(ReportLevel::Jobs) {
            println!("  {}", text);
        }
    }

    fn data(&self, label: &str, value: &Value) {
        if self.shows(ReportLevel::Data) {
            let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            println!("  {}:", label.bright_black());
            for line in body.lines() {
                println!("    {}", line.bright_black());
            }
        }
    }

    fn warning(&self, text: &str) {
        eprintln!("{} {}", "⚠".yellow(), text.yellow());
    }

    fn error(&self, text: &str) {
        eprintln!("{} {}", "✗".red(), text.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(ReportLevel::Data > ReportLevel::Jobs);
        assert!(ReportLevel::Jobs > ReportLevel::Quiet);

        let quiet = ConsoleReporter::new(ReportLevel::Quiet);
        assert!(!quiet.shows(ReportLevel::Jobs));
        let data = ConsoleReporter::new(ReportLevel::Data);
        assert!(data.shows(ReportLevel::Jobs));
        assert_eq!(data.level(), ReportLevel::Data);
    }

    #[test]
    fn test_level_names() {
        let level = ReportLevel::from_str("data", true).unwrap();
        assert_eq!(level, ReportLevel::Data);
        assert!(ReportLevel::from_str("verbose", true).is_err());
    }
}
