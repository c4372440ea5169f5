//! Command line interface

pub mod cluster;
pub mod commands;
pub mod display;
pub mod reporter;
pub mod resources;
pub mod session;

pub use commands::{CliArgs, Commands, GlobalArgs};
pub use reporter::{ConsoleReporter, ReportLevel};
pub use session::Session;
