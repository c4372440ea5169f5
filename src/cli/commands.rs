// CLI command definitions

use super::cluster::ClusterCommand;
use super::reporter::ReportLevel;
use super::resources::{CreateCommand, DeleteCommand, ListCommand};
use super::session::Session;
use crate::infrastructure::constants::{DEFAULT_PROFILE, DEFAULT_REGION, DEFAULT_STATE_FILE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "armada",
    version,
    about = "Provision and decommission container clusters",
    long_about = "A CLI tool that creates and tears down container clusters together with their roles, security groups, launch configurations and autoscaling groups"
)]
pub struct CliArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Credential profile to act as
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Region to operate in
    #[arg(long, global = true, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Path to the provisioner configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where the provider state is kept between invocations
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// How much job progress to print
    #[arg(long, global = true, value_enum, default_value_t = ReportLevel::Jobs)]
    pub report: ReportLevel,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Create, delete and inspect clusters
    #[command(subcommand)]
    Cluster(ClusterCommand),

    /// List all resources of one kind
    List(ListCommand),

    /// Create a single resource
    #[command(subcommand)]
    Create(CreateCommand),

    /// Delete a single resource
    Delete(DeleteCommand),
}

impl CliArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let session = Session::open(&self.global)?;

        let outcome = match &self.command {
            Commands::Cluster(cmd) => cmd.execute(&session).await,
            Commands::List(cmd) => cmd.execute(&session).await,
            Commands::Create(cmd) => cmd.execute(&session).await,
            Commands::Delete(cmd) => cmd.execute(&session).await,
        };

        // Partial work of a failed job is still recorded
        let saved = session.close().await;
        outcome?;
        saved
    }
}
