//! Per-invocation state shared by every command

use crate::cli::commands::GlobalArgs;
use crate::cli::reporter::ConsoleReporter;
use crate::domain::cluster::ClusterDescriptor;
use crate::domain::config::ProvisionerConfig;
use crate::infrastructure::provider::{CloudProvider, Profile, SandboxProvider};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct Session {
    sandbox: Arc<SandboxProvider>,
    descriptor: ClusterDescriptor,
    state_file: PathBuf,
}

impl Session {
    /// Load the configuration and the provider state named by the global flags.
    pub fn open(args: &GlobalArgs) -> anyhow::Result<Self> {
        let config = match &args.config {
            Some(path) => ProvisionerConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => ProvisionerConfig::default(),
        };

        let sandbox = Arc::new(SandboxProvider::load(
            &args.state_file,
            config.sandbox.clone(),
        )?);
        debug!(
            "Using {} provider state at {}",
            sandbox.name(),
            args.state_file.display()
        );

        let reporter = Arc::new(ConsoleReporter::new(args.report));
        let profile = Profile::new(&args.profile, &args.region);
        let descriptor =
            ClusterDescriptor::new(sandbox.clone(), profile, config)?.with_reporter(reporter);

        Ok(Self {
            sandbox,
            descriptor,
            state_file: args.state_file.clone(),
        })
    }

    pub fn descriptor(&self) -> &ClusterDescriptor {
        &self.descriptor
    }

    pub fn provider(&self) -> &dyn CloudProvider {
        self.descriptor.provider()
    }

    pub fn profile(&self) -> &Profile {
        self.descriptor.profile()
    }

    /// Persist the provider state.
    pub async fn close(&self) -> anyhow::Result<()> {
        self.sandbox
            .save(&self.state_file)
            .await
            .with_context(|| format!("Failed to save state to {}", self.state_file.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::reporter::ReportLevel;
    use crate::domain::resource::ResourceKind;
    use crate::infrastructure::constants::{DEFAULT_PROFILE, DEFAULT_REGION};
    use crate::domain::jobs::{catalog, lifecycle, PollSpec};
    use crate::infrastructure::provider::BucketSpec;
    use std::time::Duration;

    fn args(dir: &std::path::Path) -> GlobalArgs {
        GlobalArgs {
            profile: DEFAULT_PROFILE.to_string(),
            region: DEFAULT_REGION.to_string(),
            config: None,
            state_file: dir.join("state.json"),
            report: ReportLevel::Quiet,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_state_survives_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path());

        let session = Session::open(&args).unwrap();
        lifecycle::create_and_wait(
            session.provider().buckets(),
            session.profile(),
            "assets",
            &BucketSpec {
                name: "assets".to_string(),
                private: true,
            },
            PollSpec::new(5, Duration::ZERO).unwrap(),
        )
        .await
        .unwrap();
        session.close().await.unwrap();

        let session = Session::open(&args).unwrap();
        let buckets = catalog::list(
            session.provider(),
            session.profile(),
            ResourceKind::Bucket,
        )
        .await
        .unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, "assets");
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path());
        args.config = Some(dir.path().join("missing.toml"));
        let err = Session::open(&args).err().unwrap();
        assert!(err.to_string().contains("missing.toml"));
    }
}
