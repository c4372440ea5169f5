//! Cluster commands

use super::display::{StatusIcon, TableRenderer};
use super::session::Session;
use crate::domain::cluster::{ClusterRequest, RegistryCredentials, UserDataFile};
use crate::domain::resource::Tag;
use clap::Parser;
use colored::Colorize;

#[derive(clap::Subcommand, Debug)]
pub enum ClusterCommand {
    /// Create a cluster with its role, security group and autoscaling group
    Create(CreateClusterCommand),

    /// Tear down a cluster and everything created for it
    Delete(DeleteClusterCommand),

    /// List active clusters
    List(ListClustersCommand),

    /// Show which resources of a cluster exist
    Status(StatusCommand),

    /// Attach a load balancer to the cluster's autoscaling group
    Serve(ServeCommand),

    /// Detach a load balancer from the cluster's autoscaling group
    Unserve(ServeCommand),
}

impl ClusterCommand {
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        match self {
            ClusterCommand::Create(cmd) => cmd.execute(session).await,
            ClusterCommand::Delete(cmd) => cmd.execute(session).await,
            ClusterCommand::List(cmd) => cmd.execute(session).await,
            ClusterCommand::Status(cmd) => cmd.execute(session).await,
            ClusterCommand::Serve(cmd) => cmd.serve(session).await,
            ClusterCommand::Unserve(cmd) => cmd.unserve(session).await,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct CreateClusterCommand {
    /// Cluster name (letters, digits, '-' and '_')
    pub name: String,

    /// Instance type; the configured default otherwise
    #[arg(long, short = 't')]
    pub instance_type: Option<String>,

    /// Machine image; the region's container-optimized image otherwise
    #[arg(long)]
    pub image: Option<String>,

    /// Key pair installed on the instances
    #[arg(long)]
    pub key_pair: Option<String>,

    /// Additional security group, by name or id (repeatable)
    #[arg(long = "security-group")]
    pub security_groups: Vec<String>,

    /// Network (VPC) to place the cluster in; requires --subnet
    #[arg(long)]
    pub network: Option<String>,

    /// Subnet of the network (repeatable)
    #[arg(long = "subnet")]
    pub subnets: Vec<String>,

    /// Availability zone (repeatable)
    #[arg(long = "zone", short = 'z')]
    pub zones: Vec<String>,

    #[arg(long, default_value = "1")]
    pub min_size: u32,

    #[arg(long, default_value = "1")]
    pub max_size: u32,

    #[arg(long, default_value = "1")]
    pub desired_size: u32,

    /// Give instances a public IP address
    #[arg(long)]
    pub public_ip: bool,

    /// Tag for the autoscaling group as KEY:VALUE (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// User data file as PATH[:TYPE] (repeatable)
    #[arg(long = "user-data-file")]
    pub user_data_files: Vec<String>,

    /// Private registry URL; Docker Hub otherwise
    #[arg(long)]
    pub registry_url: Option<String>,

    #[arg(long)]
    pub registry_email: Option<String>,

    #[arg(long)]
    pub registry_username: Option<String>,

    #[arg(long)]
    pub registry_password: Option<String>,
}

impl CreateClusterCommand {
    pub fn to_request(&self) -> anyhow::Result<ClusterRequest> {
        let mut request = ClusterRequest::new(&self.name)
            .with_zones(self.zones.iter().cloned())
            .with_subnets(self.subnets.iter().cloned())
            .with_size(self.min_size, self.desired_size, self.max_size);
        request.instance_type = self.instance_type.clone();
        request.image = self.image.clone();
        request.key_pair = self.key_pair.clone();
        request.security_groups = self.security_groups.clone();
        request.network = self.network.clone();
        request.public_ip = self.public_ip;
        request.tags = self
            .tags
            .iter()
            .map(|t| Tag::parse(t))
            .collect::<Result<_, _>>()?;
        request.user_data_files = self
            .user_data_files
            .iter()
            .map(|f| UserDataFile::parse(f))
            .collect::<Result<_, _>>()?;
        request.registry = RegistryCredentials {
            url: self.registry_url.clone(),
            email: self.registry_email.clone(),
            username: self.registry_username.clone(),
            password: self.registry_password.clone(),
        };
        Ok(request)
    }

    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let request = self.to_request()?;
        let description = session.descriptor().create_cluster(&request).await?;

        println!("{}", TableRenderer::new().render_description(&description));
        println!(
            "{} Cluster {} created successfully!",
            StatusIcon::SUCCESS.green(),
            description.name
        );
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteClusterCommand {
    pub name: String,
}

impl DeleteClusterCommand {
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let summary = session.descriptor().delete_cluster(&self.name).await?;

        println!("{}", TableRenderer::new().render_teardown(&summary));
        println!(
            "{} Cluster {} deleted successfully!",
            StatusIcon::SUCCESS.green(),
            summary.cluster
        );
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ListClustersCommand {}

impl ListClustersCommand {
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let clusters = session.descriptor().list_clusters().await?;
        println!("{}", TableRenderer::new().render_clusters_list(&clusters));
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct StatusCommand {
    pub name: String,
}

impl StatusCommand {
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let status = session.descriptor().get_cluster_status(&self.name).await?;
        println!("{}", TableRenderer::new().render_cluster_status(&status));
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ServeCommand {
    /// Cluster name
    pub name: String,

    /// Load balancer name
    #[arg(long, short = 'l')]
    pub load_balancer: String,
}

impl ServeCommand {
    pub async fn serve(&self, session: &Session) -> anyhow::Result<()> {
        session
            .descriptor()
            .serve(&self.name, &self.load_balancer)
            .await?;
        println!(
            "{} Load balancer {} now serves cluster {}",
            StatusIcon::SUCCESS.green(),
            self.load_balancer,
            self.name
        );
        Ok(())
    }

    pub async fn unserve(&self, session: &Session) -> anyhow::Result<()> {
        session
            .descriptor()
            .unserve(&self.name, &self.load_balancer)
            .await?;
        println!(
            "{} Load balancer {} no longer serves cluster {}",
            StatusIcon::SUCCESS.green(),
            self.load_balancer,
            self.name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliArgs;
    use crate::cli::Commands;

    fn parse_create(args: &[&str]) -> CreateClusterCommand {
        let mut argv = vec!["armada", "cluster", "create"];
        argv.extend_from_slice(args);
        match CliArgs::try_parse_from(argv).unwrap().command {
            Commands::Cluster(ClusterCommand::Create(cmd)) => cmd,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_create_request_from_flags() {
        let cmd = parse_create(&[
            "demo",
            "-z",
            "us-east-1b",
            "--zone",
            "us-east-1c",
            "--security-group",
            "sg-0001",
            "--tag",
            "team:infra",
            "--max-size",
            "3",
            "--desired-size",
            "2",
            "--user-data-file",
            "boot.yml:text/cloud-config",
        ]);
        let request = cmd.to_request().unwrap();
        assert_eq!(request.name, "demo");
        assert_eq!(request.zones, vec!["us-east-1b", "us-east-1c"]);
        assert_eq!(request.security_groups, vec!["sg-0001"]);
        assert_eq!(request.tags, vec![Tag::new("team", "infra")]);
        assert_eq!((request.min_size, request.desired_size, request.max_size), (1, 2, 3));
        assert_eq!(request.user_data_files[0].content_type, "text/cloud-config");
        assert!(request.registry.is_empty());
    }

    #[test]
    fn test_malformed_tag_is_rejected() {
        let cmd = parse_create(&["demo", "-z", "us-east-1b", "--tag", "no-separator"]);
        let err = cmd.to_request().unwrap_err();
        assert!(err.to_string().contains("KEY:VALUE"));
    }
}
