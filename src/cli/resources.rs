//! Single-resource commands

use super::display::{StatusIcon, TableRenderer};
use super::session::Session;
use crate::domain::cluster::request::read_document;
use crate::domain::jobs::{catalog, lifecycle};
use crate::domain::resource::{Resource, ResourceKind};
use crate::infrastructure::provider::{
    BucketSpec, InstanceProfileSpec, PolicySpec, RoleSpec, SecurityGroupSpec,
};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Resource kind (policy, role, instance-profile, security-group,
    /// launch-config, autoscaling-group, cluster, load-balancer, bucket, object)
    pub kind: ResourceKind,
}

impl ListCommand {
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let resources = catalog::list(session.provider(), session.profile(), self.kind).await?;
        println!(
            "{}",
            TableRenderer::new().render_resources(self.kind, &resources)
        );
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    pub kind: ResourceKind,

    pub name: String,
}

impl DeleteCommand {
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let poll = session.descriptor().schedules().visibility;
        catalog::delete(
            session.provider(),
            session.profile(),
            self.kind,
            &self.name,
            poll,
        )
        .await?;
        println!(
            "{} Deleted {} '{}'",
            StatusIcon::SUCCESS.green(),
            self.kind,
            self.name
        );
        Ok(())
    }
}

/// A named resource created from a JSON document
#[derive(clap::Args, Debug, Clone)]
pub struct DocumentArgs {
    pub name: String,

    /// Read the document from a file
    #[arg(long, value_name = "PATH", conflicts_with = "document")]
    pub document_file: Option<PathBuf>,

    /// Inline JSON document
    #[arg(long, value_name = "JSON")]
    pub document: Option<String>,
}

impl DocumentArgs {
    fn read(&self, kind: ResourceKind) -> anyhow::Result<serde_json::Value> {
        Ok(read_document(
            self.document_file.as_deref(),
            self.document.as_deref(),
            kind,
        )?)
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct NameArgs {
    pub name: String,
}

#[derive(clap::Subcommand, Debug)]
pub enum CreateCommand {
    /// Create a policy from a permissions document
    Policy(DocumentArgs),

    /// Create a role from a trust document
    Role(DocumentArgs),

    /// Create an empty instance profile
    InstanceProfile(NameArgs),

    /// Create a private bucket
    Bucket(NameArgs),

    /// Create a security group
    SecurityGroup {
        name: String,

        /// Network (VPC) to create the group in
        #[arg(long)]
        network: Option<String>,

        #[arg(long, default_value = "Created by armada")]
        description: String,
    },
}

impl CreateCommand {
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let provider = session.provider();
        let profile = session.profile();
        let poll = session.descriptor().schedules().visibility;

        let created: Resource = match self {
            CreateCommand::Policy(args) => {
                let spec = PolicySpec {
                    name: args.name.clone(),
                    document: args.read(ResourceKind::Policy)?,
                };
                lifecycle::create_and_wait(provider.policies(), profile, &args.name, &spec, poll)
                    .await?
            }
            CreateCommand::Role(args) => {
                let spec = RoleSpec {
                    name: args.name.clone(),
                    trust_document: args.read(ResourceKind::Role)?,
                };
                lifecycle::create_and_wait(provider.roles(), profile, &args.name, &spec, poll)
                    .await?
            }
            CreateCommand::InstanceProfile(args) => {
                let spec = InstanceProfileSpec {
                    name: args.name.clone(),
                };
                lifecycle::create_and_wait(
                    provider.instance_profiles(),
                    profile,
                    &args.name,
                    &spec,
                    poll,
                )
                .await?
            }
            CreateCommand::Bucket(args) => {
                let spec = BucketSpec {
                    name: args.name.clone(),
                    private: true,
                };
                lifecycle::create_and_wait(provider.buckets(), profile, &args.name, &spec, poll)
                    .await?
            }
            CreateCommand::SecurityGroup {
                name,
                network,
                description,
            } => {
                let spec = SecurityGroupSpec {
                    name: name.clone(),
                    description: description.clone(),
                    network: network.clone(),
                };
                lifecycle::create_and_wait(provider.security_groups(), profile, name, &spec, poll)
                    .await?
            }
        };

        println!(
            "{}",
            TableRenderer::new().render_resources(created.kind, std::slice::from_ref(&created))
        );
        println!(
            "{} Created {} '{}'",
            StatusIcon::SUCCESS.green(),
            created.kind,
            created.name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CliArgs, Commands};

    #[test]
    fn test_document_sources_conflict() {
        let result = CliArgs::try_parse_from([
            "armada",
            "create",
            "policy",
            "p",
            "--document",
            "{}",
            "--document-file",
            "p.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_inline_document() {
        let args = CliArgs::try_parse_from([
            "armada",
            "create",
            "role",
            "r",
            "--document",
            r#"{"Version": "2012-10-17"}"#,
        ])
        .unwrap();
        match args.command {
            Commands::Create(CreateCommand::Role(doc)) => {
                let value = doc.read(ResourceKind::Role).unwrap();
                assert_eq!(value["Version"], "2012-10-17");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_missing_document() {
        let doc = DocumentArgs {
            name: "p".to_string(),
            document_file: None,
            document: None,
        };
        assert!(doc.read(ResourceKind::Policy).is_err());
    }
}
