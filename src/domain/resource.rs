// Copyright 2025 Armada Team.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Provider resources as seen by the job layer

use crate::shared::error::ProvisionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Policy,
    Role,
    InstanceProfile,
    SecurityGroup,
    LaunchConfiguration,
    AutoScalingGroup,
    Cluster,
    Service,
    Instance,
    LoadBalancer,
    Bucket,
    Object,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 12] = [
        ResourceKind::Policy,
        ResourceKind::Role,
        ResourceKind::InstanceProfile,
        ResourceKind::SecurityGroup,
        ResourceKind::LaunchConfiguration,
        ResourceKind::AutoScalingGroup,
        ResourceKind::Cluster,
        ResourceKind::Service,
        ResourceKind::Instance,
        ResourceKind::LoadBalancer,
        ResourceKind::Bucket,
        ResourceKind::Object,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Policy => "policy",
            ResourceKind::Role => "role",
            ResourceKind::InstanceProfile => "instance-profile",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::LaunchConfiguration => "launch-config",
            ResourceKind::AutoScalingGroup => "autoscaling-group",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Service => "service",
            ResourceKind::Instance => "instance",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::Bucket => "bucket",
            ResourceKind::Object => "object",
        }
    }

    /// Human readable label used in messages ("launch configuration", ...)
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Policy => "policy",
            ResourceKind::Role => "role",
            ResourceKind::InstanceProfile => "instance profile",
            ResourceKind::SecurityGroup => "security group",
            ResourceKind::LaunchConfiguration => "launch configuration",
            ResourceKind::AutoScalingGroup => "auto scaling group",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Service => "service",
            ResourceKind::Instance => "instance",
            ResourceKind::LoadBalancer => "load balancer",
            ResourceKind::Bucket => "bucket",
            ResourceKind::Object => "object",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ProvisionError::ImproperlyConfigured(format!("Unknown resource kind: {}", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistenceState {
    Absent,
    Pending,
    Active,
}

impl ExistenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExistenceState::Absent => "absent",
            ExistenceState::Pending => "pending",
            ExistenceState::Active => "active",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a `KEY:VALUE` pair as given on the command line.
    pub fn parse(s: &str) -> Result<Self, ProvisionError> {
        match s.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok(Tag::new(key.trim(), value.trim()))
            }
            _ => Err(ProvisionError::ImproperlyConfigured(format!(
                "Invalid tag '{}'. Expected 'KEY:VALUE'",
                s
            ))),
        }
    }
}

/// A resource as last reported by the provider. Never cached across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
    pub id: String,
    pub state: ExistenceState,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn exists(&self) -> bool {
        self.state != ExistenceState::Absent
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef {
            name: self.name.clone(),
            id: self.id.clone(),
        }
    }
}

/// What a delete call needs: some providers key deletes by opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert!("vpc".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_parse_tag() {
        let tag = Tag::parse("team: platform").unwrap();
        assert_eq!(tag, Tag::new("team", "platform"));

        let tag = Tag::parse("url:http://example").unwrap();
        assert_eq!(tag.value, "http://example");

        assert!(Tag::parse("novalue").is_err());
        assert!(Tag::parse(":value").is_err());
    }

    #[test]
    fn test_absent_resource_does_not_exist() {
        let resource = Resource {
            kind: ResourceKind::Cluster,
            name: "demo".to_string(),
            id: "arn:demo".to_string(),
            state: ExistenceState::Absent,
            tags: vec![Tag::new("ECS Cluster", "demo")],
            created_at: None,
        };
        assert!(!resource.exists());
        assert_eq!(resource.tag("ECS Cluster"), Some("demo"));
        assert_eq!(resource.tag("missing"), None);
    }
}
