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

use crate::domain::cluster::request::ClusterRequest;
use crate::domain::config::ProvisionerConfig;
use crate::infrastructure::constants::{BOOTSTRAP_TAG_KEY, CLUSTER_NAME_MAX_LEN, CLUSTER_NAME_PATTERN};
use crate::shared::error::{ProvisionError, Result};
use regex::Regex;

/// Checks a request before any remote call is made.
pub struct ClusterValidator<'a> {
    config: &'a ProvisionerConfig,
    name_pattern: Regex,
}

impl<'a> ClusterValidator<'a> {
    pub fn new(config: &'a ProvisionerConfig) -> Result<Self> {
        let name_pattern = Regex::new(CLUSTER_NAME_PATTERN).map_err(|e| {
            ProvisionError::improperly_configured(format!("Invalid cluster name pattern: {}", e))
        })?;
        Ok(Self {
            config,
            name_pattern,
        })
    }

    pub fn validate_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(ProvisionError::improperly_configured(
                "A cluster name is required",
            ));
        }
        if name.len() > CLUSTER_NAME_MAX_LEN {
            return Err(ProvisionError::improperly_configured(format!(
                "Cluster name '{}' is {} characters long; the limit is {}",
                name,
                name.len(),
                CLUSTER_NAME_MAX_LEN
            )));
        }
        if !self.name_pattern.is_match(name) {
            return Err(ProvisionError::improperly_configured(format!(
                "Cluster name '{}' may only contain letters, digits, '-' and '_'",
                name
            )));
        }
        Ok(())
    }

    pub fn validate_create(&self, request: &ClusterRequest) -> Result<()> {
        self.validate_name(&request.name)?;
        self.validate_placement(request)?;
        self.validate_sizes(request)?;
        self.validate_tags(request)?;
        self.validate_registry(request)?;
        Ok(())
    }

    fn validate_placement(&self, request: &ClusterRequest) -> Result<()> {
        if request.network.is_some() && !request.zones.is_empty() {
            return Err(ProvisionError::improperly_configured(
                "Zones cannot be combined with a network. Give subnets of the network instead.",
            ));
        }
        if request.zones.is_empty() && request.subnets.is_empty() {
            return Err(ProvisionError::improperly_configured(
                "At least one zone or subnet is required",
            ));
        }

        let excluded: Vec<&str> = request
            .zones
            .iter()
            .filter(|zone| self.config.excluded_zones.contains(zone))
            .map(String::as_str)
            .collect();
        if !excluded.is_empty() {
            return Err(ProvisionError::improperly_configured(format!(
                "Cluster instances cannot be placed in: {}",
                excluded.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_sizes(&self, request: &ClusterRequest) -> Result<()> {
        if request.max_size == 0 {
            return Err(ProvisionError::improperly_configured(
                "max size must be > 0",
            ));
        }
        if request.min_size > request.desired_size || request.desired_size > request.max_size {
            return Err(ProvisionError::improperly_configured(format!(
                "Sizes must satisfy min <= desired <= max (got {} / {} / {})",
                request.min_size, request.desired_size, request.max_size
            )));
        }
        Ok(())
    }

    fn validate_tags(&self, request: &ClusterRequest) -> Result<()> {
        let reserved = [self.config.ownership_tag_key.as_str(), BOOTSTRAP_TAG_KEY];
        if let Some(tag) = request
            .tags
            .iter()
            .find(|tag| reserved.contains(&tag.key.as_str()))
        {
            return Err(ProvisionError::improperly_configured(format!(
                "The tag key '{}' is reserved",
                tag.key
            )));
        }
        Ok(())
    }

    fn validate_registry(&self, request: &ClusterRequest) -> Result<()> {
        let registry = &request.registry;
        if !registry.is_empty() && !registry.is_complete() {
            return Err(ProvisionError::improperly_configured(
                "Registry credentials need an email, a username and a password",
            ));
        }
        Ok(())
    }
}
