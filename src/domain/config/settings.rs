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

use crate::domain::jobs::PollSpec;
use crate::infrastructure::constants::{
    DEFAULT_IMAGES, DEFAULT_INSTANCE_TYPE, INSTANCE_TERMINATION_INTERVAL_SECS,
    INSTANCE_TERMINATION_MAX_ATTEMPTS, LAUNCH_CONFIG_INTERVAL_SECS, LAUNCH_CONFIG_MAX_ATTEMPTS,
    OWNERSHIP_TAG_KEY, SECURITY_GROUP_DELETE_INTERVAL_SECS, SECURITY_GROUP_DELETE_MAX_ATTEMPTS,
    VISIBILITY_INTERVAL_SECS, VISIBILITY_MAX_ATTEMPTS,
};
use crate::infrastructure::provider::SandboxOptions;
use crate::shared::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;

/// Provisioner lookup tables and schedules, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvisionerConfig {
    /// Region → container-optimized machine image.
    pub images: BTreeMap<String, String>,
    /// Availability zones the provider cannot place cluster instances in.
    pub excluded_zones: Vec<String>,
    pub default_instance_type: String,
    pub ownership_tag_key: String,
    pub polling: PollingConf,
    pub bootstrap: BootstrapConf,
    pub sandbox: SandboxOptions,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            images: DEFAULT_IMAGES
                .iter()
                .map(|(region, image)| (region.to_string(), image.to_string()))
                .collect(),
            excluded_zones: Vec::new(),
            default_instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            ownership_tag_key: OWNERSHIP_TAG_KEY.to_string(),
            polling: PollingConf::default(),
            bootstrap: BootstrapConf::default(),
            sandbox: SandboxOptions::default(),
        }
    }
}

impl ProvisionerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|e| {
            ProvisionError::improperly_configured(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let conf: Self = toml::from_str(&content)?;
        conf.schedules()?;
        Ok(conf)
    }

    pub fn image_for_region(&self, region: &str) -> Result<&str> {
        self.images.get(region).map(String::as_str).ok_or_else(|| {
            ProvisionError::improperly_configured(format!(
                "No machine image is configured for region '{}'",
                region
            ))
        })
    }

    pub fn schedules(&self) -> Result<Schedules> {
        Ok(Schedules {
            visibility: self.polling.visibility.to_spec()?,
            launch_configuration: self.polling.launch_configuration.to_spec()?,
            instance_termination: self.polling.instance_termination.to_spec()?,
            security_group_delete: self.polling.security_group_delete.to_spec()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollConf {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl PollConf {
    pub fn to_spec(&self) -> Result<PollSpec> {
        PollSpec::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConf {
    pub visibility: PollConf,
    pub launch_configuration: PollConf,
    pub instance_termination: PollConf,
    pub security_group_delete: PollConf,
}

impl Default for PollingConf {
    fn default() -> Self {
        Self {
            visibility: PollConf {
                max_attempts: VISIBILITY_MAX_ATTEMPTS,
                interval_secs: VISIBILITY_INTERVAL_SECS,
            },
            launch_configuration: PollConf {
                max_attempts: LAUNCH_CONFIG_MAX_ATTEMPTS,
                interval_secs: LAUNCH_CONFIG_INTERVAL_SECS,
            },
            instance_termination: PollConf {
                max_attempts: INSTANCE_TERMINATION_MAX_ATTEMPTS,
                interval_secs: INSTANCE_TERMINATION_INTERVAL_SECS,
            },
            security_group_delete: PollConf {
                max_attempts: SECURITY_GROUP_DELETE_MAX_ATTEMPTS,
                interval_secs: SECURITY_GROUP_DELETE_INTERVAL_SECS,
            },
        }
    }
}

impl PollingConf {
    /// Same attempt budgets, no sleeping between attempts.
    pub fn without_delay() -> Self {
        let mut conf = Self::default();
        for poll in [
            &mut conf.visibility,
            &mut conf.launch_configuration,
            &mut conf.instance_termination,
            &mut conf.security_group_delete,
        ] {
            poll.interval_secs = 0;
        }
        conf
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BootstrapConf {
    /// Write the agent configuration to object storage and download it at boot.
    pub enabled: bool,
    /// Bucket override; `ecs-clusters--<region>--<account>` otherwise.
    pub bucket: Option<String>,
}

impl Default for BootstrapConf {
    fn default() -> Self {
        Self {
            enabled: true,
            bucket: None,
        }
    }
}

/// Validated poll schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedules {
    pub visibility: PollSpec,
    pub launch_configuration: PollSpec,
    pub instance_termination: PollSpec,
    pub security_group_delete: PollSpec,
}

impl Default for Schedules {
    fn default() -> Self {
        Self {
            visibility: PollSpec::visibility(),
            launch_configuration: PollSpec::launch_configuration(),
            instance_termination: PollSpec::instance_termination(),
            security_group_delete: PollSpec::security_group_delete(),
        }
    }
}
