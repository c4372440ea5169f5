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

//! Instance bootstrap: the container agent configuration and the user data
//! that fetches it at boot.

use crate::domain::cluster::naming::{bootstrap_bucket, ClusterNames};
use crate::domain::cluster::request::{RegistryCredentials, UserDataPart};
use crate::domain::config::ProvisionerConfig;
use crate::domain::resource::ResourceKind;
use crate::infrastructure::constants::{AGENT_CONFIG_PATH, DEFAULT_REGISTRY_URL};
use crate::infrastructure::provider::dispatch;
use crate::infrastructure::provider::specs::{object_path, split_object_path};
use crate::infrastructure::provider::{CloudProvider, Profile};
use crate::shared::error::Result;
use serde::Serialize;
use serde_json::json;

const MIME_BOUNDARY: &str = "===============armada-user-data==";

/// Where the agent configuration of a cluster is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapLocation {
    pub bucket: String,
    pub key: String,
}

impl BootstrapLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `bucket/key`, as stored in the group tag and used as the object name.
    pub fn path(&self) -> String {
        object_path(&self.bucket, &self.key)
    }

    pub fn parse(path: &str) -> Option<Self> {
        split_object_path(path).map(|(bucket, key)| Self::new(bucket, key))
    }
}

/// Where the agent configuration of `names` goes under `config`. The bucket
/// defaults to the per-account one, which costs an identity lookup.
pub async fn derived_location(
    provider: &dyn CloudProvider,
    profile: &Profile,
    config: &ProvisionerConfig,
    names: &ClusterNames,
) -> Result<Option<BootstrapLocation>> {
    if !config.bootstrap.enabled {
        return Ok(None);
    }
    let bucket = match &config.bootstrap.bucket {
        Some(bucket) => bucket.clone(),
        None => {
            let identity =
                dispatch::query(ResourceKind::Bucket, &names.cluster, provider.identity(profile))
                    .await?;
            bootstrap_bucket(&identity.region, &identity.account_id)
        }
    };
    Ok(Some(BootstrapLocation::new(bucket, names.bootstrap_key())))
}

/// Contents of the agent configuration file.
pub fn agent_config(cluster: &str, registry: &RegistryCredentials) -> String {
    let mut config = format!("ECS_CLUSTER={}\n", cluster);
    if let (Some(email), Some(username), Some(password)) =
        (&registry.email, &registry.username, &registry.password)
    {
        let url = registry.url.as_deref().unwrap_or(DEFAULT_REGISTRY_URL);
        let auth = json!({
            url: {
                "username": username,
                "password": password,
                "email": email,
            }
        });
        config.push_str("ECS_ENGINE_AUTH_TYPE=docker\n");
        config.push_str(&format!("ECS_ENGINE_AUTH_DATA={}\n", auth));
    }
    config
}

/// Shell script that copies the agent configuration into place.
pub fn download_script(location: &BootstrapLocation) -> UserDataPart {
    UserDataPart::shell(format!(
        "#!/bin/bash\nyum install -y aws-cli\naws s3 cp s3://{} {}\n",
        location.path(),
        AGENT_CONFIG_PATH
    ))
}

/// Pack user data parts into a MIME multipart archive. No parts, no user data.
pub fn multipart_archive(parts: &[UserDataPart]) -> Option<String> {
    if parts.is_empty() {
        return None;
    }

    let mut archive = format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\nMIME-Version: 1.0\n\n",
        MIME_BOUNDARY
    );
    for part in parts {
        archive.push_str(&format!(
            "--{}\nContent-Type: {}; charset=\"us-ascii\"\nMIME-Version: 1.0\nContent-Transfer-Encoding: 7bit\n\n{}\n",
            MIME_BOUNDARY, part.content_type, part.contents
        ));
    }
    archive.push_str(&format!("--{}--\n", MIME_BOUNDARY));
    Some(archive)
}
