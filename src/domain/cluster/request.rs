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

use crate::domain::resource::{ResourceKind, Tag};
use crate::shared::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_USER_DATA_TYPE: &str = "text/x-shellscript";

/// One part of the instance user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataPart {
    pub contents: String,
    pub content_type: String,
}

impl UserDataPart {
    pub fn shell(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            content_type: DEFAULT_USER_DATA_TYPE.to_string(),
        }
    }
}

fn is_mime_type(value: &str) -> bool {
    matches!(
        value.split_once('/'),
        Some((top, sub)) if !top.is_empty() && !sub.is_empty() && !sub.contains('/')
    )
}

/// A user data part still on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataFile {
    pub path: PathBuf,
    pub content_type: String,
}

impl UserDataFile {
    /// Parse `PATH[:TYPE]`, e.g. `boot.sh:text/x-shellscript`.
    pub fn parse(value: &str) -> Result<Self> {
        let (path, content_type) = match value.rsplit_once(':') {
            Some((path, content_type)) if is_mime_type(content_type) => (path, content_type),
            _ => (value, DEFAULT_USER_DATA_TYPE),
        };
        if path.is_empty() {
            return Err(ProvisionError::improperly_configured(format!(
                "Invalid user data file '{}'. Expected 'PATH:TYPE'",
                value
            )));
        }
        Ok(Self {
            path: PathBuf::from(path),
            content_type: content_type.to_string(),
        })
    }

    pub fn read(&self) -> Result<UserDataPart> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            ProvisionError::improperly_configured(format!(
                "Cannot read user data file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(UserDataPart {
            contents,
            content_type: self.content_type.clone(),
        })
    }
}

/// Private registry login written into the agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub url: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RegistryCredentials {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none() && self.password.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.email.is_some() && self.username.is_some() && self.password.is_some()
    }
}

/// Everything needed to create a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRequest {
    pub name: String,
    /// Instance type; the configured default otherwise.
    pub instance_type: Option<String>,
    /// Machine image; looked up by region otherwise.
    pub image: Option<String>,
    pub key_pair: Option<String>,
    /// Extra security groups, by name or id.
    pub security_groups: Vec<String>,
    pub network: Option<String>,
    pub subnets: Vec<String>,
    pub zones: Vec<String>,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_size: u32,
    pub public_ip: bool,
    pub tags: Vec<Tag>,
    pub user_data: Vec<UserDataPart>,
    pub user_data_files: Vec<UserDataFile>,
    pub registry: RegistryCredentials,
}

impl ClusterRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_type: None,
            image: None,
            key_pair: None,
            security_groups: Vec::new(),
            network: None,
            subnets: Vec::new(),
            zones: Vec::new(),
            min_size: 1,
            max_size: 1,
            desired_size: 1,
            public_ip: false,
            tags: Vec::new(),
            user_data: Vec::new(),
            user_data_files: Vec::new(),
            registry: RegistryCredentials::default(),
        }
    }

    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = zones.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subnets<I, S>(mut self, subnets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subnets = subnets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_size(mut self, min_size: u32, desired_size: u32, max_size: u32) -> Self {
        self.min_size = min_size;
        self.desired_size = desired_size;
        self.max_size = max_size;
        self
    }

    /// Inline parts followed by the parts read from disk.
    pub fn read_user_data(&self) -> Result<Vec<UserDataPart>> {
        let mut parts = self.user_data.clone();
        for file in &self.user_data_files {
            parts.push(file.read()?);
        }
        Ok(parts)
    }
}

/// Either a document file or an inline document, never both.
pub fn read_document(
    file: Option<&Path>,
    inline: Option<&str>,
    kind: ResourceKind,
) -> Result<serde_json::Value> {
    let content = match (file, inline) {
        (Some(_), Some(_)) => {
            return Err(ProvisionError::improperly_configured(format!(
                "Give the {} document as a file or inline, not both",
                kind
            )))
        }
        (None, None) => {
            return Err(ProvisionError::improperly_configured(format!(
                "A {} needs a document",
                kind
            )))
        }
        (Some(path), None) => std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::improperly_configured(format!(
                "Cannot read document {}: {}",
                path.display(),
                e
            ))
        })?,
        (None, Some(inline)) => inline.to_string(),
    };
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_user_data_file() {
        let file = UserDataFile::parse("boot.sh:text/cloud-config").unwrap();
        assert_eq!(file.path, PathBuf::from("boot.sh"));
        assert_eq!(file.content_type, "text/cloud-config");

        let file = UserDataFile::parse("C:/boot.sh").unwrap();
        assert_eq!(file.path, PathBuf::from("C:/boot.sh"));
        assert_eq!(file.content_type, DEFAULT_USER_DATA_TYPE);

        assert!(UserDataFile::parse(":text/plain").is_err());
    }

    #[test]
    fn test_read_user_data_keeps_order() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        write!(script, "echo from-file").unwrap();

        let mut request = ClusterRequest::new("demo");
        request.user_data.push(UserDataPart::shell("echo inline"));
        request.user_data_files.push(UserDataFile {
            path: script.path().to_path_buf(),
            content_type: DEFAULT_USER_DATA_TYPE.to_string(),
        });

        let parts = request.read_user_data().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].contents, "echo inline");
        assert_eq!(parts[1].contents, "echo from-file");
    }

    #[test]
    fn test_missing_user_data_file_is_configuration_error() {
        let mut request = ClusterRequest::new("demo");
        request.user_data_files.push(UserDataFile {
            path: PathBuf::from("/nonexistent/boot.sh"),
            content_type: DEFAULT_USER_DATA_TYPE.to_string(),
        });
        assert!(matches!(
            request.read_user_data(),
            Err(ProvisionError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_read_document_sources() {
        let value = read_document(
            None,
            Some(r#"{"Version": "2012-10-17"}"#),
            ResourceKind::Policy,
        )
        .unwrap();
        assert_eq!(value["Version"], "2012-10-17");

        let path = Path::new("policy.json");
        assert!(read_document(Some(path), Some("{}"), ResourceKind::Policy).is_err());
        assert!(read_document(None, None, ResourceKind::Role).is_err());
        assert!(matches!(
            read_document(None, Some("not json"), ResourceKind::Policy),
            Err(ProvisionError::JsonParse(_))
        ));
    }
}
