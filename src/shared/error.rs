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

use crate::domain::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Raw error reported by a provider adapter, before translation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code} (HTTP {status}): {message}")]
pub struct ProviderFault {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ProviderFault {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("The {kind} '{name}' already exists.")]
    ResourceAlreadyExists { kind: ResourceKind, name: String },

    #[error("No {kind} '{name}'.")]
    ResourceDoesNotExist { kind: ResourceKind, name: String },

    #[error("The {kind} '{name}' has a dependent resource: {message}")]
    ResourceHasDependency {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    #[error("The {kind} '{name}' was not created: {reason}")]
    ResourceNotCreated {
        kind: ResourceKind,
        name: String,
        reason: String,
    },

    #[error("The {kind} '{name}' was not deleted: {reason}")]
    ResourceNotDeleted {
        kind: ResourceKind,
        name: String,
        reason: String,
    },

    #[error("The {kind} '{name}' is not ready yet: {message}")]
    ResourceNotReady {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    #[error("Timed out: {0}")]
    WaitTimedOut(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    #[error("Provider error {code}: {message}")]
    ProviderError { code: String, message: String },

    #[error("Bad response: {0}")]
    BadResponse(String),

    #[error("Response code was {status}, not 2xx.")]
    Non200Response { status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl ProvisionError {
    pub fn already_exists(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::ResourceAlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn does_not_exist(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::ResourceDoesNotExist {
            kind,
            name: name.into(),
        }
    }

    pub fn not_created(
        kind: ResourceKind,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ResourceNotCreated {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn not_deleted(
        kind: ResourceKind,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ResourceNotDeleted {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn improperly_configured(context: impl Into<String>) -> Self {
        Self::ImproperlyConfigured(context.into())
    }

    /// Errors worth re-issuing the same call for, within a bounded schedule.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ResourceHasDependency { .. } | Self::ResourceNotReady { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceDoesNotExist { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ImproperlyConfigured(_) => 2,
            Self::ResourceAlreadyExists { .. } => 3,
            Self::ResourceDoesNotExist { .. } => 4,
            Self::ResourceHasDependency { .. } => 5,
            Self::ResourceNotCreated { .. } | Self::ResourceNotDeleted { .. } => 6,
            Self::WaitTimedOut(_) | Self::ResourceNotReady { .. } => 7,
            Self::PermissionDenied(_) => 8,
            Self::ProviderError { .. } | Self::BadResponse(_) | Self::Non200Response { .. } => 9,
            Self::Io(_) | Self::TomlParse(_) | Self::JsonParse(_) => 1,
        }
    }
}
