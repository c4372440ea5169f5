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

//! Every adapter call made by the job layer goes through this module.
//!
//! Faults are translated into [`ProvisionError`] kinds, and successful
//! mutating calls have their response status verified.

use super::adapter::{FaultResult, ProviderResponse};
use crate::domain::resource::ResourceKind;
use crate::shared::error::{ProviderFault, ProvisionError, Result};
use std::future::Future;
use tracing::debug;

const AUTHORIZATION_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "AuthFailure",
    "UnauthorizedOperation",
    "UnauthorizedAccess",
];

const DEPENDENCY_CODES: &[&str] = &[
    "DependencyViolation",
    "DeleteConflict",
    "ResourceInUse",
    "ResourceInUseFault",
    "ClusterContainsServicesException",
    "ClusterContainsContainerInstancesException",
    "BucketNotEmpty",
];

const NOT_FOUND_CODES: &[&str] = &["NoSuchEntity", "NoSuchBucket", "NoSuchKey"];

const NOT_READY_MESSAGE_PREFIX: &str = "Invalid IamInstanceProfile";

/// Map a raw provider fault onto the error taxonomy.
pub fn translate(kind: ResourceKind, name: &str, fault: ProviderFault) -> ProvisionError {
    let code = fault.code.as_str();

    if fault.status == 403 || AUTHORIZATION_CODES.contains(&code) {
        return ProvisionError::PermissionDenied(format!(
            "{} '{}': {}",
            kind, name, fault.message
        ));
    }

    if fault.message.starts_with(NOT_READY_MESSAGE_PREFIX) {
        return ProvisionError::ResourceNotReady {
            kind,
            name: name.to_string(),
            message: fault.message,
        };
    }

    if DEPENDENCY_CODES.contains(&code) {
        return ProvisionError::ResourceHasDependency {
            kind,
            name: name.to_string(),
            message: fault.message,
        };
    }

    if fault.status == 404 || NOT_FOUND_CODES.contains(&code) || code.contains("NotFound") {
        return ProvisionError::does_not_exist(kind, name);
    }

    ProvisionError::ProviderError {
        code: fault.code,
        message: fault.message,
    }
}

/// Reject responses without a status code or with a non-2xx one.
pub fn check_response(response: ProviderResponse) -> Result<ProviderResponse> {
    match response.status {
        None => Err(ProvisionError::BadResponse(
            "Could not find status code in response.".to_string(),
        )),
        Some(status) if !(200..300).contains(&status) => {
            Err(ProvisionError::Non200Response { status })
        }
        Some(_) => Ok(response),
    }
}

/// Await a mutating adapter call, translate its fault and verify its response.
pub async fn mutate<F>(kind: ResourceKind, name: &str, call: F) -> Result<ProviderResponse>
where
    F: Future<Output = FaultResult<ProviderResponse>>,
{
    let response = call.await.map_err(|fault| {
        debug!("{} '{}' call failed: {}", kind.as_str(), name, fault);
        translate(kind, name, fault)
    })?;
    check_response(response)
}

/// Await a read-only adapter call and translate its fault.
pub async fn query<F, T>(kind: ResourceKind, name: &str, call: F) -> Result<T>
where
    F: Future<Output = FaultResult<T>>,
{
    call.await.map_err(|fault| translate(kind, name, fault))
}
