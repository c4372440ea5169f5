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

//! Single-resource create and delete steps.

use super::guard;
use super::waiter::{poll_until, retry_transient, wait_for, PollSpec};
use crate::domain::resource::{Resource, ResourceRef};
use crate::infrastructure::provider::dispatch;
use crate::infrastructure::provider::{Profile, ProviderResponse, ResourceAdapter};
use crate::shared::error::{ProvisionError, Result};
use tracing::{debug, info};

/// Wait until `name` is visible. Running out of attempts is reported as
/// the resource not having been created.
pub async fn wait_visible<A>(
    adapter: &A,
    profile: &Profile,
    name: &str,
    poll: PollSpec,
) -> Result<Resource>
where
    A: ResourceAdapter + ?Sized,
{
    let what = format!("{} '{}' to appear", adapter.kind(), name);
    poll_until(poll, &what, || guard::lookup(adapter, profile, name))
        .await
        .map_err(|err| match err {
            ProvisionError::WaitTimedOut(reason) => {
                ProvisionError::not_created(adapter.kind(), name, reason)
            }
            other => other,
        })
}

/// Wait until `name` is gone. Running out of attempts is reported as the
/// resource not having been deleted.
pub async fn wait_absent<A>(adapter: &A, profile: &Profile, name: &str, poll: PollSpec) -> Result<()>
where
    A: ResourceAdapter + ?Sized,
{
    let what = format!("{} '{}' to disappear", adapter.kind(), name);
    wait_for(poll, &what, || async move {
        Ok(!guard::exists(adapter, profile, name).await?)
    })
    .await
    .map_err(|err| match err {
        ProvisionError::WaitTimedOut(reason) => {
            ProvisionError::not_deleted(adapter.kind(), name, reason)
        }
        other => other,
    })
}

/// Guarded create followed by a visibility wait.
pub async fn create_and_wait<A>(
    adapter: &A,
    profile: &Profile,
    name: &str,
    spec: &A::Spec,
    poll: PollSpec,
) -> Result<Resource>
where
    A: ResourceAdapter + ?Sized,
{
    guard::guard_create(adapter, profile, name).await?;
    info!("Creating {} '{}'", adapter.kind(), name);
    create_unguarded(adapter, profile, name, spec).await?;
    wait_visible(adapter, profile, name, poll).await
}

/// Guarded create that re-issues the call while the provider rejects it
/// with a transient error.
pub async fn create_with_retry_and_wait<A>(
    adapter: &A,
    profile: &Profile,
    name: &str,
    spec: &A::Spec,
    retry: PollSpec,
    poll: PollSpec,
) -> Result<Resource>
where
    A: ResourceAdapter + ?Sized,
{
    guard::guard_create(adapter, profile, name).await?;
    info!("Creating {} '{}'", adapter.kind(), name);
    let what = format!("create {} '{}'", adapter.kind(), name);
    retry_transient(retry, &what, || create_unguarded(adapter, profile, name, spec)).await?;
    wait_visible(adapter, profile, name, poll).await
}

async fn create_unguarded<A>(
    adapter: &A,
    profile: &Profile,
    name: &str,
    spec: &A::Spec,
) -> Result<ProviderResponse>
where
    A: ResourceAdapter + ?Sized,
{
    dispatch::mutate(adapter.kind(), name, adapter.create(profile, spec)).await
}

/// Strict delete: the resource must exist.
pub async fn delete_and_wait<A>(adapter: &A, profile: &Profile, name: &str, poll: PollSpec) -> Result<()>
where
    A: ResourceAdapter + ?Sized,
{
    let reference = guard::guard_delete(adapter, profile, name).await?;
    info!("Deleting {} '{}'", adapter.kind(), name);
    dispatch::mutate(adapter.kind(), name, adapter.delete(profile, &reference)).await?;
    wait_absent(adapter, profile, name, poll).await
}

/// Tolerant delete used during teardown. Returns whether anything was deleted.
pub async fn delete_if_present<A>(
    adapter: &A,
    profile: &Profile,
    name: &str,
    poll: PollSpec,
) -> Result<bool>
where
    A: ResourceAdapter + ?Sized,
{
    let Some(resource) = guard::lookup(adapter, profile, name).await? else {
        debug!("{} '{}' is already gone", adapter.kind(), name);
        return Ok(false);
    };
    delete_reference(adapter, profile, &resource.reference(), None, poll).await
}

/// Delete a known resource, optionally retrying while the provider reports
/// a dependency, then wait until it is gone. A resource that disappeared in
/// the meantime is not an error.
pub async fn delete_reference<A>(
    adapter: &A,
    profile: &Profile,
    reference: &ResourceRef,
    retry: Option<PollSpec>,
    poll: PollSpec,
) -> Result<bool>
where
    A: ResourceAdapter + ?Sized,
{
    let kind = adapter.kind();
    let name = reference.name.as_str();
    info!("Deleting {} '{}'", kind, name);

    let delete = || dispatch::mutate(kind, name, adapter.delete(profile, reference));
    let outcome = match retry {
        Some(retry) => retry_transient(retry, &format!("delete {} '{}'", kind, name), delete).await,
        None => delete().await,
    };

    match outcome {
        Ok(_) => {
            wait_absent(adapter, profile, name, poll).await?;
            Ok(true)
        }
        Err(err) if err.is_not_found() => {
            debug!("{} '{}' vanished before it was deleted", kind, name);
            Ok(false)
        }
        Err(err) => Err(err),
    }
}
