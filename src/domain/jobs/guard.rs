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

//! Existence checks ahead of create and delete calls.
//!
//! The check and the following mutation are not atomic. A resource created
//! by someone else in between surfaces as the provider's own conflict error.

use crate::domain::resource::{Resource, ResourceRef};
use crate::infrastructure::provider::dispatch;
use crate::infrastructure::provider::{Profile, ResourceAdapter};
use crate::shared::error::{ProvisionError, Result};

/// Fetch a resource by name. Resources reported as absent, and lookups the
/// provider answers with a not-found error, are `None`.
pub async fn lookup<A>(adapter: &A, profile: &Profile, name: &str) -> Result<Option<Resource>>
where
    A: ResourceAdapter + ?Sized,
{
    match dispatch::query(adapter.kind(), name, adapter.fetch_by_name(profile, name)).await {
        Ok(found) => Ok(found.filter(Resource::exists)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

pub async fn exists<A>(adapter: &A, profile: &Profile, name: &str) -> Result<bool>
where
    A: ResourceAdapter + ?Sized,
{
    Ok(lookup(adapter, profile, name).await?.is_some())
}

pub async fn guard_create<A>(adapter: &A, profile: &Profile, name: &str) -> Result<()>
where
    A: ResourceAdapter + ?Sized,
{
    if exists(adapter, profile, name).await? {
        return Err(ProvisionError::already_exists(adapter.kind(), name));
    }
    Ok(())
}

pub async fn guard_delete<A>(adapter: &A, profile: &Profile, name: &str) -> Result<ResourceRef>
where
    A: ResourceAdapter + ?Sized,
{
    lookup(adapter, profile, name)
        .await?
        .map(|resource| resource.reference())
        .ok_or_else(|| ProvisionError::does_not_exist(adapter.kind(), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::ResourceKind;
    use crate::infrastructure::provider::{
        CloudProvider, ClusterSpec, SandboxOptions, SandboxProvider,
    };

    fn profile() -> Profile {
        Profile::new("default", "us-east-1")
    }

    #[tokio::test]
    async fn test_guard_create_rejects_existing() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        let clusters = sandbox.clusters();
        guard_create(clusters, &profile(), "demo").await.unwrap();

        clusters
            .create(&profile(), &ClusterSpec { name: "demo".to_string() })
            .await
            .unwrap();
        let err = guard_create(clusters, &profile(), "demo").await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::ResourceAlreadyExists { kind: ResourceKind::Cluster, .. }
        ));
    }

    #[tokio::test]
    async fn test_guard_delete_returns_reference() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        let clusters = sandbox.clusters();
        let err = guard_delete(clusters, &profile(), "demo").await.unwrap_err();
        assert_eq!(err.to_string(), "No cluster 'demo'.");

        clusters
            .create(&profile(), &ClusterSpec { name: "demo".to_string() })
            .await
            .unwrap();
        let reference = guard_delete(clusters, &profile(), "demo").await.unwrap();
        assert_eq!(reference.name, "demo");
        assert!(reference.id.ends_with("cluster/demo"));
    }

    #[tokio::test]
    async fn test_inactive_cluster_counts_as_missing() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        let clusters = sandbox.clusters();
        clusters
            .create(&profile(), &ClusterSpec { name: "demo".to_string() })
            .await
            .unwrap();
        let reference = guard_delete(clusters, &profile(), "demo").await.unwrap();
        clusters.delete(&profile(), &reference).await.unwrap();

        assert!(!exists(clusters, &profile(), "demo").await.unwrap());
        guard_create(clusters, &profile(), "demo").await.unwrap();
    }
}
