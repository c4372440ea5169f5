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

//! Per-kind list and delete, resolved through an explicit kind → adapter map.

use super::guard;
use super::lifecycle;
use super::waiter::PollSpec;
use crate::domain::resource::{Resource, ResourceKind};
use crate::infrastructure::provider::dispatch;
use crate::infrastructure::provider::{CloudProvider, Profile, ResourceAdapter};
use crate::shared::error::{ProvisionError, Result};

async fn list_with<A>(adapter: &A, profile: &Profile) -> Result<Vec<Resource>>
where
    A: ResourceAdapter + ?Sized,
{
    let mut resources = dispatch::query(adapter.kind(), "*", adapter.fetch_all(profile)).await?;
    resources.retain(Resource::exists);
    resources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(resources)
}

fn not_standalone(kind: ResourceKind) -> ProvisionError {
    ProvisionError::improperly_configured(format!(
        "A {} is managed through its cluster and cannot be addressed on its own",
        kind
    ))
}

/// Every existing resource of `kind`, sorted by name.
pub async fn list(
    provider: &dyn CloudProvider,
    profile: &Profile,
    kind: ResourceKind,
) -> Result<Vec<Resource>> {
    match kind {
        ResourceKind::Policy => list_with(provider.policies(), profile).await,
        ResourceKind::Role => list_with(provider.roles(), profile).await,
        ResourceKind::InstanceProfile => list_with(provider.instance_profiles(), profile).await,
        ResourceKind::SecurityGroup => list_with(provider.security_groups(), profile).await,
        ResourceKind::LaunchConfiguration => {
            list_with(provider.launch_configurations(), profile).await
        }
        ResourceKind::AutoScalingGroup => list_with(provider.autoscaling_groups(), profile).await,
        ResourceKind::Cluster => list_with(provider.clusters(), profile).await,
        ResourceKind::LoadBalancer => list_with(provider.load_balancers(), profile).await,
        ResourceKind::Bucket => list_with(provider.buckets(), profile).await,
        ResourceKind::Object => list_with(provider.objects(), profile).await,
        ResourceKind::Service | ResourceKind::Instance => Err(not_standalone(kind)),
    }
}

pub async fn lookup(
    provider: &dyn CloudProvider,
    profile: &Profile,
    kind: ResourceKind,
    name: &str,
) -> Result<Option<Resource>> {
    match kind {
        ResourceKind::Policy => guard::lookup(provider.policies(), profile, name).await,
        ResourceKind::Role => guard::lookup(provider.roles(), profile, name).await,
        ResourceKind::InstanceProfile => {
            guard::lookup(provider.instance_profiles(), profile, name).await
        }
        ResourceKind::SecurityGroup => {
            guard::lookup(provider.security_groups(), profile, name).await
        }
        ResourceKind::LaunchConfiguration => {
            guard::lookup(provider.launch_configurations(), profile, name).await
        }
        ResourceKind::AutoScalingGroup => {
            guard::lookup(provider.autoscaling_groups(), profile, name).await
        }
        ResourceKind::Cluster => guard::lookup(provider.clusters(), profile, name).await,
        ResourceKind::LoadBalancer => guard::lookup(provider.load_balancers(), profile, name).await,
        ResourceKind::Bucket => guard::lookup(provider.buckets(), profile, name).await,
        ResourceKind::Object => guard::lookup(provider.objects(), profile, name).await,
        ResourceKind::Service | ResourceKind::Instance => Err(not_standalone(kind)),
    }
}

/// Strict single-resource delete: `ResourceDoesNotExist` when missing.
pub async fn delete(
    provider: &dyn CloudProvider,
    profile: &Profile,
    kind: ResourceKind,
    name: &str,
    poll: PollSpec,
) -> Result<()> {
    match kind {
        ResourceKind::Policy => {
            lifecycle::delete_and_wait(provider.policies(), profile, name, poll).await
        }
        ResourceKind::Role => lifecycle::delete_and_wait(provider.roles(), profile, name, poll).await,
        ResourceKind::InstanceProfile => {
            lifecycle::delete_and_wait(provider.instance_profiles(), profile, name, poll).await
        }
        ResourceKind::SecurityGroup => {
            lifecycle::delete_and_wait(provider.security_groups(), profile, name, poll).await
        }
        ResourceKind::LaunchConfiguration => {
            lifecycle::delete_and_wait(provider.launch_configurations(), profile, name, poll).await
        }
        ResourceKind::AutoScalingGroup => {
            lifecycle::delete_and_wait(provider.autoscaling_groups(), profile, name, poll).await
        }
        ResourceKind::Cluster => {
            lifecycle::delete_and_wait(provider.clusters(), profile, name, poll).await
        }
        ResourceKind::LoadBalancer => {
            lifecycle::delete_and_wait(provider.load_balancers(), profile, name, poll).await
        }
        ResourceKind::Bucket => {
            lifecycle::delete_and_wait(provider.buckets(), profile, name, poll).await
        }
        ResourceKind::Object => {
            lifecycle::delete_and_wait(provider.objects(), profile, name, poll).await
        }
        ResourceKind::Service | ResourceKind::Instance => Err(not_standalone(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::provider::{
        BucketSpec, ClusterSpec, SandboxOptions, SandboxProvider,
    };
    use std::time::Duration;

    fn profile() -> Profile {
        Profile::new("default", "us-east-1")
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_skips_inactive() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        for name in ["zeta", "alpha", "gone"] {
            sandbox
                .clusters()
                .create(&profile(), &ClusterSpec { name: name.to_string() })
                .await
                .unwrap();
        }
        let poll = PollSpec::new(2, Duration::ZERO).unwrap();
        delete(&sandbox, &profile(), ResourceKind::Cluster, "gone", poll)
            .await
            .unwrap();

        let names: Vec<String> = list(&sandbox, &profile(), ResourceKind::Cluster)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_services_are_not_standalone() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        let err = list(&sandbox, &profile(), ResourceKind::Service)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::ImproperlyConfigured(_)));
    }

    #[tokio::test]
    async fn test_lookup_by_kind() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        sandbox
            .buckets()
            .create(
                &profile(),
                &BucketSpec {
                    name: "assets".to_string(),
                    private: false,
                },
            )
            .await
            .unwrap();
        assert!(lookup(&sandbox, &profile(), ResourceKind::Bucket, "assets")
            .await
            .unwrap()
            .is_some());
        assert!(lookup(&sandbox, &profile(), ResourceKind::Policy, "assets")
            .await
            .unwrap()
            .is_none());
    }
}
