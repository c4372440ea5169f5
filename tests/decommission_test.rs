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

use armada::domain::cluster::Removal;
use armada::domain::config::{PollConf, PollingConf};
use armada::infrastructure::provider::{
    Call, ClusterSpec, ResourceAdapter, SecurityGroupSpec, Verb,
};
use armada::*;
use std::sync::Arc;

fn setup(options: SandboxOptions, polling: PollingConf) -> (Arc<SandboxProvider>, ClusterDescriptor) {
    let sandbox = Arc::new(SandboxProvider::new(options));
    let config = ProvisionerConfig {
        polling,
        ..ProvisionerConfig::default()
    };
    let descriptor =
        ClusterDescriptor::new(sandbox.clone(), Profile::new("default", "us-east-1"), config)
            .unwrap();
    (sandbox, descriptor)
}

async fn provisioned(options: SandboxOptions, polling: PollingConf) -> (Arc<SandboxProvider>, ClusterDescriptor) {
    let (sandbox, descriptor) = setup(options, polling);
    descriptor
        .create_cluster(
            &ClusterRequest::new("demo")
                .with_zones(["us-east-1b"])
                .with_size(1, 2, 2),
        )
        .await
        .unwrap();
    sandbox.clear_calls().await;
    (sandbox, descriptor)
}

async fn remove_out_of_band<A>(adapter: &A, name: &str)
where
    A: ResourceAdapter + ?Sized,
{
    let profile = Profile::new("default", "us-east-1");
    let resource = adapter
        .fetch_by_name(&profile, name)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("{} is not visible", name));
    adapter.delete(&profile, &resource.reference()).await.unwrap();
}

/// Unlinks and deletes the role, the way an operator would from a console.
async fn remove_role_out_of_band(sandbox: &SandboxProvider) {
    let profile = Profile::new("default", "us-east-1");
    sandbox
        .instance_profiles()
        .remove_role(&profile, "demo--instance-profile", "demo--role")
        .await
        .unwrap();
    for policy_id in sandbox
        .roles()
        .attached_policies(&profile, "demo--role")
        .await
        .unwrap()
    {
        sandbox
            .roles()
            .detach_policy(&profile, "demo--role", &policy_id)
            .await
            .unwrap();
    }
    remove_out_of_band(sandbox.roles(), "demo--role").await;
}

fn skipped(summary: &TeardownSummary) -> Vec<ResourceKind> {
    summary
        .removals
        .iter()
        .filter(|r| !r.deleted)
        .map(|r| r.kind)
        .collect()
}

fn index_of(calls: &[Call], kind: ResourceKind, verb: Verb) -> usize {
    calls
        .iter()
        .position(|c| c.kind == kind && c.verb == verb)
        .unwrap_or_else(|| panic!("no {:?} {} call", verb, kind))
}

#[tokio::test]
async fn test_delete_cluster_in_reverse_order() {
    let (sandbox, descriptor) =
        provisioned(SandboxOptions::default(), PollingConf::without_delay()).await;
    sandbox.seed_service("demo", "web", 2).await;

    let summary = descriptor.delete_cluster("demo").await.unwrap();
    assert_eq!(summary.cluster, "demo");
    assert_eq!(summary.terminated_instances.len(), 2);

    let calls = sandbox.calls().await;
    let deletes: Vec<ResourceKind> = calls
        .iter()
        .filter(|c| c.verb == Verb::Delete && c.kind != ResourceKind::Object)
        .map(|c| c.kind)
        .collect();
    assert_eq!(
        deletes,
        vec![
            ResourceKind::Service,
            ResourceKind::AutoScalingGroup,
            ResourceKind::LaunchConfiguration,
            ResourceKind::SecurityGroup,
            ResourceKind::InstanceProfile,
            ResourceKind::Role,
            ResourceKind::Policy,
            ResourceKind::Cluster,
        ]
    );

    // services are drained before removal
    assert!(
        index_of(&calls, ResourceKind::Service, Verb::Scale)
            < index_of(&calls, ResourceKind::Service, Verb::Delete)
    );
    // instance termination is awaited between the group and its launch configuration
    let group_deleted = index_of(&calls, ResourceKind::AutoScalingGroup, Verb::Delete);
    let described = index_of(&calls, ResourceKind::Instance, Verb::Describe);
    let config_deleted = index_of(&calls, ResourceKind::LaunchConfiguration, Verb::Delete);
    assert!(group_deleted < described && described < config_deleted);

    assert!(descriptor.list_clusters().await.unwrap().is_empty());
    let err = descriptor.get_cluster_status("demo").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_missing_cluster_makes_no_mutations() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate(), PollingConf::without_delay());

    let err = descriptor.delete_cluster("missing").await.unwrap_err();
    match &err {
        ProvisionError::ResourceDoesNotExist { kind, name } => {
            assert_eq!(*kind, ResourceKind::Cluster);
            assert_eq!(name, "missing");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.exit_code(), 4);
    assert!(sandbox.mutations().await.is_empty());
}

#[tokio::test]
async fn test_security_group_delete_retries_on_dependency() {
    let (sandbox, descriptor) =
        provisioned(SandboxOptions::immediate(), PollingConf::without_delay()).await;
    sandbox
        .inject_fault(
            ResourceKind::SecurityGroup,
            Verb::Delete,
            ProviderFault::new(400, "DependencyViolation", "resource has a dependent object"),
            2,
        )
        .await;

    descriptor.delete_cluster("demo").await.unwrap();

    let attempts = sandbox
        .calls()
        .await
        .into_iter()
        .filter(|c| c.kind == ResourceKind::SecurityGroup && c.verb == Verb::Delete)
        .count();
    assert_eq!(attempts, 3);
    assert!(sandbox
        .live_names(ResourceKind::SecurityGroup)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_instance_termination_timeout_stops_teardown() {
    let mut polling = PollingConf::without_delay();
    polling.instance_termination = PollConf {
        max_attempts: 3,
        interval_secs: 0,
    };
    let options = SandboxOptions {
        termination_lag: 100,
        ..SandboxOptions::immediate()
    };
    let (sandbox, descriptor) = provisioned(options, polling).await;

    let err = descriptor.delete_cluster("demo").await.unwrap_err();
    assert!(matches!(err, ProvisionError::WaitTimedOut(_)));

    let describes = sandbox
        .calls()
        .await
        .into_iter()
        .filter(|c| c.kind == ResourceKind::Instance && c.verb == Verb::Describe)
        .count();
    assert_eq!(describes, 3);
    // later steps never ran
    assert_eq!(
        sandbox.live_names(ResourceKind::LaunchConfiguration).await,
        vec!["demo--launch-config"]
    );
    assert_eq!(sandbox.live_names(ResourceKind::Cluster).await, vec!["demo"]);
}

#[tokio::test]
async fn test_children_removed_out_of_band_are_skipped() {
    let (sandbox, descriptor) =
        provisioned(SandboxOptions::immediate(), PollingConf::without_delay()).await;
    let profile = Profile::new("default", "us-east-1");

    // the agent configuration object is not referenced by anything else
    let objects = sandbox.live_names(ResourceKind::Object).await;
    assert_eq!(objects.len(), 1);
    let object = sandbox
        .objects()
        .fetch_by_name(&profile, &objects[0])
        .await
        .unwrap()
        .unwrap();
    sandbox
        .objects()
        .delete(&profile, &object.reference())
        .await
        .unwrap();

    let summary = descriptor.delete_cluster("demo").await.unwrap();
    let skipped: Vec<&Removal> = summary.removals.iter().filter(|r| !r.deleted).collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].kind, ResourceKind::Object);
    assert_eq!(summary.deleted().count(), summary.removals.len() - 1);
}

#[tokio::test]
async fn test_children_deleted_moments_before_are_skipped() {
    // deleted children stay listed as pending for one more observation
    let (sandbox, descriptor) =
        provisioned(SandboxOptions::default(), PollingConf::without_delay()).await;

    remove_role_out_of_band(&sandbox).await;
    remove_out_of_band(sandbox.instance_profiles(), "demo--instance-profile").await;
    remove_out_of_band(sandbox.policies(), "demo--policy").await;

    let summary = descriptor.delete_cluster("demo").await.unwrap();
    assert_eq!(
        skipped(&summary),
        vec![
            ResourceKind::InstanceProfile,
            ResourceKind::Role,
            ResourceKind::Policy,
        ]
    );
    assert!(descriptor.list_clusters().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_security_group_deleted_out_of_band_is_skipped() {
    let (sandbox, descriptor) =
        provisioned(SandboxOptions::immediate(), PollingConf::without_delay()).await;

    remove_out_of_band(sandbox.autoscaling_groups(), "demo--autoscaling-group").await;
    remove_out_of_band(sandbox.launch_configurations(), "demo--launch-config").await;
    remove_out_of_band(sandbox.security_groups(), "demo--security-group").await;
    remove_role_out_of_band(&sandbox).await;

    let summary = descriptor.delete_cluster("demo").await.unwrap();
    assert_eq!(
        skipped(&summary),
        vec![
            ResourceKind::AutoScalingGroup,
            ResourceKind::LaunchConfiguration,
            ResourceKind::SecurityGroup,
            ResourceKind::Role,
        ]
    );

    // without the group tag the agent configuration is found by its derived path
    let object = summary
        .removals
        .iter()
        .find(|r| r.kind == ResourceKind::Object)
        .unwrap();
    assert!(object.deleted);
    assert!(object.name.ends_with("/demo/ecs.config"));
    assert!(sandbox.live_names(ResourceKind::Object).await.is_empty());
    assert!(sandbox.live_names(ResourceKind::InstanceProfile).await.is_empty());
    assert!(sandbox.live_names(ResourceKind::Policy).await.is_empty());
}

#[tokio::test]
async fn test_security_group_found_by_ownership_tag() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate(), PollingConf::without_delay());
    let profile = Profile::new("default", "us-east-1");

    sandbox
        .clusters()
        .create(&profile, &ClusterSpec { name: "demo".to_string() })
        .await
        .unwrap();
    let groups = sandbox.security_groups();
    groups
        .create(
            &profile,
            &SecurityGroupSpec {
                name: "legacy-sg".to_string(),
                description: "created before naming was derived".to_string(),
                network: None,
            },
        )
        .await
        .unwrap();
    let legacy = groups
        .fetch_by_name(&profile, "legacy-sg")
        .await
        .unwrap()
        .unwrap();
    groups
        .tag(&profile, &legacy.id, &[Tag::new("ECS Cluster", "demo")])
        .await
        .unwrap();

    let summary = descriptor.delete_cluster("demo").await.unwrap();
    let removal = summary
        .removals
        .iter()
        .find(|r| r.kind == ResourceKind::SecurityGroup)
        .unwrap();
    assert_eq!(removal.name, "legacy-sg");
    assert!(removal.deleted);
    assert!(sandbox
        .live_names(ResourceKind::SecurityGroup)
        .await
        .is_empty());
}
