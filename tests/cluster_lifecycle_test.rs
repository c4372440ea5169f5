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

use armada::domain::config::PollingConf;
use armada::infrastructure::provider::{
    Call, PolicySpec, ProviderResponse, ResourceAdapter, Verb,
};
use armada::*;
use std::sync::Arc;

const CHILD_KINDS: [ResourceKind; 7] = [
    ResourceKind::Policy,
    ResourceKind::Role,
    ResourceKind::InstanceProfile,
    ResourceKind::SecurityGroup,
    ResourceKind::LaunchConfiguration,
    ResourceKind::AutoScalingGroup,
    ResourceKind::Cluster,
];

fn setup(options: SandboxOptions) -> (Arc<SandboxProvider>, ClusterDescriptor) {
    let sandbox = Arc::new(SandboxProvider::new(options));
    let config = ProvisionerConfig {
        polling: PollingConf::without_delay(),
        ..ProvisionerConfig::default()
    };
    let descriptor =
        ClusterDescriptor::new(sandbox.clone(), Profile::new("default", "us-east-1"), config)
            .unwrap();
    (sandbox, descriptor)
}

fn demo() -> ClusterRequest {
    ClusterRequest::new("demo").with_zones(["us-east-1b"])
}

fn position(calls: &[Call], kind: ResourceKind, verb: Verb, name: &str) -> usize {
    calls
        .iter()
        .position(|c| c.kind == kind && c.verb == verb && c.name == name)
        .unwrap_or_else(|| panic!("no {:?} {} '{}' call", verb, kind, name))
}

#[tokio::test]
async fn test_create_cluster_in_dependency_order() {
    let (sandbox, descriptor) = setup(SandboxOptions::default());

    let description = descriptor.create_cluster(&demo()).await.unwrap();
    assert_eq!(description.name, "demo");

    let calls = sandbox.calls().await;
    let creates: Vec<&Call> = calls
        .iter()
        .filter(|c| c.verb == Verb::Create && CHILD_KINDS.contains(&c.kind))
        .collect();
    let names: Vec<&str> = creates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "demo--policy",
            "demo--role",
            "demo--instance-profile",
            "demo--security-group",
            "demo--launch-config",
            "demo--autoscaling-group",
            "demo",
        ]
    );

    // each child is seen by a lookup before the next one is created
    for pair in creates.windows(2) {
        let created = position(&calls, pair[0].kind, Verb::Create, &pair[0].name);
        let next = position(&calls, pair[1].kind, Verb::Create, &pair[1].name);
        assert!(
            calls[created..next]
                .iter()
                .any(|c| c.kind == pair[0].kind && c.verb == Verb::FetchByName),
            "{} '{}' was not looked up before the next step",
            pair[0].kind,
            pair[0].name
        );
    }

    // policy attached to the role and role added to the instance profile
    let role_attach = position(&calls, ResourceKind::Role, Verb::Attach, "demo--role");
    let profile_create = position(
        &calls,
        ResourceKind::InstanceProfile,
        Verb::Create,
        "demo--instance-profile",
    );
    assert!(role_attach < profile_create);
    let profile_attach = position(
        &calls,
        ResourceKind::InstanceProfile,
        Verb::Attach,
        "demo--instance-profile",
    );
    let group_create = position(
        &calls,
        ResourceKind::SecurityGroup,
        Verb::Create,
        "demo--security-group",
    );
    assert!(profile_attach < group_create);

    let status = descriptor.get_cluster_status("demo").await.unwrap();
    assert!(status.is_complete());
}

#[tokio::test]
async fn test_second_create_is_rejected_without_mutations() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate());
    descriptor.create_cluster(&demo()).await.unwrap();
    sandbox.clear_calls().await;

    let err = descriptor.create_cluster(&demo()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::ResourceAlreadyExists { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(sandbox.mutations().await.is_empty());
}

#[tokio::test]
async fn test_leftover_child_blocks_create() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate());
    let profile = Profile::new("default", "us-east-1");
    sandbox
        .policies()
        .create(
            &profile,
            &PolicySpec {
                name: "demo--policy".to_string(),
                document: serde_json::json!({}),
            },
        )
        .await
        .unwrap();
    sandbox.clear_calls().await;

    let err = descriptor.create_cluster(&demo()).await.unwrap_err();
    match err {
        ProvisionError::ResourceAlreadyExists { kind, name } => {
            assert_eq!(kind, ResourceKind::Policy);
            assert_eq!(name, "demo--policy");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(sandbox.mutations().await.is_empty());
}

#[tokio::test]
async fn test_launch_configuration_waits_for_instance_profile() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate());
    sandbox
        .inject_fault(
            ResourceKind::LaunchConfiguration,
            Verb::Create,
            ProviderFault::new(
                400,
                "ValidationError",
                "Invalid IamInstanceProfile: demo--instance-profile",
            ),
            2,
        )
        .await;

    descriptor.create_cluster(&demo()).await.unwrap();

    let attempts = sandbox
        .calls()
        .await
        .into_iter()
        .filter(|c| c.kind == ResourceKind::LaunchConfiguration && c.verb == Verb::Create)
        .count();
    assert_eq!(attempts, 3);
    assert_eq!(
        sandbox.live_names(ResourceKind::LaunchConfiguration).await,
        vec!["demo--launch-config"]
    );
}

#[tokio::test]
async fn test_failed_step_keeps_completed_children() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate());
    sandbox
        .inject_fault(
            ResourceKind::AutoScalingGroup,
            Verb::Create,
            ProviderFault::new(500, "InternalFailure", "try again later"),
            1,
        )
        .await;

    let err = descriptor.create_cluster(&demo()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::ProviderError { .. }));

    // no rollback: everything before the autoscaling group is still there
    assert_eq!(
        sandbox.live_names(ResourceKind::LaunchConfiguration).await,
        vec!["demo--launch-config"]
    );
    assert_eq!(
        sandbox.live_names(ResourceKind::Policy).await,
        vec!["demo--policy"]
    );
    assert!(sandbox
        .live_names(ResourceKind::AutoScalingGroup)
        .await
        .is_empty());

    let status = descriptor.get_cluster_status("demo").await.unwrap();
    assert!(!status.is_complete());
}

#[tokio::test]
async fn test_response_without_status_is_bad() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate());
    sandbox
        .inject_response(
            ResourceKind::Policy,
            Verb::Create,
            ProviderResponse {
                status: None,
                request_id: None,
                resource_id: None,
            },
            1,
        )
        .await;

    let err = descriptor.create_cluster(&demo()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::BadResponse(_)));
    assert_eq!(err.exit_code(), 9);
}

#[tokio::test]
async fn test_non_2xx_response_is_an_error() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate());
    sandbox
        .inject_response(
            ResourceKind::Cluster,
            Verb::Create,
            ProviderResponse {
                status: Some(503),
                request_id: Some("req-1".to_string()),
                resource_id: None,
            },
            1,
        )
        .await;

    let err = descriptor.create_cluster(&demo()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::Non200Response { status: 503 }));
    assert_eq!(err.to_string(), "Response code was 503, not 2xx.");
}

#[tokio::test]
async fn test_permission_denied_surfaces() {
    let (sandbox, descriptor) = setup(SandboxOptions::immediate());
    sandbox
        .inject_fault(
            ResourceKind::Role,
            Verb::Create,
            ProviderFault::new(403, "AccessDenied", "not allowed to create roles"),
            1,
        )
        .await;

    let err = descriptor.create_cluster(&demo()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::PermissionDenied(_)));
    assert_eq!(err.exit_code(), 8);
}
