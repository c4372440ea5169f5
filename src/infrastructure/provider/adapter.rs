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

//! Adapter contracts between the job layer and a cloud provider binding.
//!
//! Every resource kind exposes the same four verbs through [`ResourceAdapter`];
//! kinds with relationships (roles own policies, instance profiles own roles,
//! groups own instances) add their verbs through extension traits. Errors are
//! provider-specific [`ProviderFault`]s and are translated by
//! [`super::dispatch`] before reaching callers.

use super::specs::{
    AutoScalingGroupSpec, BucketSpec, ClusterSpec, InstanceProfileSpec, LaunchConfigurationSpec,
    LoadBalancerSpec, ObjectSpec, PolicySpec, RoleSpec, SecurityGroupSpec,
};
use crate::domain::resource::{Resource, ResourceKind, ResourceRef, Tag};
use crate::shared::error::ProviderFault;
use serde::{Deserialize, Serialize};

pub type FaultResult<T> = std::result::Result<T, ProviderFault>;

/// Authenticated session handle. Built by the credential loader; the job
/// layer only passes it through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    name: String,
    region: String,
}

impl Profile {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Transport-level response of a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub status: Option<u16>,
    pub request_id: Option<String>,
    /// Id assigned to a newly created resource, when the provider returns one.
    pub resource_id: Option<String>,
}

impl ProviderResponse {
    pub fn ok(request_id: impl Into<String>) -> Self {
        Self {
            status: Some(200),
            request_id: Some(request_id.into()),
            resource_id: None,
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub account_id: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Stopping,
    Stopped,
    Terminated,
}

impl InstanceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Terminated => "terminated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub id: String,
    pub state: InstanceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub desired_count: u32,
    pub running_count: u32,
}

#[async_trait::async_trait]
pub trait ResourceAdapter: Send + Sync {
    type Spec: Send + Sync;

    fn kind(&self) -> ResourceKind;

    async fn create(&self, profile: &Profile, spec: &Self::Spec) -> FaultResult<ProviderResponse>;

    async fn delete(&self, profile: &Profile, reference: &ResourceRef)
        -> FaultResult<ProviderResponse>;

    async fn fetch_by_name(&self, profile: &Profile, name: &str) -> FaultResult<Option<Resource>>;

    async fn fetch_all(&self, profile: &Profile) -> FaultResult<Vec<Resource>>;
}

#[async_trait::async_trait]
pub trait RoleAdapter: ResourceAdapter<Spec = RoleSpec> {
    async fn attach_policy(
        &self,
        profile: &Profile,
        role: &str,
        policy_id: &str,
    ) -> FaultResult<ProviderResponse>;

    async fn detach_policy(
        &self,
        profile: &Profile,
        role: &str,
        policy_id: &str,
    ) -> FaultResult<ProviderResponse>;

    async fn attached_policies(&self, profile: &Profile, role: &str) -> FaultResult<Vec<String>>;
}

#[async_trait::async_trait]
pub trait InstanceProfileAdapter: ResourceAdapter<Spec = InstanceProfileSpec> {
    async fn add_role(
        &self,
        profile: &Profile,
        instance_profile: &str,
        role: &str,
    ) -> FaultResult<ProviderResponse>;

    async fn remove_role(
        &self,
        profile: &Profile,
        instance_profile: &str,
        role: &str,
    ) -> FaultResult<ProviderResponse>;

    async fn roles(&self, profile: &Profile, instance_profile: &str) -> FaultResult<Vec<String>>;
}

#[async_trait::async_trait]
pub trait SecurityGroupAdapter: ResourceAdapter<Spec = SecurityGroupSpec> {
    async fn tag(
        &self,
        profile: &Profile,
        group_id: &str,
        tags: &[Tag],
    ) -> FaultResult<ProviderResponse>;
}

#[async_trait::async_trait]
pub trait AutoScalingGroupAdapter: ResourceAdapter<Spec = AutoScalingGroupSpec> {
    async fn tag(&self, profile: &Profile, group: &str, tags: &[Tag])
        -> FaultResult<ProviderResponse>;

    /// Ids of the compute instances currently belonging to the group.
    async fn instances(&self, profile: &Profile, group: &str) -> FaultResult<Vec<String>>;

    async fn attach_load_balancer(
        &self,
        profile: &Profile,
        group: &str,
        load_balancer: &str,
    ) -> FaultResult<ProviderResponse>;

    async fn detach_load_balancer(
        &self,
        profile: &Profile,
        group: &str,
        load_balancer: &str,
    ) -> FaultResult<ProviderResponse>;

    async fn load_balancers(&self, profile: &Profile, group: &str) -> FaultResult<Vec<String>>;
}

#[async_trait::async_trait]
pub trait ClusterAdapter: ResourceAdapter<Spec = ClusterSpec> {
    async fn services(&self, profile: &Profile, cluster: &str) -> FaultResult<Vec<ServiceSummary>>;

    async fn scale_service(
        &self,
        profile: &Profile,
        cluster: &str,
        service: &str,
        desired_count: u32,
    ) -> FaultResult<ProviderResponse>;

    async fn delete_service(
        &self,
        profile: &Profile,
        cluster: &str,
        service: &str,
    ) -> FaultResult<ProviderResponse>;
}

#[async_trait::async_trait]
pub trait InstanceAdapter: Send + Sync {
    /// States of the given instances. Instances the provider no longer knows
    /// about are omitted.
    async fn describe(&self, profile: &Profile, ids: &[String]) -> FaultResult<Vec<InstanceStatus>>;
}

/// One adapter per resource kind, bound to a single provider.
#[async_trait::async_trait]
pub trait CloudProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn identity(&self, profile: &Profile) -> FaultResult<AccountIdentity>;

    fn policies(&self) -> &dyn ResourceAdapter<Spec = PolicySpec>;

    fn roles(&self) -> &dyn RoleAdapter;

    fn instance_profiles(&self) -> &dyn InstanceProfileAdapter;

    fn security_groups(&self) -> &dyn SecurityGroupAdapter;

    fn launch_configurations(&self) -> &dyn ResourceAdapter<Spec = LaunchConfigurationSpec>;

    fn autoscaling_groups(&self) -> &dyn AutoScalingGroupAdapter;

    fn clusters(&self) -> &dyn ClusterAdapter;

    fn instances(&self) -> &dyn InstanceAdapter;

    fn load_balancers(&self) -> &dyn ResourceAdapter<Spec = LoadBalancerSpec>;

    fn buckets(&self) -> &dyn ResourceAdapter<Spec = BucketSpec>;

    fn objects(&self) -> &dyn ResourceAdapter<Spec = ObjectSpec>;
}
