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

//! In-process simulated cloud.
//!
//! The sandbox implements every adapter contract against shared in-memory
//! state. It models the behaviour the job layer has to cope with:
//!
//! * a created resource stays invisible to `fetch_by_name` for
//!   `visibility_lag` lookups, and a deleted one stays visible (as pending)
//!   for `deletion_lag` lookups;
//! * deleting an autoscaling group moves its instances to `shutting-down`,
//!   and they report `terminated` after `termination_lag` describes;
//! * provider dependencies are enforced, so deleting a security group that a
//!   live instance still uses fails with `DependencyViolation`;
//! * a deleted cluster is kept as an inactive record.
//!
//! Faults and raw responses can be injected per kind and verb, and every
//! call is recorded. State can be persisted to a JSON file so that separate
//! CLI invocations see the same cloud.

use super::adapter::{
    AccountIdentity, AutoScalingGroupAdapter, CloudProvider, ClusterAdapter, FaultResult,
    InstanceAdapter, InstanceProfileAdapter, InstanceState, InstanceStatus, Profile,
    ProviderResponse, ResourceAdapter, RoleAdapter, SecurityGroupAdapter, ServiceSummary,
};
use super::specs::{
    AutoScalingGroupSpec, BucketSpec, ClusterSpec, InstanceProfileSpec, LaunchConfigurationSpec,
    LoadBalancerSpec, ObjectSpec, PolicySpec, RoleSpec, SecurityGroupSpec,
};
use crate::domain::resource::{ExistenceState, Resource, ResourceKind, ResourceRef, Tag};
use crate::infrastructure::constants::{SANDBOX_ACCOUNT_ID, SANDBOX_PROVIDER_NAME};
use crate::shared::error::{ProviderFault, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxOptions {
    pub account_id: String,
    /// Lookups that miss a freshly created resource.
    pub visibility_lag: u32,
    /// Lookups that still see a deleted resource.
    pub deletion_lag: u32,
    /// Describes that still report a terminating instance as shutting down.
    pub termination_lag: u32,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            account_id: SANDBOX_ACCOUNT_ID.to_string(),
            visibility_lag: 1,
            deletion_lag: 1,
            termination_lag: 1,
        }
    }
}

impl SandboxOptions {
    /// A strongly consistent sandbox.
    pub fn immediate() -> Self {
        Self {
            visibility_lag: 0,
            deletion_lag: 0,
            termination_lag: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verb {
    Create,
    Delete,
    FetchByName,
    FetchAll,
    Attach,
    Detach,
    Tag,
    Scale,
    Describe,
}

impl Verb {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Verb::Create | Verb::Delete | Verb::Attach | Verb::Detach | Verb::Tag | Verb::Scale
        )
    }
}

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: ResourceKind,
    pub verb: Verb,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum Injected {
    Fault(ProviderFault),
    Response(ProviderResponse),
}

#[derive(Debug, Clone)]
struct Injection {
    kind: ResourceKind,
    verb: Verb,
    remaining: u32,
    outcome: Injected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    kind: ResourceKind,
    name: String,
    id: String,
    #[serde(default)]
    tags: Vec<Tag>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    hidden_for: u32,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    linger_for: u32,
    /// Attached policy ids (roles), role names (instance profiles) or load
    /// balancer names (autoscaling groups).
    #[serde(default)]
    links: Vec<String>,
    /// Security group ids (launch configurations) or the launch
    /// configuration name (autoscaling groups).
    #[serde(default)]
    references: Vec<String>,
    #[serde(default)]
    body: Option<serde_json::Value>,
}

impl Record {
    fn is_live(&self) -> bool {
        !self.deleted
    }

    fn is_inactive_cluster(&self) -> bool {
        self.kind == ResourceKind::Cluster && self.deleted && self.linger_for == 0
    }

    fn to_resource(&self, state: ExistenceState) -> Resource {
        Resource {
            kind: self.kind,
            name: self.name.clone(),
            id: self.id.clone(),
            state,
            tags: self.tags.clone(),
            created_at: Some(self.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstanceRecord {
    id: String,
    group: String,
    security_groups: Vec<String>,
    state: InstanceState,
    #[serde(default)]
    countdown: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServiceRecord {
    cluster: String,
    name: String,
    desired_count: u32,
    running_count: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct World {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    instances: Vec<InstanceRecord>,
    #[serde(default)]
    services: Vec<ServiceRecord>,
    #[serde(skip)]
    options: SandboxOptions,
    #[serde(skip)]
    injections: Vec<Injection>,
    #[serde(skip)]
    calls: Vec<Call>,
}

fn fault(status: u16, code: &str, message: impl Into<String>) -> ProviderFault {
    ProviderFault::new(status, code, message)
}

fn not_found(kind: ResourceKind, name: &str) -> ProviderFault {
    let (status, code) = match kind {
        ResourceKind::Policy | ResourceKind::Role | ResourceKind::InstanceProfile => {
            (404, "NoSuchEntity")
        }
        ResourceKind::SecurityGroup => (400, "InvalidGroup.NotFound"),
        ResourceKind::Cluster => (400, "ClusterNotFoundException"),
        ResourceKind::Service => (400, "ServiceNotFoundException"),
        ResourceKind::Instance => (400, "InvalidInstanceID.NotFound"),
        ResourceKind::Bucket => (404, "NoSuchBucket"),
        ResourceKind::Object => (404, "NoSuchKey"),
        ResourceKind::LaunchConfiguration
        | ResourceKind::AutoScalingGroup
        | ResourceKind::LoadBalancer => (404, "ResourceNotFound"),
    };
    fault(status, code, format!("The {} '{}' cannot be found.", kind, name))
}

fn arn(service: &str, region: &str, account: &str, path: &str) -> String {
    format!("arn:aws:{}:{}:{}:{}", service, region, account, path)
}

impl World {
    fn with_options(options: SandboxOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn respond(&mut self) -> ProviderResponse {
        let n = self.next();
        ProviderResponse::ok(format!("req-{:06}", n))
    }

    /// Record the call and apply any pending injection for it.
    fn begin(
        &mut self,
        kind: ResourceKind,
        verb: Verb,
        name: &str,
    ) -> FaultResult<Option<ProviderResponse>> {
        self.calls.push(Call {
            kind,
            verb,
            name: name.to_string(),
        });
        let injection = self
            .injections
            .iter_mut()
            .find(|i| i.kind == kind && i.verb == verb && i.remaining > 0);
        match injection {
            Some(injection) => {
                injection.remaining -= 1;
                debug!("sandbox: injected outcome for {:?} {}", verb, kind.as_str());
                match injection.outcome.clone() {
                    Injected::Fault(fault) => Err(fault),
                    Injected::Response(response) => Ok(Some(response)),
                }
            }
            None => Ok(None),
        }
    }

    fn position(&self, kind: ResourceKind, name: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.kind == kind && r.name == name)
    }

    fn live(&self, kind: ResourceKind, name: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|r| r.kind == kind && r.name == name && r.is_live())
    }

    fn live_mut(&mut self, kind: ResourceKind, name: &str) -> FaultResult<&mut Record> {
        self.records
            .iter_mut()
            .find(|r| r.kind == kind && r.name == name && r.is_live())
            .ok_or_else(|| not_found(kind, name))
    }

    fn live_of(&self, kind: ResourceKind) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .filter(move |r| r.kind == kind && r.is_live())
    }

    fn ensure_name_free(&mut self, kind: ResourceKind, name: &str) -> FaultResult<()> {
        if let Some(index) = self.position(kind, name) {
            if self.records[index].is_inactive_cluster() {
                self.records.remove(index);
            } else {
                return Err(fault(
                    409,
                    "EntityAlreadyExists",
                    format!("The {} '{}' already exists.", kind, name),
                ));
            }
        }
        Ok(())
    }

    fn assign_id(&mut self, kind: ResourceKind, profile: &Profile, name: &str) -> String {
        let account = self.options.account_id.clone();
        let region = profile.region();
        match kind {
            ResourceKind::Policy => arn("iam", "", &account, &format!("policy/{}", name)),
            ResourceKind::Role => arn("iam", "", &account, &format!("role/{}", name)),
            ResourceKind::InstanceProfile => {
                arn("iam", "", &account, &format!("instance-profile/{}", name))
            }
            ResourceKind::SecurityGroup => format!("sg-{:08x}", self.next()),
            ResourceKind::LaunchConfiguration => arn(
                "autoscaling",
                region,
                &account,
                &format!("launchConfiguration/{}", name),
            ),
            ResourceKind::AutoScalingGroup => arn(
                "autoscaling",
                region,
                &account,
                &format!("autoScalingGroup/{}", name),
            ),
            ResourceKind::Cluster => arn("ecs", region, &account, &format!("cluster/{}", name)),
            ResourceKind::Service => arn("ecs", region, &account, &format!("service/{}", name)),
            ResourceKind::Instance => format!("i-{:017x}", self.next()),
            ResourceKind::LoadBalancer => arn(
                "elasticloadbalancing",
                region,
                &account,
                &format!("loadbalancer/{}", name),
            ),
            ResourceKind::Bucket | ResourceKind::Object => name.to_string(),
        }
    }

    /// Lookup by name, advancing the consistency lag counters.
    fn observe(&mut self, kind: ResourceKind, name: &str) -> Option<Resource> {
        let index = self.position(kind, name)?;
        let record = &mut self.records[index];
        if record.hidden_for > 0 {
            record.hidden_for -= 1;
            return None;
        }
        if record.deleted {
            if record.linger_for > 0 {
                record.linger_for -= 1;
                return Some(record.to_resource(ExistenceState::Pending));
            }
            if kind == ResourceKind::Cluster {
                return Some(record.to_resource(ExistenceState::Absent));
            }
            self.records.remove(index);
            return None;
        }
        Some(record.to_resource(ExistenceState::Active))
    }

    fn snapshot(&mut self, kind: ResourceKind) -> Vec<Resource> {
        self.records
            .retain(|r| !(r.deleted && r.linger_for == 0 && r.kind != ResourceKind::Cluster));
        self.records
            .iter()
            .filter(|r| r.kind == kind && r.hidden_for == 0)
            .map(|r| {
                let state = if r.is_inactive_cluster() {
                    ExistenceState::Absent
                } else if r.deleted {
                    ExistenceState::Pending
                } else {
                    ExistenceState::Active
                };
                r.to_resource(state)
            })
            .collect()
    }

    fn blocking_dependency(&self, record: &Record) -> Option<ProviderFault> {
        match record.kind {
            ResourceKind::Policy => self
                .live_of(ResourceKind::Role)
                .any(|role| role.links.contains(&record.id))
                .then(|| {
                    fault(
                        409,
                        "DeleteConflict",
                        "Cannot delete a policy attached to entities.",
                    )
                }),
            ResourceKind::Role => {
                if !record.links.is_empty() {
                    return Some(fault(
                        409,
                        "DeleteConflict",
                        "Cannot delete entity, must detach all policies first.",
                    ));
                }
                self.live_of(ResourceKind::InstanceProfile)
                    .any(|p| p.links.contains(&record.name))
                    .then(|| {
                        fault(
                            409,
                            "DeleteConflict",
                            "Cannot delete entity, must remove roles from instance profile first.",
                        )
                    })
            }
            ResourceKind::InstanceProfile => (!record.links.is_empty()).then(|| {
                fault(
                    409,
                    "DeleteConflict",
                    "Cannot delete entity, must remove roles from instance profile first.",
                )
            }),
            ResourceKind::SecurityGroup => {
                let used_by_instance = self.instances.iter().any(|i| {
                    !i.state.is_terminal() && i.security_groups.contains(&record.id)
                });
                let used_by_config = self
                    .live_of(ResourceKind::LaunchConfiguration)
                    .any(|lc| lc.references.contains(&record.id));
                (used_by_instance || used_by_config).then(|| {
                    fault(
                        400,
                        "DependencyViolation",
                        format!("resource {} has a dependent object", record.id),
                    )
                })
            }
            ResourceKind::LaunchConfiguration => self
                .live_of(ResourceKind::AutoScalingGroup)
                .find(|asg| asg.references.contains(&record.name))
                .map(|asg| {
                    fault(
                        400,
                        "ResourceInUse",
                        format!(
                            "Cannot delete launch configuration {} because it is attached to AutoScalingGroup {}",
                            record.name, asg.name
                        ),
                    )
                }),
            ResourceKind::LoadBalancer => self
                .live_of(ResourceKind::AutoScalingGroup)
                .any(|asg| asg.links.contains(&record.name))
                .then(|| {
                    fault(
                        400,
                        "ResourceInUse",
                        format!("Load balancer {} is attached to a group", record.name),
                    )
                }),
            ResourceKind::Cluster => self
                .services
                .iter()
                .any(|s| s.cluster == record.name)
                .then(|| {
                    fault(
                        400,
                        "ClusterContainsServicesException",
                        "The Cluster cannot be deleted while Services are active.",
                    )
                }),
            ResourceKind::Bucket => {
                let prefix = format!("{}/", record.name);
                self.live_of(ResourceKind::Object)
                    .any(|o| o.name.starts_with(&prefix))
                    .then(|| {
                        fault(
                            409,
                            "BucketNotEmpty",
                            "The bucket you tried to delete is not empty",
                        )
                    })
            }
            ResourceKind::AutoScalingGroup
            | ResourceKind::Service
            | ResourceKind::Instance
            | ResourceKind::Object => None,
        }
    }

    fn remove(&mut self, kind: ResourceKind, reference: &ResourceRef) -> FaultResult<()> {
        let index = self
            .records
            .iter()
            .position(|r| {
                r.kind == kind
                    && r.name == reference.name
                    && r.is_live()
                    && (reference.id.is_empty() || r.id == reference.id)
            })
            .ok_or_else(|| not_found(kind, &reference.name))?;

        if let Some(fault) = self.blocking_dependency(&self.records[index]) {
            return Err(fault);
        }

        if kind == ResourceKind::AutoScalingGroup {
            let lag = self.options.termination_lag;
            for instance in self
                .instances
                .iter_mut()
                .filter(|i| i.group == reference.name && !i.state.is_terminal())
            {
                if lag == 0 {
                    instance.state = InstanceState::Terminated;
                } else {
                    instance.state = InstanceState::ShuttingDown;
                    instance.countdown = lag;
                }
            }
        }

        let linger = self.options.deletion_lag;
        let record = &mut self.records[index];
        record.deleted = true;
        record.linger_for = linger;
        Ok(())
    }
}

type SharedWorld = Arc<Mutex<World>>;

/// Per-kind create behaviour of the sandbox.
trait SandboxSpec: Send + Sync + 'static {
    fn resource_name(&self) -> String;

    fn apply(&self, _world: &mut World, _record: &mut Record) -> FaultResult<()> {
        Ok(())
    }
}

impl SandboxSpec for PolicySpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }

    fn apply(&self, _world: &mut World, record: &mut Record) -> FaultResult<()> {
        record.body = Some(self.document.clone());
        Ok(())
    }
}

impl SandboxSpec for RoleSpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }

    fn apply(&self, _world: &mut World, record: &mut Record) -> FaultResult<()> {
        record.body = Some(self.trust_document.clone());
        Ok(())
    }
}

impl SandboxSpec for InstanceProfileSpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }
}

impl SandboxSpec for SecurityGroupSpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }

    fn apply(&self, _world: &mut World, record: &mut Record) -> FaultResult<()> {
        record.body = Some(serde_json::json!({
            "description": self.description,
            "network": self.network,
        }));
        Ok(())
    }
}

impl SandboxSpec for LaunchConfigurationSpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }

    fn apply(&self, world: &mut World, record: &mut Record) -> FaultResult<()> {
        if let Some(profile) = &self.instance_profile {
            let ready = world
                .live(ResourceKind::InstanceProfile, profile)
                .map(|p| p.hidden_for == 0 && !p.links.is_empty())
                .unwrap_or(false);
            if !ready {
                return Err(fault(
                    400,
                    "ValidationError",
                    format!("Invalid IamInstanceProfile: {}", profile),
                ));
            }
        }
        for group in &self.security_groups {
            if !world
                .live_of(ResourceKind::SecurityGroup)
                .any(|sg| &sg.id == group)
            {
                return Err(fault(
                    400,
                    "ValidationError",
                    format!("The security group '{}' does not exist", group),
                ));
            }
        }
        record.references = self.security_groups.clone();
        record.body = Some(serde_json::json!({
            "image": self.image,
            "instance_type": self.instance_type,
            "key_pair": self.key_pair,
            "instance_profile": self.instance_profile,
            "public_ip": self.public_ip,
            "user_data": self.user_data,
        }));
        Ok(())
    }
}

impl SandboxSpec for AutoScalingGroupSpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }

    fn apply(&self, world: &mut World, record: &mut Record) -> FaultResult<()> {
        let security_groups = world
            .live(ResourceKind::LaunchConfiguration, &self.launch_configuration)
            .map(|lc| lc.references.clone())
            .ok_or_else(|| {
                fault(
                    400,
                    "ValidationError",
                    format!(
                        "Launch configuration name not found - {}",
                        self.launch_configuration
                    ),
                )
            })?;
        if self.zones.is_empty() && self.subnets.is_empty() {
            return Err(fault(
                400,
                "ValidationError",
                "At least one Availability Zone or VPC Subnet is required.",
            ));
        }
        if self.min_size > self.desired_size || self.desired_size > self.max_size {
            return Err(fault(
                400,
                "ValidationError",
                "Desired capacity must be between the min and max size",
            ));
        }

        for _ in 0..self.desired_size {
            let id = format!("i-{:017x}", world.next());
            world.instances.push(InstanceRecord {
                id,
                group: self.name.clone(),
                security_groups: security_groups.clone(),
                state: InstanceState::Running,
                countdown: 0,
            });
        }
        record.references = vec![self.launch_configuration.clone()];
        record.body = Some(serde_json::json!({
            "min_size": self.min_size,
            "max_size": self.max_size,
            "desired_size": self.desired_size,
            "zones": self.zones,
            "subnets": self.subnets,
        }));
        Ok(())
    }
}

impl SandboxSpec for ClusterSpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }
}

impl SandboxSpec for LoadBalancerSpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }
}

impl SandboxSpec for BucketSpec {
    fn resource_name(&self) -> String {
        self.name.clone()
    }

    fn apply(&self, _world: &mut World, record: &mut Record) -> FaultResult<()> {
        record.body = Some(serde_json::json!({ "private": self.private }));
        Ok(())
    }
}

impl SandboxSpec for ObjectSpec {
    fn resource_name(&self) -> String {
        self.path()
    }

    fn apply(&self, world: &mut World, record: &mut Record) -> FaultResult<()> {
        if world.live(ResourceKind::Bucket, &self.bucket).is_none() {
            return Err(not_found(ResourceKind::Bucket, &self.bucket));
        }
        record.body = Some(serde_json::Value::String(self.contents.clone()));
        Ok(())
    }
}

struct SandboxAdapter<S> {
    kind: ResourceKind,
    world: SharedWorld,
    _spec: PhantomData<fn() -> S>,
}

impl<S> SandboxAdapter<S> {
    fn new(kind: ResourceKind, world: SharedWorld) -> Self {
        Self {
            kind,
            world,
            _spec: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<S: SandboxSpec> ResourceAdapter for SandboxAdapter<S> {
    type Spec = S;

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn create(&self, profile: &Profile, spec: &S) -> FaultResult<ProviderResponse> {
        let name = spec.resource_name();
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Create, &name)? {
            return Ok(response);
        }
        world.ensure_name_free(self.kind, &name)?;

        let id = world.assign_id(self.kind, profile, &name);
        let mut record = Record {
            kind: self.kind,
            name: name.clone(),
            id: id.clone(),
            tags: Vec::new(),
            created_at: Utc::now(),
            hidden_for: world.options.visibility_lag,
            deleted: false,
            linger_for: 0,
            links: Vec::new(),
            references: Vec::new(),
            body: None,
        };
        spec.apply(&mut world, &mut record)?;
        world.records.push(record);
        debug!("sandbox: created {} '{}' ({})", self.kind.as_str(), name, id);

        Ok(world.respond().with_resource_id(id))
    }

    async fn delete(
        &self,
        _profile: &Profile,
        reference: &ResourceRef,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Delete, &reference.name)? {
            return Ok(response);
        }
        world.remove(self.kind, reference)?;
        debug!("sandbox: deleted {} '{}'", self.kind.as_str(), reference.name);
        Ok(world.respond())
    }

    async fn fetch_by_name(&self, _profile: &Profile, name: &str) -> FaultResult<Option<Resource>> {
        let mut world = self.world.lock().await;
        world.begin(self.kind, Verb::FetchByName, name)?;
        Ok(world.observe(self.kind, name))
    }

    async fn fetch_all(&self, _profile: &Profile) -> FaultResult<Vec<Resource>> {
        let mut world = self.world.lock().await;
        world.begin(self.kind, Verb::FetchAll, "")?;
        Ok(world.snapshot(self.kind))
    }
}

fn merge_tags(existing: &mut Vec<Tag>, tags: &[Tag]) {
    for tag in tags {
        match existing.iter_mut().find(|t| t.key == tag.key) {
            Some(current) => current.value = tag.value.clone(),
            None => existing.push(tag.clone()),
        }
    }
}

#[async_trait::async_trait]
impl RoleAdapter for SandboxAdapter<RoleSpec> {
    async fn attach_policy(
        &self,
        _profile: &Profile,
        role: &str,
        policy_id: &str,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Attach, role)? {
            return Ok(response);
        }
        if !world
            .live_of(ResourceKind::Policy)
            .any(|p| p.id == policy_id)
        {
            return Err(not_found(ResourceKind::Policy, policy_id));
        }
        let record = world.live_mut(ResourceKind::Role, role)?;
        if !record.links.iter().any(|id| id == policy_id) {
            record.links.push(policy_id.to_string());
        }
        Ok(world.respond())
    }

    async fn detach_policy(
        &self,
        _profile: &Profile,
        role: &str,
        policy_id: &str,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Detach, role)? {
            return Ok(response);
        }
        let record = world.live_mut(ResourceKind::Role, role)?;
        let before = record.links.len();
        record.links.retain(|id| id != policy_id);
        if record.links.len() == before {
            return Err(not_found(ResourceKind::Policy, policy_id));
        }
        Ok(world.respond())
    }

    async fn attached_policies(&self, _profile: &Profile, role: &str) -> FaultResult<Vec<String>> {
        let mut world = self.world.lock().await;
        world.begin(self.kind, Verb::Describe, role)?;
        Ok(world.live_mut(ResourceKind::Role, role)?.links.clone())
    }
}

#[async_trait::async_trait]
impl InstanceProfileAdapter for SandboxAdapter<InstanceProfileSpec> {
    async fn add_role(
        &self,
        _profile: &Profile,
        instance_profile: &str,
        role: &str,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Attach, instance_profile)? {
            return Ok(response);
        }
        if world.live(ResourceKind::Role, role).is_none() {
            return Err(not_found(ResourceKind::Role, role));
        }
        let record = world.live_mut(ResourceKind::InstanceProfile, instance_profile)?;
        if !record.links.is_empty() {
            return Err(fault(
                409,
                "LimitExceeded",
                "Cannot exceed quota for InstanceSessionsPerInstanceProfile: 1",
            ));
        }
        record.links.push(role.to_string());
        Ok(world.respond())
    }

    async fn remove_role(
        &self,
        _profile: &Profile,
        instance_profile: &str,
        role: &str,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Detach, instance_profile)? {
            return Ok(response);
        }
        let record = world.live_mut(ResourceKind::InstanceProfile, instance_profile)?;
        let before = record.links.len();
        record.links.retain(|r| r != role);
        if record.links.len() == before {
            return Err(not_found(ResourceKind::Role, role));
        }
        Ok(world.respond())
    }

    async fn roles(&self, _profile: &Profile, instance_profile: &str) -> FaultResult<Vec<String>> {
        let mut world = self.world.lock().await;
        world.begin(self.kind, Verb::Describe, instance_profile)?;
        Ok(world
            .live_mut(ResourceKind::InstanceProfile, instance_profile)?
            .links
            .clone())
    }
}

#[async_trait::async_trait]
impl SecurityGroupAdapter for SandboxAdapter<SecurityGroupSpec> {
    async fn tag(
        &self,
        _profile: &Profile,
        group_id: &str,
        tags: &[Tag],
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Tag, group_id)? {
            return Ok(response);
        }
        let record = world
            .records
            .iter_mut()
            .find(|r| r.kind == ResourceKind::SecurityGroup && r.id == group_id && r.is_live())
            .ok_or_else(|| not_found(ResourceKind::SecurityGroup, group_id))?;
        merge_tags(&mut record.tags, tags);
        Ok(world.respond())
    }
}

#[async_trait::async_trait]
impl AutoScalingGroupAdapter for SandboxAdapter<AutoScalingGroupSpec> {
    async fn tag(
        &self,
        _profile: &Profile,
        group: &str,
        tags: &[Tag],
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Tag, group)? {
            return Ok(response);
        }
        let record = world.live_mut(ResourceKind::AutoScalingGroup, group)?;
        merge_tags(&mut record.tags, tags);
        Ok(world.respond())
    }

    async fn instances(&self, _profile: &Profile, group: &str) -> FaultResult<Vec<String>> {
        let mut world = self.world.lock().await;
        world.begin(self.kind, Verb::Describe, group)?;
        if world.live(ResourceKind::AutoScalingGroup, group).is_none() {
            return Err(not_found(ResourceKind::AutoScalingGroup, group));
        }
        Ok(world
            .instances
            .iter()
            .filter(|i| i.group == group && !i.state.is_terminal())
            .map(|i| i.id.clone())
            .collect())
    }

    async fn attach_load_balancer(
        &self,
        _profile: &Profile,
        group: &str,
        load_balancer: &str,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Attach, group)? {
            return Ok(response);
        }
        if world.live(ResourceKind::LoadBalancer, load_balancer).is_none() {
            return Err(not_found(ResourceKind::LoadBalancer, load_balancer));
        }
        let record = world.live_mut(ResourceKind::AutoScalingGroup, group)?;
        if !record.links.iter().any(|lb| lb == load_balancer) {
            record.links.push(load_balancer.to_string());
        }
        Ok(world.respond())
    }

    async fn detach_load_balancer(
        &self,
        _profile: &Profile,
        group: &str,
        load_balancer: &str,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(self.kind, Verb::Detach, group)? {
            return Ok(response);
        }
        let record = world.live_mut(ResourceKind::AutoScalingGroup, group)?;
        record.links.retain(|lb| lb != load_balancer);
        Ok(world.respond())
    }

    async fn load_balancers(&self, _profile: &Profile, group: &str) -> FaultResult<Vec<String>> {
        let mut world = self.world.lock().await;
        world.begin(self.kind, Verb::Describe, group)?;
        Ok(world
            .live_mut(ResourceKind::AutoScalingGroup, group)?
            .links
            .clone())
    }
}

#[async_trait::async_trait]
impl ClusterAdapter for SandboxAdapter<ClusterSpec> {
    async fn services(&self, _profile: &Profile, cluster: &str) -> FaultResult<Vec<ServiceSummary>> {
        let mut world = self.world.lock().await;
        world.begin(ResourceKind::Service, Verb::FetchAll, cluster)?;
        if world.live(ResourceKind::Cluster, cluster).is_none() {
            return Err(not_found(ResourceKind::Cluster, cluster));
        }
        Ok(world
            .services
            .iter()
            .filter(|s| s.cluster == cluster)
            .map(|s| ServiceSummary {
                name: s.name.clone(),
                desired_count: s.desired_count,
                running_count: s.running_count,
            })
            .collect())
    }

    async fn scale_service(
        &self,
        _profile: &Profile,
        cluster: &str,
        service: &str,
        desired_count: u32,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(ResourceKind::Service, Verb::Scale, service)? {
            return Ok(response);
        }
        let record = world
            .services
            .iter_mut()
            .find(|s| s.cluster == cluster && s.name == service)
            .ok_or_else(|| not_found(ResourceKind::Service, service))?;
        record.desired_count = desired_count;
        record.running_count = desired_count;
        Ok(world.respond())
    }

    async fn delete_service(
        &self,
        _profile: &Profile,
        cluster: &str,
        service: &str,
    ) -> FaultResult<ProviderResponse> {
        let mut world = self.world.lock().await;
        if let Some(response) = world.begin(ResourceKind::Service, Verb::Delete, service)? {
            return Ok(response);
        }
        let index = world
            .services
            .iter()
            .position(|s| s.cluster == cluster && s.name == service)
            .ok_or_else(|| not_found(ResourceKind::Service, service))?;
        if world.services[index].desired_count > 0 {
            return Err(fault(
                400,
                "InvalidParameterException",
                "The service cannot be stopped while it is scaled above 0.",
            ));
        }
        world.services.remove(index);
        Ok(world.respond())
    }
}

struct SandboxInstances {
    world: SharedWorld,
}

#[async_trait::async_trait]
impl InstanceAdapter for SandboxInstances {
    async fn describe(&self, _profile: &Profile, ids: &[String]) -> FaultResult<Vec<InstanceStatus>> {
        let mut world = self.world.lock().await;
        world.begin(ResourceKind::Instance, Verb::Describe, &ids.join(","))?;
        let mut statuses = Vec::new();
        for instance in world.instances.iter_mut().filter(|i| ids.contains(&i.id)) {
            if instance.state == InstanceState::ShuttingDown {
                if instance.countdown == 0 {
                    instance.state = InstanceState::Terminated;
                } else {
                    instance.countdown -= 1;
                }
            }
            statuses.push(InstanceStatus {
                id: instance.id.clone(),
                state: instance.state,
            });
        }
        Ok(statuses)
    }
}

/// The bundled simulated provider.
pub struct SandboxProvider {
    world: SharedWorld,
    policies: SandboxAdapter<PolicySpec>,
    roles: SandboxAdapter<RoleSpec>,
    instance_profiles: SandboxAdapter<InstanceProfileSpec>,
    security_groups: SandboxAdapter<SecurityGroupSpec>,
    launch_configurations: SandboxAdapter<LaunchConfigurationSpec>,
    autoscaling_groups: SandboxAdapter<AutoScalingGroupSpec>,
    clusters: SandboxAdapter<ClusterSpec>,
    instances: SandboxInstances,
    load_balancers: SandboxAdapter<LoadBalancerSpec>,
    buckets: SandboxAdapter<BucketSpec>,
    objects: SandboxAdapter<ObjectSpec>,
}

impl SandboxProvider {
    pub fn new(options: SandboxOptions) -> Self {
        Self::from_world(World::with_options(options))
    }

    fn from_world(world: World) -> Self {
        let world = Arc::new(Mutex::new(world));
        Self {
            policies: SandboxAdapter::new(ResourceKind::Policy, world.clone()),
            roles: SandboxAdapter::new(ResourceKind::Role, world.clone()),
            instance_profiles: SandboxAdapter::new(ResourceKind::InstanceProfile, world.clone()),
            security_groups: SandboxAdapter::new(ResourceKind::SecurityGroup, world.clone()),
            launch_configurations: SandboxAdapter::new(
                ResourceKind::LaunchConfiguration,
                world.clone(),
            ),
            autoscaling_groups: SandboxAdapter::new(ResourceKind::AutoScalingGroup, world.clone()),
            clusters: SandboxAdapter::new(ResourceKind::Cluster, world.clone()),
            instances: SandboxInstances {
                world: world.clone(),
            },
            load_balancers: SandboxAdapter::new(ResourceKind::LoadBalancer, world.clone()),
            buckets: SandboxAdapter::new(ResourceKind::Bucket, world.clone()),
            objects: SandboxAdapter::new(ResourceKind::Object, world.clone()),
            world,
        }
    }

    /// Load persisted state, or start empty when the file does not exist.
    pub fn load(path: &Path, options: SandboxOptions) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(options));
        }
        let content = std::fs::read_to_string(path)?;
        let mut world: World = serde_json::from_str(&content)?;
        world.options = options;
        Ok(Self::from_world(world))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let world = self.world.lock().await;
        let content = serde_json::to_string_pretty(&*world)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fail the next `times` calls of `verb` on `kind` with `fault`.
    pub async fn inject_fault(&self, kind: ResourceKind, verb: Verb, fault: ProviderFault, times: u32) {
        self.world.lock().await.injections.push(Injection {
            kind,
            verb,
            remaining: times,
            outcome: Injected::Fault(fault),
        });
    }

    /// Answer the next `times` calls of `verb` on `kind` with `response`
    /// without applying them.
    pub async fn inject_response(
        &self,
        kind: ResourceKind,
        verb: Verb,
        response: ProviderResponse,
        times: u32,
    ) {
        self.world.lock().await.injections.push(Injection {
            kind,
            verb,
            remaining: times,
            outcome: Injected::Response(response),
        });
    }

    /// Add a running service to a cluster.
    pub async fn seed_service(&self, cluster: &str, service: &str, desired_count: u32) {
        self.world.lock().await.services.push(ServiceRecord {
            cluster: cluster.to_string(),
            name: service.to_string(),
            desired_count,
            running_count: desired_count,
        });
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.world.lock().await.calls.clone()
    }

    pub async fn mutations(&self) -> Vec<Call> {
        self.world
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.verb.is_mutation())
            .cloned()
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.world.lock().await.calls.clear();
    }

    /// Names of resources of `kind` that exist and are not being deleted,
    /// regardless of visibility lag.
    pub async fn live_names(&self, kind: ResourceKind) -> Vec<String> {
        self.world
            .lock()
            .await
            .live_of(kind)
            .map(|r| r.name.clone())
            .collect()
    }

    pub async fn tags_of(&self, kind: ResourceKind, name: &str) -> Vec<Tag> {
        self.world
            .lock()
            .await
            .live(kind, name)
            .map(|r| r.tags.clone())
            .unwrap_or_default()
    }

    /// Stored contents of a live object.
    pub async fn object_contents(&self, path: &str) -> Option<String> {
        self.world
            .lock()
            .await
            .live(ResourceKind::Object, path)
            .and_then(|r| r.body.as_ref())
            .and_then(|b| b.as_str().map(str::to_string))
    }

    /// Launch parameters recorded for a launch configuration.
    pub async fn launch_configuration_body(&self, name: &str) -> Option<serde_json::Value> {
        self.world
            .lock()
            .await
            .live(ResourceKind::LaunchConfiguration, name)
            .and_then(|r| r.body.clone())
    }

    /// Instance states of a group without advancing termination.
    pub async fn instance_states(&self, group: &str) -> Vec<InstanceStatus> {
        self.world
            .lock()
            .await
            .instances
            .iter()
            .filter(|i| i.group == group)
            .map(|i| InstanceStatus {
                id: i.id.clone(),
                state: i.state,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl CloudProvider for SandboxProvider {
    fn name(&self) -> &str {
        SANDBOX_PROVIDER_NAME
    }

    async fn identity(&self, profile: &Profile) -> FaultResult<AccountIdentity> {
        let world = self.world.lock().await;
        Ok(AccountIdentity {
            account_id: world.options.account_id.clone(),
            region: profile.region().to_string(),
        })
    }

    fn policies(&self) -> &dyn ResourceAdapter<Spec = PolicySpec> {
        &self.policies
    }

    fn roles(&self) -> &dyn RoleAdapter {
        &self.roles
    }

    fn instance_profiles(&self) -> &dyn InstanceProfileAdapter {
        &self.instance_profiles
    }

    fn security_groups(&self) -> &dyn SecurityGroupAdapter {
        &self.security_groups
    }

    fn launch_configurations(&self) -> &dyn ResourceAdapter<Spec = LaunchConfigurationSpec> {
        &self.launch_configurations
    }

    fn autoscaling_groups(&self) -> &dyn AutoScalingGroupAdapter {
        &self.autoscaling_groups
    }

    fn clusters(&self) -> &dyn ClusterAdapter {
        &self.clusters
    }

    fn instances(&self) -> &dyn InstanceAdapter {
        &self.instances
    }

    fn load_balancers(&self) -> &dyn ResourceAdapter<Spec = LoadBalancerSpec> {
        &self.load_balancers
    }

    fn buckets(&self) -> &dyn ResourceAdapter<Spec = BucketSpec> {
        &self.buckets
    }

    fn objects(&self) -> &dyn ResourceAdapter<Spec = ObjectSpec> {
        &self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile::new("default", "us-east-1")
    }

    fn cluster(name: &str) -> ClusterSpec {
        ClusterSpec {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_created_resource_becomes_visible_after_lag() {
        let sandbox = SandboxProvider::new(SandboxOptions {
            visibility_lag: 2,
            ..SandboxOptions::immediate()
        });
        let clusters = sandbox.clusters();
        clusters.create(&profile(), &cluster("demo")).await.unwrap();

        assert!(clusters.fetch_by_name(&profile(), "demo").await.unwrap().is_none());
        assert!(clusters.fetch_by_name(&profile(), "demo").await.unwrap().is_none());
        let found = clusters.fetch_by_name(&profile(), "demo").await.unwrap().unwrap();
        assert_eq!(found.state, ExistenceState::Active);
    }

    #[tokio::test]
    async fn test_deleted_cluster_is_kept_inactive() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        let clusters = sandbox.clusters();
        clusters.create(&profile(), &cluster("demo")).await.unwrap();
        let found = clusters.fetch_by_name(&profile(), "demo").await.unwrap().unwrap();
        clusters.delete(&profile(), &found.reference()).await.unwrap();

        let inactive = clusters.fetch_by_name(&profile(), "demo").await.unwrap().unwrap();
        assert_eq!(inactive.state, ExistenceState::Absent);
        assert!(!inactive.exists());

        // The name can be reused.
        clusters.create(&profile(), &cluster("demo")).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_create_is_a_name_conflict() {
        let sandbox = SandboxProvider::new(SandboxOptions::default());
        sandbox.clusters().create(&profile(), &cluster("demo")).await.unwrap();
        let fault = sandbox
            .clusters()
            .create(&profile(), &cluster("demo"))
            .await
            .unwrap_err();
        assert_eq!(fault.code, "EntityAlreadyExists");
    }

    #[tokio::test]
    async fn test_attached_policy_blocks_role_delete() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        let policy = PolicySpec {
            name: "p".to_string(),
            document: serde_json::json!({}),
        };
        let role = RoleSpec {
            name: "r".to_string(),
            trust_document: serde_json::json!({}),
        };
        let policy_id = sandbox
            .policies()
            .create(&profile(), &policy)
            .await
            .unwrap()
            .resource_id
            .unwrap();
        sandbox.roles().create(&profile(), &role).await.unwrap();
        sandbox
            .roles()
            .attach_policy(&profile(), "r", &policy_id)
            .await
            .unwrap();

        let reference = ResourceRef {
            name: "r".to_string(),
            id: String::new(),
        };
        let fault = sandbox.roles().delete(&profile(), &reference).await.unwrap_err();
        assert_eq!(fault.code, "DeleteConflict");

        sandbox
            .roles()
            .detach_policy(&profile(), "r", &policy_id)
            .await
            .unwrap();
        sandbox.roles().delete(&profile(), &reference).await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_fault_is_consumed() {
        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        sandbox
            .inject_fault(
                ResourceKind::Bucket,
                Verb::Create,
                ProviderFault::new(500, "InternalError", "boom"),
                1,
            )
            .await;
        let spec = BucketSpec {
            name: "b".to_string(),
            private: true,
        };
        assert!(sandbox.buckets().create(&profile(), &spec).await.is_err());
        assert!(sandbox.buckets().create(&profile(), &spec).await.is_ok());

        let calls = sandbox.mutations().await;
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.kind == ResourceKind::Bucket));
    }

    #[tokio::test]
    async fn test_state_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox.json");

        let sandbox = SandboxProvider::new(SandboxOptions::immediate());
        sandbox.clusters().create(&profile(), &cluster("demo")).await.unwrap();
        sandbox.save(&path).await.unwrap();

        let reloaded = SandboxProvider::load(&path, SandboxOptions::immediate()).unwrap();
        assert_eq!(reloaded.live_names(ResourceKind::Cluster).await, vec!["demo"]);
        assert!(reloaded.calls().await.is_empty());
    }
}
