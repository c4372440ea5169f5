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

//! Cluster creation: every child resource in dependency order, each one
//! observed before the next is requested.

use crate::domain::cluster::bootstrap::{self, BootstrapLocation};
use crate::domain::cluster::naming::ClusterNames;
use crate::domain::cluster::request::{ClusterRequest, UserDataPart};
use crate::domain::cluster::validator::ClusterValidator;
use crate::domain::config::{ProvisionerConfig, Schedules};
use crate::domain::jobs::{catalog, guard, lifecycle, wait_for};
use crate::domain::report::Reporter;
use crate::domain::resource::{Resource, ResourceKind, Tag};
use crate::infrastructure::constants::{
    AGENT_POLICY_ACTIONS, BOOTSTRAP_TAG_KEY, COMPUTE_SERVICE_PRINCIPAL, POLICY_DOCUMENT_VERSION,
};
use crate::infrastructure::provider::dispatch;
use crate::infrastructure::provider::{
    AutoScalingGroupSpec, BucketSpec, CloudProvider, ClusterSpec, InstanceProfileSpec,
    LaunchConfigurationSpec, ObjectSpec, PolicySpec, Profile, RoleSpec, SecurityGroupSpec,
};
use crate::shared::error::{ProvisionError, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

/// One child resource of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildResource {
    pub kind: ResourceKind,
    pub name: String,
    pub id: String,
}

impl From<&Resource> for ChildResource {
    fn from(resource: &Resource) -> Self {
        Self {
            kind: resource.kind,
            name: resource.name.clone(),
            id: resource.id.clone(),
        }
    }
}

/// What a successful create produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterDescription {
    pub name: String,
    /// Children in creation order, the cluster itself last.
    pub resources: Vec<ChildResource>,
    /// Tags applied to the autoscaling group.
    pub tags: Vec<Tag>,
    pub bootstrap: Option<BootstrapLocation>,
}

impl ClusterDescription {
    pub fn resource(&self, kind: ResourceKind) -> Option<&ChildResource> {
        self.resources.iter().find(|r| r.kind == kind)
    }
}

/// Permissions the container agent needs on its instances.
pub fn agent_policy_document() -> Value {
    json!({
        "Version": POLICY_DOCUMENT_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Action": AGENT_POLICY_ACTIONS,
            "Resource": "*",
        }],
    })
}

/// Lets compute instances assume the cluster role.
pub fn compute_trust_document() -> Value {
    json!({
        "Version": POLICY_DOCUMENT_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": COMPUTE_SERVICE_PRINCIPAL },
            "Action": "sts:AssumeRole",
        }],
    })
}

/// Inputs resolved before the first mutating call.
struct Plan {
    names: ClusterNames,
    image: String,
    instance_type: String,
    extra_security_groups: Vec<String>,
    bootstrap: Option<BootstrapLocation>,
}

pub struct Provisioner<'a> {
    provider: &'a dyn CloudProvider,
    profile: &'a Profile,
    config: &'a ProvisionerConfig,
    schedules: Schedules,
    reporter: &'a dyn Reporter,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        provider: &'a dyn CloudProvider,
        profile: &'a Profile,
        config: &'a ProvisionerConfig,
        schedules: Schedules,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            provider,
            profile,
            config,
            schedules,
            reporter,
        }
    }

    pub async fn provision(&self, request: &ClusterRequest) -> Result<ClusterDescription> {
        ClusterValidator::new(self.config)?.validate_create(request)?;
        let mut user_data = request.read_user_data()?;
        let plan = self.plan(request).await?;
        let names = &plan.names;
        info!("Provisioning cluster '{}'", names.cluster);

        let mut resources = Vec::with_capacity(7);

        let policy = self.create_policy(names).await?;
        resources.push(ChildResource::from(&policy));

        let role = self.create_role(names, &policy).await?;
        resources.push(ChildResource::from(&role));

        let instance_profile = self.create_instance_profile(names).await?;
        resources.push(ChildResource::from(&instance_profile));

        let security_group = self.create_security_group(names, request).await?;
        resources.push(ChildResource::from(&security_group));

        if let Some(location) = &plan.bootstrap {
            self.write_bootstrap(location, request).await?;
            user_data.push(bootstrap::download_script(location));
        }

        let mut security_groups = vec![security_group.id.clone()];
        security_groups.extend(plan.extra_security_groups.iter().cloned());
        let launch_configuration = self
            .create_launch_configuration(&plan, request, security_groups, &user_data)
            .await?;
        resources.push(ChildResource::from(&launch_configuration));

        let mut tags = vec![Tag::new(&self.config.ownership_tag_key, &names.cluster)];
        tags.extend(request.tags.iter().cloned());
        if let Some(location) = &plan.bootstrap {
            tags.push(Tag::new(BOOTSTRAP_TAG_KEY, location.path()));
        }
        let group = self.create_autoscaling_group(names, request, &tags).await?;
        resources.push(ChildResource::from(&group));

        self.reporter
            .heading(&format!("Creating cluster '{}'", names.cluster));
        let cluster = lifecycle::create_and_wait(
            self.provider.clusters(),
            self.profile,
            &names.cluster,
            &ClusterSpec {
                name: names.cluster.clone(),
            },
            self.schedules.visibility,
        )
        .await?;
        self.report_resource("cluster", &cluster)?;
        resources.push(ChildResource::from(&cluster));

        info!("Cluster '{}' is ready", names.cluster);
        Ok(ClusterDescription {
            name: names.cluster.clone(),
            resources,
            tags,
            bootstrap: plan.bootstrap,
        })
    }

    /// Lookups and existence checks. Nothing is mutated here.
    async fn plan(&self, request: &ClusterRequest) -> Result<Plan> {
        let image = match &request.image {
            Some(image) => image.clone(),
            None => self
                .config
                .image_for_region(self.profile.region())?
                .to_string(),
        };
        let instance_type = request
            .instance_type
            .clone()
            .unwrap_or_else(|| self.config.default_instance_type.clone());

        let names = ClusterNames::derive(&request.name);
        self.reporter
            .heading(&format!("Checking names for cluster '{}'", names.cluster));
        for (kind, name) in names.all() {
            if catalog::lookup(self.provider, self.profile, kind, name)
                .await?
                .is_some()
            {
                return Err(ProvisionError::already_exists(kind, name));
            }
        }

        let extra_security_groups = self.resolve_security_groups(&request.security_groups).await?;

        let bootstrap =
            bootstrap::derived_location(self.provider, self.profile, self.config, &names).await?;

        Ok(Plan {
            names,
            image,
            instance_type,
            extra_security_groups,
            bootstrap,
        })
    }

    /// Extra groups are given by name or id; the launch configuration wants ids.
    async fn resolve_security_groups(&self, groups: &[String]) -> Result<Vec<String>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let existing = catalog::list(self.provider, self.profile, ResourceKind::SecurityGroup).await?;
        groups
            .iter()
            .map(|group| {
                existing
                    .iter()
                    .find(|sg| &sg.id == group || &sg.name == group)
                    .map(|sg| sg.id.clone())
                    .ok_or_else(|| ProvisionError::does_not_exist(ResourceKind::SecurityGroup, group))
            })
            .collect()
    }

    async fn create_policy(&self, names: &ClusterNames) -> Result<Resource> {
        self.reporter
            .heading(&format!("Creating policy '{}'", names.policy));
        let policy = lifecycle::create_and_wait(
            self.provider.policies(),
            self.profile,
            &names.policy,
            &PolicySpec {
                name: names.policy.clone(),
                document: agent_policy_document(),
            },
            self.schedules.visibility,
        )
        .await?;
        self.report_resource("policy", &policy)?;
        Ok(policy)
    }

    async fn create_role(&self, names: &ClusterNames, policy: &Resource) -> Result<Resource> {
        let roles = self.provider.roles();
        let profile = self.profile;

        self.reporter.heading(&format!("Creating role '{}'", names.role));
        let role = lifecycle::create_and_wait(
            roles,
            profile,
            &names.role,
            &RoleSpec {
                name: names.role.clone(),
                trust_document: compute_trust_document(),
            },
            self.schedules.visibility,
        )
        .await?;
        self.report_resource("role", &role)?;

        self.reporter.message(&format!(
            "Attaching policy '{}' to role '{}'",
            policy.name, role.name
        ));
        let role_name = role.name.as_str();
        let policy_id = policy.id.as_str();
        let response = dispatch::mutate(
            ResourceKind::Role,
            role_name,
            roles.attach_policy(profile, role_name, policy_id),
        )
        .await?;
        self.reporter.data("response", &serde_json::to_value(&response)?);

        wait_for(
            self.schedules.visibility,
            &format!("policy '{}' on role '{}'", policy.name, role_name),
            move || async move {
                let attached = dispatch::query(
                    ResourceKind::Role,
                    role_name,
                    roles.attached_policies(profile, role_name),
                )
                .await?;
                Ok(attached.iter().any(|id| id == policy_id))
            },
        )
        .await?;
        Ok(role)
    }

    async fn create_instance_profile(&self, names: &ClusterNames) -> Result<Resource> {
        let instance_profiles = self.provider.instance_profiles();
        let profile = self.profile;

        self.reporter.heading(&format!(
            "Creating instance profile '{}'",
            names.instance_profile
        ));
        let instance_profile = lifecycle::create_and_wait(
            instance_profiles,
            profile,
            &names.instance_profile,
            &InstanceProfileSpec {
                name: names.instance_profile.clone(),
            },
            self.schedules.visibility,
        )
        .await?;
        self.report_resource("instance profile", &instance_profile)?;

        self.reporter.message(&format!(
            "Adding role '{}' to instance profile '{}'",
            names.role, names.instance_profile
        ));
        let profile_name = names.instance_profile.as_str();
        let role_name = names.role.as_str();
        let response = dispatch::mutate(
            ResourceKind::InstanceProfile,
            profile_name,
            instance_profiles.add_role(profile, profile_name, role_name),
        )
        .await?;
        self.reporter.data("response", &serde_json::to_value(&response)?);

        wait_for(
            self.schedules.visibility,
            &format!("role '{}' in instance profile '{}'", role_name, profile_name),
            move || async move {
                let roles = dispatch::query(
                    ResourceKind::InstanceProfile,
                    profile_name,
                    instance_profiles.roles(profile, profile_name),
                )
                .await?;
                Ok(roles.iter().any(|r| r == role_name))
            },
        )
        .await?;
        Ok(instance_profile)
    }

    async fn create_security_group(
        &self,
        names: &ClusterNames,
        request: &ClusterRequest,
    ) -> Result<Resource> {
        let security_groups = self.provider.security_groups();

        self.reporter.heading(&format!(
            "Creating security group '{}'",
            names.security_group
        ));
        let group = lifecycle::create_and_wait(
            security_groups,
            self.profile,
            &names.security_group,
            &SecurityGroupSpec {
                name: names.security_group.clone(),
                description: format!("Instances of cluster {}", names.cluster),
                network: request.network.clone(),
            },
            self.schedules.visibility,
        )
        .await?;
        self.report_resource("security group", &group)?;

        let ownership = [Tag::new(&self.config.ownership_tag_key, &names.cluster)];
        dispatch::mutate(
            ResourceKind::SecurityGroup,
            &group.name,
            security_groups.tag(self.profile, &group.id, &ownership),
        )
        .await?;
        Ok(group)
    }

    async fn write_bootstrap(
        &self,
        location: &BootstrapLocation,
        request: &ClusterRequest,
    ) -> Result<()> {
        let buckets = self.provider.buckets();
        let objects = self.provider.objects();

        if !guard::exists(buckets, self.profile, &location.bucket).await? {
            self.reporter
                .heading(&format!("Creating bucket '{}'", location.bucket));
            let bucket = lifecycle::create_and_wait(
                buckets,
                self.profile,
                &location.bucket,
                &BucketSpec {
                    name: location.bucket.clone(),
                    private: true,
                },
                self.schedules.visibility,
            )
            .await?;
            self.report_resource("bucket", &bucket)?;
        }

        let path = location.path();
        if lifecycle::delete_if_present(objects, self.profile, &path, self.schedules.visibility)
            .await?
        {
            debug!("Replaced a stale agent configuration at {}", path);
        }

        self.reporter
            .heading(&format!("Uploading agent configuration to '{}'", path));
        let object = lifecycle::create_and_wait(
            objects,
            self.profile,
            &path,
            &ObjectSpec {
                bucket: location.bucket.clone(),
                key: location.key.clone(),
                contents: bootstrap::agent_config(&request.name, &request.registry),
            },
            self.schedules.visibility,
        )
        .await?;
        self.report_resource("object", &object)?;
        Ok(())
    }

    async fn create_launch_configuration(
        &self,
        plan: &Plan,
        request: &ClusterRequest,
        security_groups: Vec<String>,
        user_data: &[UserDataPart],
    ) -> Result<Resource> {
        let names = &plan.names;
        self.reporter.heading(&format!(
            "Creating launch configuration '{}'",
            names.launch_configuration
        ));
        let spec = LaunchConfigurationSpec {
            name: names.launch_configuration.clone(),
            image: plan.image.clone(),
            instance_type: plan.instance_type.clone(),
            key_pair: request.key_pair.clone(),
            security_groups,
            instance_profile: Some(names.instance_profile.clone()),
            public_ip: request.public_ip,
            user_data: bootstrap::multipart_archive(user_data),
        };
        let launch_configuration = lifecycle::create_with_retry_and_wait(
            self.provider.launch_configurations(),
            self.profile,
            &names.launch_configuration,
            &spec,
            self.schedules.launch_configuration,
            self.schedules.visibility,
        )
        .await?;
        self.report_resource("launch configuration", &launch_configuration)?;
        Ok(launch_configuration)
    }

    async fn create_autoscaling_group(
        &self,
        names: &ClusterNames,
        request: &ClusterRequest,
        tags: &[Tag],
    ) -> Result<Resource> {
        let groups = self.provider.autoscaling_groups();

        self.reporter.heading(&format!(
            "Creating autoscaling group '{}'",
            names.autoscaling_group
        ));
        let group = lifecycle::create_and_wait(
            groups,
            self.profile,
            &names.autoscaling_group,
            &AutoScalingGroupSpec {
                name: names.autoscaling_group.clone(),
                launch_configuration: names.launch_configuration.clone(),
                min_size: request.min_size,
                max_size: request.max_size,
                desired_size: request.desired_size,
                zones: request.zones.clone(),
                subnets: request.subnets.clone(),
            },
            self.schedules.visibility,
        )
        .await?;
        self.report_resource("autoscaling group", &group)?;

        dispatch::mutate(
            ResourceKind::AutoScalingGroup,
            &group.name,
            groups.tag(self.profile, &group.name, tags),
        )
        .await?;
        Ok(group)
    }

    fn report_resource(&self, label: &str, resource: &Resource) -> Result<()> {
        self.reporter.data(label, &serde_json::to_value(resource)?);
        Ok(())
    }
}
