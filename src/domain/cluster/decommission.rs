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

//! Cluster teardown in reverse dependency order. Every child step tolerates
//! a child that is already gone.

use crate::domain::cluster::bootstrap::{self, BootstrapLocation};
use crate::domain::cluster::naming::ClusterNames;
use crate::domain::cluster::validator::ClusterValidator;
use crate::domain::config::{ProvisionerConfig, Schedules};
use crate::domain::jobs::{catalog, guard, lifecycle, wait_for};
use crate::domain::report::Reporter;
use crate::domain::resource::{Resource, ResourceKind};
use crate::infrastructure::constants::BOOTSTRAP_TAG_KEY;
use crate::infrastructure::provider::dispatch;
use crate::infrastructure::provider::{CloudProvider, Profile};
use crate::shared::error::Result;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of one teardown step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub kind: ResourceKind,
    pub name: String,
    /// False when the resource was already gone.
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownSummary {
    pub cluster: String,
    pub removals: Vec<Removal>,
    /// Instances of the autoscaling group that were waited on.
    pub terminated_instances: Vec<String>,
}

impl TeardownSummary {
    pub fn deleted(&self) -> impl Iterator<Item = &Removal> {
        self.removals.iter().filter(|r| r.deleted)
    }

    fn record(&mut self, kind: ResourceKind, name: &str, deleted: bool) {
        self.removals.push(Removal {
            kind,
            name: name.to_string(),
            deleted,
        });
    }
}

pub struct Decommissioner<'a> {
    provider: &'a dyn CloudProvider,
    profile: &'a Profile,
    config: &'a ProvisionerConfig,
    schedules: Schedules,
    reporter: &'a dyn Reporter,
}

impl<'a> Decommissioner<'a> {
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

    pub async fn decommission(&self, name: &str) -> Result<TeardownSummary> {
        ClusterValidator::new(self.config)?.validate_name(name)?;
        let names = ClusterNames::derive(name);

        let cluster = guard::guard_delete(self.provider.clusters(), self.profile, &names.cluster)
            .await?;
        info!("Decommissioning cluster '{}'", names.cluster);

        let mut summary = TeardownSummary {
            cluster: names.cluster.clone(),
            ..TeardownSummary::default()
        };

        self.remove_services(&names, &mut summary).await?;
        let bootstrap = match self.remove_autoscaling_group(&names, &mut summary).await? {
            Some(location) => Some(location),
            None => {
                bootstrap::derived_location(self.provider, self.profile, self.config, &names)
                    .await?
            }
        };

        self.reporter.heading(&format!(
            "Deleting launch configuration '{}'",
            names.launch_configuration
        ));
        let deleted = lifecycle::delete_if_present(
            self.provider.launch_configurations(),
            self.profile,
            &names.launch_configuration,
            self.schedules.visibility,
        )
        .await?;
        self.note(&mut summary, ResourceKind::LaunchConfiguration, &names.launch_configuration, deleted);

        if let Some(location) = bootstrap {
            let path = location.path();
            self.reporter
                .heading(&format!("Deleting agent configuration '{}'", path));
            let deleted = lifecycle::delete_if_present(
                self.provider.objects(),
                self.profile,
                &path,
                self.schedules.visibility,
            )
            .await?;
            self.note(&mut summary, ResourceKind::Object, &path, deleted);
        }

        self.remove_security_group(&names, &mut summary).await?;
        self.remove_instance_profile(&names, &mut summary).await?;
        self.remove_role(&names, &mut summary).await?;

        self.reporter
            .heading(&format!("Deleting policy '{}'", names.policy));
        let deleted = lifecycle::delete_if_present(
            self.provider.policies(),
            self.profile,
            &names.policy,
            self.schedules.visibility,
        )
        .await?;
        self.note(&mut summary, ResourceKind::Policy, &names.policy, deleted);

        self.reporter
            .heading(&format!("Deleting cluster '{}'", names.cluster));
        let deleted = lifecycle::delete_reference(
            self.provider.clusters(),
            self.profile,
            &cluster,
            None,
            self.schedules.visibility,
        )
        .await?;
        self.note(&mut summary, ResourceKind::Cluster, &names.cluster, deleted);

        info!("Cluster '{}' is gone", names.cluster);
        Ok(summary)
    }

    fn note(&self, summary: &mut TeardownSummary, kind: ResourceKind, name: &str, deleted: bool) {
        if !deleted {
            self.reporter
                .message(&format!("No {} '{}', skipping", kind, name));
        }
        summary.record(kind, name, deleted);
    }

    /// Scale every service to zero, delete it and wait until it is gone.
    async fn remove_services(&self, names: &ClusterNames, summary: &mut TeardownSummary) -> Result<()> {
        let clusters = self.provider.clusters();
        let profile = self.profile;
        let cluster = names.cluster.as_str();

        let services = dispatch::query(
            ResourceKind::Service,
            cluster,
            clusters.services(profile, cluster),
        )
        .await?;

        for service in services {
            let service_name = service.name.as_str();
            self.reporter
                .heading(&format!("Stopping service '{}'", service_name));
            if service.desired_count > 0 {
                dispatch::mutate(
                    ResourceKind::Service,
                    service_name,
                    clusters.scale_service(profile, cluster, service_name, 0),
                )
                .await?;
            }
            dispatch::mutate(
                ResourceKind::Service,
                service_name,
                clusters.delete_service(profile, cluster, service_name),
            )
            .await?;

            wait_for(
                self.schedules.visibility,
                &format!("service '{}' to disappear", service_name),
                move || async move {
                    let remaining = dispatch::query(
                        ResourceKind::Service,
                        service_name,
                        clusters.services(profile, cluster),
                    )
                    .await?;
                    Ok(!remaining.iter().any(|s| s.name == service_name))
                },
            )
            .await?;
            summary.record(ResourceKind::Service, service_name, true);
        }
        Ok(())
    }

    /// Delete the group and wait for its instances to terminate. Returns the
    /// bootstrap location recorded on the group, if any.
    async fn remove_autoscaling_group(
        &self,
        names: &ClusterNames,
        summary: &mut TeardownSummary,
    ) -> Result<Option<BootstrapLocation>> {
        let groups = self.provider.autoscaling_groups();
        let group_name = names.autoscaling_group.as_str();

        self.reporter
            .heading(&format!("Deleting autoscaling group '{}'", group_name));
        let Some(group) = guard::lookup(groups, self.profile, group_name).await? else {
            self.note(summary, ResourceKind::AutoScalingGroup, group_name, false);
            return Ok(None);
        };

        let bootstrap = group.tag(BOOTSTRAP_TAG_KEY).and_then(BootstrapLocation::parse);
        let instances = match dispatch::query(
            ResourceKind::AutoScalingGroup,
            group_name,
            groups.instances(self.profile, group_name),
        )
        .await
        {
            Ok(instances) => instances,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };
        debug!("Group '{}' has instances {:?}", group_name, instances);

        let deleted = lifecycle::delete_reference(
            groups,
            self.profile,
            &group.reference(),
            None,
            self.schedules.visibility,
        )
        .await?;
        self.note(summary, ResourceKind::AutoScalingGroup, group_name, deleted);

        self.wait_for_termination(group_name, &instances).await?;
        summary.terminated_instances = instances;
        Ok(bootstrap)
    }

    async fn wait_for_termination(&self, group: &str, instances: &[String]) -> Result<()> {
        if instances.is_empty() {
            return Ok(());
        }
        let adapter = self.provider.instances();
        let profile = self.profile;

        self.reporter.message(&format!(
            "Waiting for {} instance(s) of '{}' to terminate",
            instances.len(),
            group
        ));
        wait_for(
            self.schedules.instance_termination,
            &format!("instances of '{}' to terminate", group),
            move || async move {
                let statuses = dispatch::query(
                    ResourceKind::Instance,
                    group,
                    adapter.describe(profile, instances),
                )
                .await?;
                Ok(statuses.iter().all(|status| status.state.is_terminal()))
            },
        )
        .await
    }

    /// The derived name first, then the ownership tag.
    async fn find_security_group(&self, names: &ClusterNames) -> Result<Option<Resource>> {
        if let Some(group) =
            guard::lookup(self.provider.security_groups(), self.profile, &names.security_group)
                .await?
        {
            return Ok(Some(group));
        }
        let groups = catalog::list(self.provider, self.profile, ResourceKind::SecurityGroup).await?;
        Ok(groups
            .into_iter()
            .find(|g| g.tag(&self.config.ownership_tag_key) == Some(names.cluster.as_str())))
    }

    async fn remove_security_group(
        &self,
        names: &ClusterNames,
        summary: &mut TeardownSummary,
    ) -> Result<()> {
        self.reporter.heading(&format!(
            "Deleting security group '{}'",
            names.security_group
        ));
        let Some(group) = self.find_security_group(names).await? else {
            self.note(summary, ResourceKind::SecurityGroup, &names.security_group, false);
            return Ok(());
        };
        let deleted = lifecycle::delete_reference(
            self.provider.security_groups(),
            self.profile,
            &group.reference(),
            Some(self.schedules.security_group_delete),
            self.schedules.visibility,
        )
        .await?;
        self.note(summary, ResourceKind::SecurityGroup, &group.name, deleted);
        Ok(())
    }

    async fn remove_instance_profile(
        &self,
        names: &ClusterNames,
        summary: &mut TeardownSummary,
    ) -> Result<()> {
        let instance_profiles = self.provider.instance_profiles();
        let name = names.instance_profile.as_str();

        self.reporter
            .heading(&format!("Deleting instance profile '{}'", name));
        let Some(instance_profile) = guard::lookup(instance_profiles, self.profile, name).await?
        else {
            self.note(summary, ResourceKind::InstanceProfile, name, false);
            return Ok(());
        };

        // A profile deleted moments ago is still listed but no longer describable.
        let roles = match dispatch::query(
            ResourceKind::InstanceProfile,
            name,
            instance_profiles.roles(self.profile, name),
        )
        .await
        {
            Ok(roles) => roles,
            Err(err) if err.is_not_found() => {
                self.note(summary, ResourceKind::InstanceProfile, name, false);
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        for role in &roles {
            self.reporter.message(&format!(
                "Removing role '{}' from instance profile '{}'",
                role, name
            ));
            match dispatch::mutate(
                ResourceKind::InstanceProfile,
                name,
                instance_profiles.remove_role(self.profile, name, role),
            )
            .await
            {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    debug!("Role '{}' already removed from '{}'", role, name)
                }
                Err(err) => return Err(err),
            }
        }

        let deleted = lifecycle::delete_reference(
            instance_profiles,
            self.profile,
            &instance_profile.reference(),
            None,
            self.schedules.visibility,
        )
        .await?;
        self.note(summary, ResourceKind::InstanceProfile, name, deleted);
        Ok(())
    }

    async fn remove_role(&self, names: &ClusterNames, summary: &mut TeardownSummary) -> Result<()> {
        let roles = self.provider.roles();
        let name = names.role.as_str();

        self.reporter.heading(&format!("Deleting role '{}'", name));
        let Some(role) = guard::lookup(roles, self.profile, name).await? else {
            self.note(summary, ResourceKind::Role, name, false);
            return Ok(());
        };

        let attached = match dispatch::query(
            ResourceKind::Role,
            name,
            roles.attached_policies(self.profile, name),
        )
        .await
        {
            Ok(attached) => attached,
            Err(err) if err.is_not_found() => {
                self.note(summary, ResourceKind::Role, name, false);
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        for policy_id in &attached {
            self.reporter
                .message(&format!("Detaching policy '{}' from role '{}'", policy_id, name));
            match dispatch::mutate(
                ResourceKind::Role,
                name,
                roles.detach_policy(self.profile, name, policy_id),
            )
            .await
            {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    debug!("Policy '{}' already detached from '{}'", policy_id, name)
                }
                Err(err) => return Err(err),
            }
        }

        let deleted = lifecycle::delete_reference(
            roles,
            self.profile,
            &role.reference(),
            None,
            self.schedules.visibility,
        )
        .await?;
        self.note(summary, ResourceKind::Role, name, deleted);
        Ok(())
    }
}
