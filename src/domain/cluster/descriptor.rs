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

use crate::domain::cluster::decommission::{Decommissioner, TeardownSummary};
use crate::domain::cluster::naming::ClusterNames;
use crate::domain::cluster::provision::{ClusterDescription, Provisioner};
use crate::domain::cluster::request::ClusterRequest;
use crate::domain::cluster::validator::ClusterValidator;
use crate::domain::config::{ProvisionerConfig, Schedules};
use crate::domain::jobs::{catalog, guard};
use crate::domain::report::{NullReporter, Reporter};
use crate::domain::resource::{ExistenceState, ResourceKind};
use crate::infrastructure::provider::dispatch;
use crate::infrastructure::provider::{CloudProvider, Profile, ServiceSummary};
use crate::shared::error::{ProvisionError, Result};
use serde::Serialize;
use std::sync::Arc;

/// Entry point for cluster jobs against one provider and profile.
pub struct ClusterDescriptor {
    provider: Arc<dyn CloudProvider>,
    profile: Profile,
    config: ProvisionerConfig,
    schedules: Schedules,
    reporter: Arc<dyn Reporter>,
}

impl ClusterDescriptor {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        profile: Profile,
        config: ProvisionerConfig,
    ) -> Result<Self> {
        let schedules = config.schedules()?;
        Ok(Self {
            provider,
            profile,
            config,
            schedules,
            reporter: Arc::new(NullReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn provider(&self) -> &dyn CloudProvider {
        self.provider.as_ref()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn schedules(&self) -> Schedules {
        self.schedules
    }

    pub async fn create_cluster(&self, request: &ClusterRequest) -> Result<ClusterDescription> {
        Provisioner::new(
            self.provider.as_ref(),
            &self.profile,
            &self.config,
            self.schedules,
            self.reporter.as_ref(),
        )
        .provision(request)
        .await
    }

    pub async fn delete_cluster(&self, name: &str) -> Result<TeardownSummary> {
        Decommissioner::new(
            self.provider.as_ref(),
            &self.profile,
            &self.config,
            self.schedules,
            self.reporter.as_ref(),
        )
        .decommission(name)
        .await
    }

    /// Every active cluster, with its instance and service counts.
    pub async fn list_clusters(&self) -> Result<Vec<ClusterSummary>> {
        let clusters =
            catalog::list(self.provider.as_ref(), &self.profile, ResourceKind::Cluster).await?;

        let mut summaries = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let names = ClusterNames::derive(&cluster.name);
            let instances = self.member_instances(&names).await?.map_or(0, |i| i.len());
            let services = self.services(&names.cluster).await?.len();
            summaries.push(ClusterSummary {
                name: cluster.name,
                id: cluster.id,
                instances,
                services,
            });
        }
        Ok(summaries)
    }

    /// Existence of every derived child. `ResourceDoesNotExist` when none of
    /// them exists.
    pub async fn get_cluster_status(&self, name: &str) -> Result<ClusterStatus> {
        ClusterValidator::new(&self.config)?.validate_name(name)?;
        let names = ClusterNames::derive(name);

        let mut children = Vec::with_capacity(7);
        for (kind, child) in names.all() {
            let found = catalog::lookup(self.provider.as_ref(), &self.profile, kind, child).await?;
            children.push(ChildStatus {
                kind,
                name: child.to_string(),
                id: found.as_ref().map(|r| r.id.clone()),
                state: found.map_or(ExistenceState::Absent, |r| r.state),
            });
        }
        if children.iter().all(|c| c.state == ExistenceState::Absent) {
            return Err(ProvisionError::does_not_exist(ResourceKind::Cluster, name));
        }

        let cluster_active = children
            .iter()
            .any(|c| c.kind == ResourceKind::Cluster && c.state != ExistenceState::Absent);
        let services = if cluster_active {
            self.services(&names.cluster).await?
        } else {
            Vec::new()
        };
        let instances = self.member_instances(&names).await?.unwrap_or_default();

        Ok(ClusterStatus {
            name: names.cluster,
            children,
            instances,
            services,
        })
    }

    /// Attach a load balancer to the cluster's autoscaling group.
    pub async fn serve(&self, name: &str, load_balancer: &str) -> Result<()> {
        let group = self.group_and_load_balancer(name, load_balancer).await?;
        self.reporter.heading(&format!(
            "Attaching load balancer '{}' to '{}'",
            load_balancer, group
        ));
        let response = dispatch::mutate(
            ResourceKind::AutoScalingGroup,
            &group,
            self.provider
                .autoscaling_groups()
                .attach_load_balancer(&self.profile, &group, load_balancer),
        )
        .await?;
        self.reporter.data("response", &serde_json::to_value(&response)?);
        Ok(())
    }

    pub async fn unserve(&self, name: &str, load_balancer: &str) -> Result<()> {
        let group = self.group_and_load_balancer(name, load_balancer).await?;
        self.reporter.heading(&format!(
            "Detaching load balancer '{}' from '{}'",
            load_balancer, group
        ));
        let response = dispatch::mutate(
            ResourceKind::AutoScalingGroup,
            &group,
            self.provider
                .autoscaling_groups()
                .detach_load_balancer(&self.profile, &group, load_balancer),
        )
        .await?;
        self.reporter.data("response", &serde_json::to_value(&response)?);
        Ok(())
    }

    async fn group_and_load_balancer(&self, name: &str, load_balancer: &str) -> Result<String> {
        ClusterValidator::new(&self.config)?.validate_name(name)?;
        let names = ClusterNames::derive(name);
        guard::guard_delete(
            self.provider.autoscaling_groups(),
            &self.profile,
            &names.autoscaling_group,
        )
        .await?;
        guard::guard_delete(self.provider.load_balancers(), &self.profile, load_balancer).await?;
        Ok(names.autoscaling_group)
    }

    async fn member_instances(&self, names: &ClusterNames) -> Result<Option<Vec<String>>> {
        let group = names.autoscaling_group.as_str();
        let groups = self.provider.autoscaling_groups();
        if !guard::exists(groups, &self.profile, group).await? {
            return Ok(None);
        }
        match dispatch::query(
            ResourceKind::AutoScalingGroup,
            group,
            groups.instances(&self.profile, group),
        )
        .await
        {
            Ok(instances) => Ok(Some(instances)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn services(&self, cluster: &str) -> Result<Vec<ServiceSummary>> {
        match dispatch::query(
            ResourceKind::Service,
            cluster,
            self.provider.clusters().services(&self.profile, cluster),
        )
        .await
        {
            Ok(services) => Ok(services),
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub name: String,
    pub id: String,
    pub instances: usize,
    pub services: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildStatus {
    pub kind: ResourceKind,
    pub name: String,
    pub id: Option<String>,
    pub state: ExistenceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterStatus {
    pub name: String,
    pub children: Vec<ChildStatus>,
    pub instances: Vec<String>,
    pub services: Vec<ServiceSummary>,
}

impl ClusterStatus {
    /// True when every derived child exists.
    pub fn is_complete(&self) -> bool {
        self.children
            .iter()
            .all(|c| c.state == ExistenceState::Active)
    }
}
