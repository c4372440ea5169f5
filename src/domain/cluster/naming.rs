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

use crate::domain::resource::ResourceKind;
use crate::infrastructure::constants::{
    BOOTSTRAP_BUCKET_PREFIX, BOOTSTRAP_OBJECT_NAME, SUFFIX_AUTOSCALING_GROUP,
    SUFFIX_INSTANCE_PROFILE, SUFFIX_LAUNCH_CONFIG, SUFFIX_POLICY, SUFFIX_ROLE,
    SUFFIX_SECURITY_GROUP,
};
use serde::Serialize;

/// Names of every child resource of a cluster, derived from its name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterNames {
    pub cluster: String,
    pub policy: String,
    pub role: String,
    pub instance_profile: String,
    pub security_group: String,
    pub launch_configuration: String,
    pub autoscaling_group: String,
}

impl ClusterNames {
    pub fn derive(name: &str) -> Self {
        Self {
            cluster: name.to_string(),
            policy: format!("{}{}", name, SUFFIX_POLICY),
            role: format!("{}{}", name, SUFFIX_ROLE),
            instance_profile: format!("{}{}", name, SUFFIX_INSTANCE_PROFILE),
            security_group: format!("{}{}", name, SUFFIX_SECURITY_GROUP),
            launch_configuration: format!("{}{}", name, SUFFIX_LAUNCH_CONFIG),
            autoscaling_group: format!("{}{}", name, SUFFIX_AUTOSCALING_GROUP),
        }
    }

    /// Every derived name, in the order existence is checked before a create.
    pub fn all(&self) -> [(ResourceKind, &str); 7] {
        [
            (ResourceKind::Cluster, self.cluster.as_str()),
            (
                ResourceKind::LaunchConfiguration,
                self.launch_configuration.as_str(),
            ),
            (ResourceKind::AutoScalingGroup, self.autoscaling_group.as_str()),
            (ResourceKind::SecurityGroup, self.security_group.as_str()),
            (ResourceKind::InstanceProfile, self.instance_profile.as_str()),
            (ResourceKind::Role, self.role.as_str()),
            (ResourceKind::Policy, self.policy.as_str()),
        ]
    }

    /// Key of the agent configuration object inside the bootstrap bucket.
    pub fn bootstrap_key(&self) -> String {
        format!("{}/{}", self.cluster, BOOTSTRAP_OBJECT_NAME)
    }
}

/// Per-account, per-region bucket holding agent configurations.
pub fn bootstrap_bucket(region: &str, account_id: &str) -> String {
    format!("{}--{}--{}", BOOTSTRAP_BUCKET_PREFIX, region, account_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_pure_suffixing() {
        let names = ClusterNames::derive("demo");
        assert_eq!(names.cluster, "demo");
        assert_eq!(names.policy, "demo--policy");
        assert_eq!(names.role, "demo--role");
        assert_eq!(names.instance_profile, "demo--instance-profile");
        assert_eq!(names.security_group, "demo--security-group");
        assert_eq!(names.launch_configuration, "demo--launch-config");
        assert_eq!(names.autoscaling_group, "demo--autoscaling-group");
        assert_eq!(names, ClusterNames::derive("demo"));
    }

    #[test]
    fn test_all_covers_seven_kinds() {
        let names = ClusterNames::derive("demo");
        let all = names.all();
        let mut kinds: Vec<ResourceKind> = all.iter().map(|(kind, _)| *kind).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 7);
        assert_eq!(all[0], (ResourceKind::Cluster, "demo"));
    }

    #[test]
    fn test_bootstrap_location() {
        let names = ClusterNames::derive("demo");
        assert_eq!(names.bootstrap_key(), "demo/ecs.config");
        assert_eq!(
            bootstrap_bucket("us-east-1", "123456789012"),
            "ecs-clusters--us-east-1--123456789012"
        );
    }
}
