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

/// Child name suffixes
pub const SUFFIX_POLICY: &str = "--policy";
pub const SUFFIX_ROLE: &str = "--role";
pub const SUFFIX_INSTANCE_PROFILE: &str = "--instance-profile";
pub const SUFFIX_SECURITY_GROUP: &str = "--security-group";
pub const SUFFIX_LAUNCH_CONFIG: &str = "--launch-config";
pub const SUFFIX_AUTOSCALING_GROUP: &str = "--autoscaling-group";

/// Cluster name limits
pub const CLUSTER_NAME_PATTERN: &str = r"^[A-Za-z0-9_-]+$";
pub const CLUSTER_NAME_MAX_LEN: usize = 58;

/// Tags
pub const OWNERSHIP_TAG_KEY: &str = "ECS Cluster";
pub const BOOTSTRAP_TAG_KEY: &str = "ECS Config";

/// Bootstrap object storage
pub const BOOTSTRAP_BUCKET_PREFIX: &str = "ecs-clusters";
pub const BOOTSTRAP_OBJECT_NAME: &str = "ecs.config";
pub const AGENT_CONFIG_PATH: &str = "/etc/ecs/ecs.config";
pub const DEFAULT_REGISTRY_URL: &str = "https://index.docker.io/v1/";

/// Launch defaults
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PROFILE: &str = "default";

/// Container-optimized machine images per region
pub const DEFAULT_IMAGES: [(&str, &str); 8] = [
    ("us-east-1", "ami-43043329"),
    ("us-west-1", "ami-a77b0ac7"),
    ("us-west-2", "ami-02a24162"),
    ("eu-west-1", "ami-76e95b05"),
    ("eu-central-1", "ami-96b6adfa"),
    ("ap-northeast-1", "ami-18d8de76"),
    ("ap-southeast-1", "ami-9f60aefc"),
    ("ap-southeast-2", "ami-75a38416"),
];

/// Permissions granted to cluster instances
pub const AGENT_POLICY_ACTIONS: [&str; 6] = [
    "ec2:Describe*",
    "elasticloadbalancing:*",
    "ecs:*",
    "iam:ListInstanceProfiles",
    "iam:ListRoles",
    "iam:PassRole",
];
pub const COMPUTE_SERVICE_PRINCIPAL: &str = "ec2.amazonaws.com";
pub const POLICY_DOCUMENT_VERSION: &str = "2012-10-17";

/// Polling schedules (attempts, seconds between attempts)
pub const VISIBILITY_MAX_ATTEMPTS: u32 = 10;
pub const VISIBILITY_INTERVAL_SECS: u64 = 1;
pub const LAUNCH_CONFIG_MAX_ATTEMPTS: u32 = 10;
pub const LAUNCH_CONFIG_INTERVAL_SECS: u64 = 1;
pub const INSTANCE_TERMINATION_MAX_ATTEMPTS: u32 = 15;
pub const INSTANCE_TERMINATION_INTERVAL_SECS: u64 = 15;
pub const SECURITY_GROUP_DELETE_MAX_ATTEMPTS: u32 = 25;
pub const SECURITY_GROUP_DELETE_INTERVAL_SECS: u64 = 5;

/// Sandbox provider
pub const SANDBOX_PROVIDER_NAME: &str = "sandbox";
pub const SANDBOX_ACCOUNT_ID: &str = "123456789012";
pub const DEFAULT_STATE_FILE: &str = ".armada/sandbox.json";
