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

pub mod adapter;
pub mod dispatch;
pub mod sandbox;
pub mod specs;

pub use adapter::{
    AccountIdentity, AutoScalingGroupAdapter, CloudProvider, ClusterAdapter, FaultResult,
    InstanceAdapter, InstanceProfileAdapter, InstanceState, InstanceStatus, Profile,
    ProviderResponse, ResourceAdapter, RoleAdapter, SecurityGroupAdapter, ServiceSummary,
};
pub use sandbox::{Call, SandboxOptions, SandboxProvider, Verb};
pub use specs::*;
