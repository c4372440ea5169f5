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


//! Cluster jobs

pub mod bootstrap;
pub mod decommission;
pub mod descriptor;
pub mod naming;
pub mod provision;
pub mod request;
pub mod validator;

pub use self::bootstrap::BootstrapLocation;
pub use self::decommission::{Decommissioner, Removal, TeardownSummary};
pub use self::descriptor::{ChildStatus, ClusterDescriptor, ClusterStatus, ClusterSummary};
pub use self::naming::ClusterNames;
pub use self::provision::{ChildResource, ClusterDescription, Provisioner};
pub use self::request::{ClusterRequest, RegistryCredentials, UserDataFile, UserDataPart};
pub use self::validator::ClusterValidator;
