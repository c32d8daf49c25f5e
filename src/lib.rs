// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cache Stack for the Composable Information Machine
//!
//! Declarative description of a single-node cache cluster that is reachable
//! only through a bastion host, inside an existing network:
//!
//! ```text
//! NetworkRef → SecurityPolicy → SubnetGroup → {CacheCluster, BastionHost} → StackOutputs
//! ```
//!
//! Building the graph is pure and fails fast on any invariant violation.
//! Everything that touches a cloud goes through a
//! [`ProvisioningEngine`](provisioning::ProvisioningEngine).

pub mod config;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod nats;
pub mod provisioning;
pub mod state_machine;

// Re-export commonly used types
pub use config::{Environment, StackConfig, StackVariant};
pub use errors::{DependencyError, StackError, StackResult};
pub use graph::{ResourceChange, ResourceGraph, ResourceNode, StackDiff};
pub use nats::{NatsClient, NatsConfig};
pub use provisioning::{
    DeploymentReport, InMemoryProvisioningEngine, NatsProvisioningEngine, ProvisioningEngine,
    StackProvisioner,
};
