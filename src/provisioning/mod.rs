// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Engine Seam
//!
//! The core never talks to a cloud. Everything that blocks on network I/O
//! (network lookup, resource create/update/delete, attribute resolution) is
//! delegated to a [`ProvisioningEngine`]. Retries and timeouts belong to the
//! engine too.
//!
//! # Architecture
//!
//! ```text
//! StackConfig ──▶ StackProvisioner ──lookup_network──▶ ProvisioningEngine
//!                      │                                   │
//!                ResourceGraph ──diff──▶ StackDiff ──apply──┤
//!                      │                                   │
//!                 emit_outputs ◀──── ResolvedAttributes ◀───┘
//! ```
//!
//! # Implementations
//!
//! - [`InMemoryProvisioningEngine`]: deterministic fake cloud for tests and dry runs
//! - [`NatsProvisioningEngine`]: request/reply to a remote engine over NATS
//!
//! # Example
//!
//! ```rust
//! use cim_cache_stack::config::StackConfig;
//! use cim_cache_stack::domain::OutputKey;
//! use cim_cache_stack::provisioning::{InMemoryProvisioningEngine, StackProvisioner};
//!
//! # tokio_test::block_on(async {
//! let config = StackConfig::default();
//! let engine = InMemoryProvisioningEngine::with_reference_network(&config);
//! let mut provisioner = StackProvisioner::new(config, engine);
//!
//! let report = provisioner.deploy().await.unwrap();
//! assert_eq!(report.outputs.len(), 4);
//! assert_eq!(report.outputs[1].key, OutputKey::RedisPort);
//! assert_eq!(report.outputs[1].value, "6379");
//! # });
//! ```

use async_trait::async_trait;

use crate::domain::{NetworkId, NetworkRef, ResolvedAttributes, StackName};
use crate::errors::StackResult;
use crate::graph::{ResourceGraph, StackDiff};

pub mod memory;
pub mod nats;
pub mod provisioner;

pub use memory::InMemoryProvisioningEngine;
pub use nats::{
    NatsProvisioningEngine, ProvisioningCommand, ProvisioningReply, ProvisioningRequest,
    ProvisioningResponder,
};
pub use provisioner::{DeploymentReport, StackProvisioner, StackStatus};

/// External engine that turns a desired-state graph into real resources
///
/// Implementations must apply changes in the order the diff lists them and
/// never report attributes for a resource that has been deleted.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Resolve an existing network and its subnets
    ///
    /// # Errors
    /// - `NotFound` if no network has this id
    async fn lookup_network(&self, id: &NetworkId) -> StackResult<NetworkRef>;

    /// Apply the actionable changes of `diff` to reach `graph`
    ///
    /// # Returns
    ///
    /// Attributes of every resource in `graph` after the apply
    ///
    /// # Errors
    /// - `Apply` naming the resource that failed
    async fn apply(&self, graph: &ResourceGraph, diff: &StackDiff)
        -> StackResult<ResolvedAttributes>;

    /// Tear down every resource of a stack
    ///
    /// # Errors
    /// - `Destroy` if the engine could not remove the stack
    async fn destroy(&self, stack: &StackName) -> StackResult<()>;

    /// Engine name for logs
    fn name(&self) -> &str;
}
