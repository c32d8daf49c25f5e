// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cache Stack Domain Models
//!
//! Value objects and resource descriptions for a cache cluster reachable
//! only through a bastion host, with validation invariants enforced at
//! construction time.
//!
//! # Value Objects with Invariants
//!
//! - [`NetworkId`], [`SubnetId`], [`LogicalId`], [`StackName`], [`AccountId`], [`Region`]
//! - [`Cidr`] - IPv4/IPv6 block with mandatory prefix
//! - [`Port`] - non-zero port number
//! - [`EngineVersion`], [`NodeType`], [`CacheEngine`]
//!
//! # Resources
//!
//! Listed leaf to root, each consuming only what precedes it:
//!
//! - [`NetworkRef`] - existing network, looked up and borrowed
//! - [`SecurityPolicy`] - cache and bastion groups plus their ingress rules
//! - [`SubnetGroup`] - subnets the cache may be placed into
//! - [`CacheCluster`], [`BastionHost`]
//! - [`StackOutput`] - exports projected from resolved attributes

pub mod bastion;
pub mod cache_cluster;
pub mod identifiers;
pub mod invariants;
pub mod naming;
pub mod network;
pub mod outputs;
pub mod security_group;
pub mod subnet_group;

pub use bastion::BastionHost;
pub use cache_cluster::{CacheCluster, CacheEngine, CacheSettings, EngineVersion, NodeType};
pub use identifiers::{AccountId, LogicalId, NetworkId, Region, StackName, SubnetId};
pub use invariants::{ValidationError, ValidationResult};
pub use network::{Cidr, NetworkRef, Port, Protocol, Subnet, SubnetType};
pub use outputs::{
    emit_outputs, standard_bindings, Attribute, OutputBinding, OutputKey, ResolvedAttributes,
    StackOutput,
};
pub use security_group::{
    Bastion, Cache, GroupKind, GroupRole, IngressRule, Peer, SecurityGroup, SecurityGroupRef,
    SecurityGroupSpec, SecurityPolicy,
};
pub use subnet_group::{SubnetGroup, SubnetGroupRef, SubnetSelection};
