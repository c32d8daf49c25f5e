// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Groups and the Cache Access Policy
//!
//! Two groups exist in a cache stack: one guarding the cache cluster and one
//! guarding the bastion host. The role is a type parameter of
//! [`SecurityGroup`], so a group built for one role cannot be passed where the
//! other is expected. Once a group is placed in the desired-state graph it is
//! erased to a [`SecurityGroupSpec`] that still records its [`GroupKind`].
//!
//! # Access Policy
//!
//! ```text
//! 0.0.0.0/0 ──tcp/22──▶ BastionSG ──tcp/6379──▶ RedisSG
//! ```
//!
//! The cache group only ever admits traffic from the bastion group. Adding a
//! CIDR source to it fails with
//! [`ValidationError::PolicyViolation`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

use super::identifiers::{LogicalId, NetworkId};
use super::invariants::{self, ValidationError, ValidationResult};
use super::naming;
use super::network::{Cidr, NetworkRef, Port, Protocol};

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Cache {}
    impl Sealed for super::Bastion {}
}

/// Runtime tag of a security group's role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Cache,
    Bastion,
}

impl GroupKind {
    /// Egress policy the role must carry
    pub fn allow_all_outbound(self) -> bool {
        matches!(self, GroupKind::Bastion)
    }

    /// Whether the role may admit CIDR sources
    pub fn admits_cidr_peers(self) -> bool {
        matches!(self, GroupKind::Bastion)
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Cache => write!(f, "cache"),
            GroupKind::Bastion => write!(f, "bastion"),
        }
    }
}

/// Compile-time role of a [`SecurityGroup`]
pub trait GroupRole: sealed::Sealed + fmt::Debug + Clone + Copy + PartialEq + Eq + Default {
    const KIND: GroupKind;
}

/// Role marker for the cache-facing group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cache;

/// Role marker for the bastion-facing group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bastion;

impl GroupRole for Cache {
    const KIND: GroupKind = GroupKind::Cache;
}

impl GroupRole for Bastion {
    const KIND: GroupKind = GroupKind::Bastion;
}

/// Typed reference from one graph node to a security group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecurityGroupRef {
    pub logical_id: LogicalId,
    pub network: NetworkId,
    pub kind: GroupKind,
}

/// Source of an ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Peer {
    /// Address block
    Cidr { cidr: Cidr },
    /// Another security group in the same network
    SecurityGroup { group: SecurityGroupRef },
}

impl Peer {
    /// Any IPv4 source
    pub fn any_ipv4() -> Self {
        Peer::Cidr {
            cidr: Cidr::any_ipv4(),
        }
    }

    /// Members of `group`
    pub fn group<R: GroupRole>(group: &SecurityGroup<R>) -> Self {
        Peer::SecurityGroup {
            group: group.reference(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Cidr { cidr } => write!(f, "{}", cidr),
            Peer::SecurityGroup { group } => write!(f, "{}", group.logical_id),
        }
    }
}

/// Inbound permission on a security group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: Port,
    pub protocol: Protocol,
    pub description: String,
}

impl IngressRule {
    pub fn tcp(peer: Peer, port: Port, description: impl Into<String>) -> Self {
        Self {
            peer,
            port,
            protocol: Protocol::Tcp,
            description: description.into(),
        }
    }

    /// Same source, port and protocol, ignoring the description
    pub fn grants_same_access(&self, other: &IngressRule) -> bool {
        self.peer == other.peer && self.port == other.port && self.protocol == other.protocol
    }
}

/// Desired state of a security group as stored in the resource graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupSpec {
    pub logical_id: LogicalId,
    pub description: String,
    pub network: NetworkId,
    pub kind: GroupKind,
    pub allow_all_outbound: bool,
    pub ingress_rules: Vec<IngressRule>,
}

impl SecurityGroupSpec {
    pub fn reference(&self) -> SecurityGroupRef {
        SecurityGroupRef {
            logical_id: self.logical_id.clone(),
            network: self.network.clone(),
            kind: self.kind,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        invariants::validate_security_group(self)
    }

    /// Logical ids of the groups this one admits traffic from
    pub fn referenced_groups(&self) -> impl Iterator<Item = &LogicalId> {
        self.ingress_rules.iter().filter_map(|rule| match &rule.peer {
            Peer::SecurityGroup { group } => Some(&group.logical_id),
            Peer::Cidr { .. } => None,
        })
    }
}

/// Security group whose role is fixed at compile time
///
/// The egress policy follows the role and cannot be changed: cache groups
/// never allow all outbound traffic, bastion groups always do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroup<R: GroupRole> {
    spec: SecurityGroupSpec,
    role: PhantomData<R>,
}

impl<R: GroupRole> SecurityGroup<R> {
    pub fn new(logical_id: LogicalId, description: impl Into<String>, network: &NetworkRef) -> Self {
        Self {
            spec: SecurityGroupSpec {
                logical_id,
                description: description.into(),
                network: network.id().clone(),
                kind: R::KIND,
                allow_all_outbound: R::KIND.allow_all_outbound(),
                ingress_rules: Vec::new(),
            },
            role: PhantomData,
        }
    }

    /// Add an inbound rule
    ///
    /// Adding a rule that grants the same access as an existing one is a
    /// no-op.
    ///
    /// # Errors
    /// - `PolicyViolation` if a CIDR source targets a cache group
    /// - `NetworkMismatch` if a group source lives in another network
    pub fn add_ingress_rule(
        &mut self,
        peer: Peer,
        port: Port,
        description: impl Into<String>,
    ) -> ValidationResult {
        let rule = IngressRule::tcp(peer, port, description);
        invariants::validate_ingress_rule(&self.spec, &rule)?;

        if !self
            .spec
            .ingress_rules
            .iter()
            .any(|existing| existing.grants_same_access(&rule))
        {
            self.spec.ingress_rules.push(rule);
        }
        Ok(())
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.spec.logical_id
    }

    pub fn network(&self) -> &NetworkId {
        &self.spec.network
    }

    pub fn allow_all_outbound(&self) -> bool {
        self.spec.allow_all_outbound
    }

    pub fn ingress_rules(&self) -> &[IngressRule] {
        &self.spec.ingress_rules
    }

    pub fn reference(&self) -> SecurityGroupRef {
        self.spec.reference()
    }

    pub fn spec(&self) -> &SecurityGroupSpec {
        &self.spec
    }

    pub fn into_spec(self) -> SecurityGroupSpec {
        self.spec
    }
}

/// The pair of groups guarding a cache stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    pub cache: SecurityGroup<Cache>,
    pub bastion: SecurityGroup<Bastion>,
}

impl SecurityPolicy {
    /// Build both groups and their two ingress rules
    ///
    /// - bastion: `tcp/22` from any IPv4 source
    /// - cache: `tcp/{cache_port}` from the bastion group only
    pub fn build(network: &NetworkRef, cache_port: Port) -> Result<Self, ValidationError> {
        let mut cache = SecurityGroup::<Cache>::new(
            LogicalId::new(naming::CACHE_SECURITY_GROUP)?,
            naming::CACHE_SECURITY_GROUP_DESCRIPTION,
            network,
        );
        let mut bastion = SecurityGroup::<Bastion>::new(
            LogicalId::new(naming::BASTION_SECURITY_GROUP)?,
            naming::BASTION_SECURITY_GROUP_DESCRIPTION,
            network,
        );

        // Unrestricted SSH is a policy choice carried over as-is
        bastion.add_ingress_rule(Peer::any_ipv4(), Port::SSH, naming::SSH_RULE_DESCRIPTION)?;
        cache.add_ingress_rule(
            Peer::group(&bastion),
            cache_port,
            naming::CACHE_RULE_DESCRIPTION,
        )?;

        Ok(Self { cache, bastion })
    }
}
