// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cache Cluster Resource
//!
//! Declarative description of a managed single-node cache. Building one
//! performs no I/O: it only assembles desired state from [`CacheSettings`],
//! the subnet group, and the cache security group. Identical inputs always
//! produce an identical description.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::identifiers::LogicalId;
use super::invariants::{self, ValidationError, ValidationResult};
use super::network::Port;
use super::security_group::{Cache, SecurityGroup, SecurityGroupRef};
use super::subnet_group::{SubnetGroup, SubnetGroupRef};

/// Cache engine (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEngine {
    Redis,
    Valkey,
    Memcached,
}

impl CacheEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEngine::Redis => "redis",
            CacheEngine::Valkey => "valkey",
            CacheEngine::Memcached => "memcached",
        }
    }

    /// Port the engine listens on
    pub fn default_port(&self) -> Port {
        match self {
            CacheEngine::Redis | CacheEngine::Valkey => Port::REDIS,
            CacheEngine::Memcached => Port::MEMCACHED,
        }
    }

    /// Whether clients reach it with the Redis protocol
    pub fn speaks_redis(&self) -> bool {
        matches!(self, CacheEngine::Redis | CacheEngine::Valkey)
    }
}

impl fmt::Display for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CacheEngine {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheEngine::Redis),
            "valkey" => Ok(CacheEngine::Valkey),
            "memcached" => Ok(CacheEngine::Memcached),
            _ => Err(ValidationError::UnsupportedEngine(s.to_string())),
        }
    }
}

/// Engine version in `major.minor[.patch]` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EngineVersion(String);

impl EngineVersion {
    pub fn new(version: impl Into<String>) -> Result<Self, ValidationError> {
        let version = version.into();
        let parts: Vec<&str> = version.split('.').collect();

        let well_formed = (2..=3).contains(&parts.len())
            && parts
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

        if !well_formed {
            return Err(ValidationError::InvalidEngineVersion(version));
        }
        Ok(Self(version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn major(&self) -> u32 {
        self.0
            .split('.')
            .next()
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }
}

impl EngineVersion {
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid literal {}", value);
        Self(value.to_string())
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EngineVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EngineVersion {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EngineVersion> for String {
    fn from(value: EngineVersion) -> Self {
        value.0
    }
}

/// Cache node instance type such as `cache.t4g.small`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeType(String);

impl NodeType {
    pub const PREFIX: &'static str = "cache.";

    pub fn new(node_type: impl Into<String>) -> Result<Self, ValidationError> {
        let node_type = node_type.into();
        let parts: Vec<&str> = node_type.split('.').collect();

        let well_formed = node_type.starts_with(Self::PREFIX)
            && parts.len() == 3
            && parts.iter().all(|p| {
                !p.is_empty()
                    && p.chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            });

        if !well_formed {
            return Err(ValidationError::InvalidNodeType(node_type));
        }
        Ok(Self(node_type))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl NodeType {
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid literal {}", value);
        Self(value.to_string())
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NodeType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.0
    }
}

/// Engine settings a cache cluster is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub engine: CacheEngine,
    pub engine_version: EngineVersion,
    pub node_type: NodeType,
    pub node_count: u32,
}

/// Desired state of a managed cache cluster
///
/// # Invariants
/// - `node_count == 1`
/// - The subnet group and every security group share one network
/// - The cache group admits only the bastion, on the cluster's port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCluster {
    logical_id: LogicalId,
    engine: CacheEngine,
    engine_version: EngineVersion,
    node_type: NodeType,
    node_count: u32,
    port: Port,
    subnet_group: SubnetGroupRef,
    security_groups: Vec<SecurityGroupRef>,
}

impl CacheCluster {
    /// Assemble a cluster bound to `subnet_group` and the cache security group
    pub fn new(
        logical_id: LogicalId,
        settings: &CacheSettings,
        subnet_group: &SubnetGroup,
        security_group: &SecurityGroup<Cache>,
    ) -> Result<Self, ValidationError> {
        invariants::validate_cache_access(security_group.spec(), settings.engine.default_port())?;

        let cluster = Self {
            logical_id,
            engine: settings.engine,
            engine_version: settings.engine_version.clone(),
            node_type: settings.node_type.clone(),
            node_count: settings.node_count,
            port: settings.engine.default_port(),
            subnet_group: subnet_group.reference(),
            security_groups: vec![security_group.reference()],
        };
        cluster.validate()?;
        Ok(cluster)
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn engine(&self) -> CacheEngine {
        self.engine
    }

    pub fn engine_version(&self) -> &EngineVersion {
        &self.engine_version
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn subnet_group(&self) -> &SubnetGroupRef {
        &self.subnet_group
    }

    pub fn security_groups(&self) -> &[SecurityGroupRef] {
        &self.security_groups
    }

    pub fn validate(&self) -> ValidationResult {
        invariants::validate_node_count(self.node_count)?;

        for group in &self.security_groups {
            invariants::validate_same_network(
                &group.logical_id,
                &self.subnet_group.network,
                &group.network,
            )?;
        }
        Ok(())
    }

    /// Logical ids this cluster depends on
    pub fn references(&self) -> Vec<LogicalId> {
        std::iter::once(self.subnet_group.logical_id.clone())
            .chain(self.security_groups.iter().map(|g| g.logical_id.clone()))
            .collect()
    }
}
