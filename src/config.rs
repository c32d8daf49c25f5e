// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Configuration
//!
//! [`StackConfig`] carries every parameter a cache stack is built from. Its
//! `Default` is the reference deployment; environment variables override
//! individual fields.
//!
//! | Variable | Field |
//! |---|---|
//! | `CACHE_STACK_NAME` | `stack_name` |
//! | `CACHE_STACK_ACCOUNT` | `account` |
//! | `CACHE_STACK_REGION` | `region` |
//! | `CACHE_STACK_NETWORK_ID` | `network_id` |
//! | `CACHE_STACK_ENGINE` | `engine` |
//! | `CACHE_STACK_ENGINE_VERSION` | `engine_version` |
//! | `CACHE_STACK_NODE_TYPE` | `node_type` |
//! | `CACHE_STACK_NODE_COUNT` | `node_count` |
//! | `CACHE_STACK_VARIANT` | `variant` (`full` or `network-only`) |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{
    invariants, AccountId, CacheEngine, CacheSettings, EngineVersion, NetworkId, NodeType, Region,
    StackName, ValidationError,
};
use crate::errors::{StackError, StackResult};

/// Account and region a stack is deployed into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: AccountId,
    pub region: Region,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account, self.region)
    }
}

/// Which resources a stack declares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackVariant {
    /// Only the network lookup; no owned resources and no outputs
    NetworkOnly,
    /// Security groups, subnet group, cache cluster, bastion host and outputs
    #[default]
    Full,
}

impl fmt::Display for StackVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackVariant::NetworkOnly => write!(f, "network-only"),
            StackVariant::Full => write!(f, "full"),
        }
    }
}

impl FromStr for StackVariant {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(StackVariant::Full),
            "network-only" | "network_only" => Ok(StackVariant::NetworkOnly),
            other => Err(StackError::Configuration(format!(
                "Unknown stack variant: {}",
                other
            ))),
        }
    }
}

/// Parameters of one cache stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub stack_name: StackName,
    pub account: AccountId,
    pub region: Region,
    pub network_id: NetworkId,
    pub engine: CacheEngine,
    pub engine_version: EngineVersion,
    pub node_type: NodeType,
    pub node_count: u32,
    pub variant: StackVariant,
}

impl Default for StackConfig {
    fn default() -> Self {
        // Literals below are known-valid
        Self {
            stack_name: StackName::from_static("RedisStack"),
            account: AccountId::from_static("618537831167"),
            region: Region::from_static("us-west-2"),
            network_id: NetworkId::from_static("vpc-ea3b6581"),
            engine: CacheEngine::Redis,
            engine_version: EngineVersion::from_static("7.1"),
            node_type: NodeType::from_static("cache.t4g.small"),
            node_count: 1,
            variant: StackVariant::Full,
        }
    }
}

impl StackConfig {
    /// Defaults overridden by `CACHE_STACK_*` environment variables
    pub fn from_env() -> StackResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> StackResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("CACHE_STACK_NAME") {
            config.stack_name = StackName::new(value)?;
        }
        if let Some(value) = lookup("CACHE_STACK_ACCOUNT") {
            config.account = AccountId::new(value)?;
        }
        if let Some(value) = lookup("CACHE_STACK_REGION") {
            config.region = Region::new(value)?;
        }
        if let Some(value) = lookup("CACHE_STACK_NETWORK_ID") {
            config.network_id = NetworkId::new(value)?;
        }
        if let Some(value) = lookup("CACHE_STACK_ENGINE") {
            config.engine = value.parse()?;
        }
        if let Some(value) = lookup("CACHE_STACK_ENGINE_VERSION") {
            config.engine_version = EngineVersion::new(value)?;
        }
        if let Some(value) = lookup("CACHE_STACK_NODE_TYPE") {
            config.node_type = NodeType::new(value)?;
        }
        if let Some(value) = lookup("CACHE_STACK_NODE_COUNT") {
            config.node_count = value.parse().map_err(|_| {
                StackError::Configuration(format!("CACHE_STACK_NODE_COUNT is not a number: {}", value))
            })?;
        }
        if let Some(value) = lookup("CACHE_STACK_VARIANT") {
            config.variant = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check field combinations a single field's type cannot
    pub fn validate(&self) -> Result<(), ValidationError> {
        invariants::validate_node_count(self.node_count)
    }

    pub fn environment(&self) -> Environment {
        Environment {
            account: self.account.clone(),
            region: self.region.clone(),
        }
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            engine: self.engine,
            engine_version: self.engine_version.clone(),
            node_type: self.node_type.clone(),
            node_count: self.node_count,
        }
    }
}
