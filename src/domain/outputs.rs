// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Outputs
//!
//! Outputs are a pure projection of resolved resource attributes. An
//! [`OutputBinding`] names which attribute of which resource feeds an output;
//! [`emit_outputs`] reads the bindings against [`ResolvedAttributes`] and
//! never touches a resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::identifiers::LogicalId;
use crate::errors::DependencyError;

/// Attribute a resource exposes once applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    RedisEndpointAddress,
    RedisEndpointPort,
    PublicIp,
    PublicDnsName,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::RedisEndpointAddress => "redis_endpoint_address",
            Attribute::RedisEndpointPort => "redis_endpoint_port",
            Attribute::PublicIp => "public_ip",
            Attribute::PublicDnsName => "public_dns_name",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exported output names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputKey {
    #[serde(rename = "RedisEndpoint")]
    RedisEndpoint,
    #[serde(rename = "RedisPort")]
    RedisPort,
    #[serde(rename = "BastionPublicIP")]
    BastionPublicIp,
    #[serde(rename = "BastionPublicDNS")]
    BastionPublicDns,
}

impl OutputKey {
    pub const ALL: [OutputKey; 4] = [
        OutputKey::RedisEndpoint,
        OutputKey::RedisPort,
        OutputKey::BastionPublicIp,
        OutputKey::BastionPublicDns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKey::RedisEndpoint => "RedisEndpoint",
            OutputKey::RedisPort => "RedisPort",
            OutputKey::BastionPublicIp => "BastionPublicIP",
            OutputKey::BastionPublicDns => "BastionPublicDNS",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OutputKey::RedisEndpoint => "Redis Cluster Endpoint Address",
            OutputKey::RedisPort => "Redis Cluster Endpoint Port",
            OutputKey::BastionPublicIp => "Public IP address of the Bastion Host",
            OutputKey::BastionPublicDns => "Public DNS name of the Bastion Host",
        }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which resource attribute feeds an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputBinding {
    pub key: OutputKey,
    pub resource: LogicalId,
    pub attribute: Attribute,
}

impl OutputBinding {
    pub fn new(key: OutputKey, resource: LogicalId, attribute: Attribute) -> Self {
        Self {
            key,
            resource,
            attribute,
        }
    }
}

/// The four outputs of a cache stack
pub fn standard_bindings(cache_cluster: &LogicalId, bastion_host: &LogicalId) -> Vec<OutputBinding> {
    vec![
        OutputBinding::new(
            OutputKey::RedisEndpoint,
            cache_cluster.clone(),
            Attribute::RedisEndpointAddress,
        ),
        OutputBinding::new(
            OutputKey::RedisPort,
            cache_cluster.clone(),
            Attribute::RedisEndpointPort,
        ),
        OutputBinding::new(
            OutputKey::BastionPublicIp,
            bastion_host.clone(),
            Attribute::PublicIp,
        ),
        OutputBinding::new(
            OutputKey::BastionPublicDns,
            bastion_host.clone(),
            Attribute::PublicDnsName,
        ),
    ]
}

/// A named, read-only export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub key: OutputKey,
    pub value: String,
    pub description: String,
}

/// Attribute values reported by a provisioning engine after apply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedAttributes {
    resources: BTreeMap<LogicalId, BTreeMap<Attribute, String>>,
}

impl ResolvedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: LogicalId, attribute: Attribute, value: impl Into<String>) {
        self.resources
            .entry(resource)
            .or_default()
            .insert(attribute, value.into());
    }

    /// Resolved, non-empty value of an attribute
    pub fn get(&self, resource: &LogicalId, attribute: Attribute) -> Option<&str> {
        self.resources
            .get(resource)
            .and_then(|attrs| attrs.get(&attribute))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn contains_resource(&self, resource: &LogicalId) -> bool {
        self.resources.contains_key(resource)
    }

    pub fn remove_resource(&mut self, resource: &LogicalId) {
        self.resources.remove(resource);
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Project bindings onto resolved attributes
///
/// # Errors
/// - `UnresolvedAttribute` for the first binding with no resolved value
pub fn emit_outputs(
    bindings: &[OutputBinding],
    attributes: &ResolvedAttributes,
) -> Result<Vec<StackOutput>, DependencyError> {
    bindings
        .iter()
        .map(|binding| {
            let value = attributes
                .get(&binding.resource, binding.attribute)
                .ok_or_else(|| DependencyError::UnresolvedAttribute {
                    resource: binding.resource.clone(),
                    attribute: binding.attribute,
                })?;

            Ok(StackOutput {
                key: binding.key,
                value: value.to_string(),
                description: binding.key.description().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (LogicalId, LogicalId) {
        (
            LogicalId::new("CacheCluster").unwrap(),
            LogicalId::new("BastionHost").unwrap(),
        )
    }

    fn resolved() -> ResolvedAttributes {
        let (cache, bastion) = ids();
        let mut attrs = ResolvedAttributes::new();
        attrs.insert(
            cache.clone(),
            Attribute::RedisEndpointAddress,
            "cachecluster.abc123.usw2.cache.amazonaws.com",
        );
        attrs.insert(cache, Attribute::RedisEndpointPort, "6379");
        attrs.insert(bastion.clone(), Attribute::PublicIp, "203.0.113.10");
        attrs.insert(
            bastion,
            Attribute::PublicDnsName,
            "ec2-203-0-113-10.us-west-2.compute.amazonaws.com",
        );
        attrs
    }

    #[test]
    fn test_emit_all_outputs() {
        let (cache, bastion) = ids();
        let outputs = emit_outputs(&standard_bindings(&cache, &bastion), &resolved()).unwrap();

        let keys: Vec<&str> = outputs.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["RedisEndpoint", "RedisPort", "BastionPublicIP", "BastionPublicDNS"]
        );
        assert_eq!(outputs[1].value, "6379");
        assert_eq!(outputs[1].description, "Redis Cluster Endpoint Port");
    }

    #[test]
    fn test_missing_resource_is_unresolved() {
        let (cache, bastion) = ids();
        let mut attrs = resolved();
        attrs.remove_resource(&bastion);

        let err = emit_outputs(&standard_bindings(&cache, &bastion), &attrs).unwrap_err();
        assert_eq!(
            err,
            DependencyError::UnresolvedAttribute {
                resource: bastion,
                attribute: Attribute::PublicIp,
            }
        );
    }

    #[test]
    fn test_empty_value_is_unresolved() {
        let (cache, bastion) = ids();
        let mut attrs = resolved();
        attrs.insert(cache.clone(), Attribute::RedisEndpointPort, "");

        assert!(matches!(
            emit_outputs(&standard_bindings(&cache, &bastion), &attrs),
            Err(DependencyError::UnresolvedAttribute {
                attribute: Attribute::RedisEndpointPort,
                ..
            })
        ));
    }

    #[test]
    fn test_output_key_serializes_to_export_name() {
        assert_eq!(
            serde_json::to_string(&OutputKey::BastionPublicIp).unwrap(),
            "\"BastionPublicIP\""
        );
    }
}
