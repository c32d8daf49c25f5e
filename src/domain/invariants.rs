// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! Every rule that keeps the cache topology minimal-exposure lives here as a
//! pure function. Builders call them while assembling resources, and
//! [`ResourceGraph::validate`](crate::graph::ResourceGraph::validate) calls
//! them again over the finished graph, so a graph that did not come from the
//! builders (for example one read back from an engine) is held to the same
//! rules.
//!
//! # Invariant Categories
//!
//! 1. **Structural Invariants**: identifiers, ports, versions are well formed
//! 2. **Placement Invariants**: subnets and groups share one network
//! 3. **Access Invariants**: who may reach the cache and the bastion
//! 4. **Graph Invariants**: unique ids, resolvable references, no cycles

use super::identifiers::{LogicalId, NetworkId, SubnetId};
use super::network::{Cidr, Port, Protocol, SubnetType};
use super::security_group::{GroupKind, IngressRule, Peer, SecurityGroupRef, SecurityGroupSpec};
use super::subnet_group::SubnetGroup;
use super::NetworkRef;

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Identifier does not have the expected shape
    #[error("Invalid {kind}: {value:?}")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid port: {0} (must be 1-65535)")]
    InvalidPort(u16),

    #[error("Invalid subnet type: {0}")]
    InvalidSubnetType(String),

    #[error("Unsupported cache engine: {0}")]
    UnsupportedEngine(String),

    #[error("Invalid engine version: {0} (expected major.minor[.patch])")]
    InvalidEngineVersion(String),

    #[error("Invalid node type: {0} (expected cache.<family>.<size>)")]
    InvalidNodeType(String),

    /// Access policy would expose a resource
    #[error("Policy constraint violated: {0}")]
    PolicyViolation(String),

    /// Placement selected no subnets
    #[error("No {subnet_type} subnets in network {network}")]
    EmptyPlacement {
        network: NetworkId,
        subnet_type: SubnetType,
    },

    #[error("{resource} is in network {actual}, expected {expected}")]
    NetworkMismatch {
        resource: LogicalId,
        expected: NetworkId,
        actual: NetworkId,
    },

    #[error("Subnet {subnet} does not belong to network {network}")]
    ForeignSubnet { subnet: SubnetId, network: NetworkId },

    #[error("Invalid node count: {0} (single-node topology requires exactly 1)")]
    InvalidNodeCount(u32),

    #[error("Security group {group} must have allow_all_outbound = {expected}")]
    EgressPolicy { group: LogicalId, expected: bool },

    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(LogicalId),

    #[error("{resource} references unknown resource {reference}")]
    DanglingReference {
        resource: LogicalId,
        reference: LogicalId,
    },

    #[error("Dependency cycle involving {0}")]
    DependencyCycle(LogicalId),

    /// Change plan does not match the graph it is applied to
    #[error("Plan does not match graph: {0}")]
    InconsistentPlan(String),
}

/// Validate node count for the single-node topology
pub fn validate_node_count(node_count: u32) -> ValidationResult {
    if node_count != 1 {
        return Err(ValidationError::InvalidNodeCount(node_count));
    }
    Ok(())
}

/// Validate a resource sits in the expected network
pub fn validate_same_network(
    resource: &LogicalId,
    expected: &NetworkId,
    actual: &NetworkId,
) -> ValidationResult {
    if expected != actual {
        return Err(ValidationError::NetworkMismatch {
            resource: resource.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
        });
    }
    Ok(())
}

/// Validate a group's egress policy matches its role
///
/// # Rules
/// - Cache group: explicit egress only (`allow_all_outbound == false`)
/// - Bastion group: all outbound allowed
pub fn validate_egress_policy(group: &SecurityGroupSpec) -> ValidationResult {
    let expected = group.kind.allow_all_outbound();
    if group.allow_all_outbound != expected {
        return Err(ValidationError::EgressPolicy {
            group: group.logical_id.clone(),
            expected,
        });
    }
    Ok(())
}

/// Validate that `target` may carry `rule`
///
/// # Rules
/// - The cache group never admits a CIDR source, public or otherwise
/// - The cache group only admits the bastion group
/// - A group source must live in the same network as the target
pub fn validate_ingress_rule(target: &SecurityGroupSpec, rule: &IngressRule) -> ValidationResult {
    match &rule.peer {
        Peer::Cidr { cidr } => validate_cidr_peer(target, cidr),
        Peer::SecurityGroup { group } => {
            if target.kind == GroupKind::Cache && group.kind != GroupKind::Bastion {
                return Err(ValidationError::PolicyViolation(format!(
                    "cache group {} can only admit the bastion group, not {} group {}",
                    target.logical_id, group.kind, group.logical_id
                )));
            }
            validate_same_network(&group.logical_id, &target.network, &group.network)
        }
    }
}

/// Validate the cache group admits exactly the bastion on the cache port
///
/// # Rules
/// - Exactly one rule
/// - Its source is a bastion-role group
/// - Its port is `cache_port` over TCP
pub fn validate_cache_access(group: &SecurityGroupSpec, cache_port: Port) -> ValidationResult {
    let admits_bastion = |rule: &IngressRule| {
        matches!(&rule.peer, Peer::SecurityGroup { group } if group.kind == GroupKind::Bastion)
            && rule.port == cache_port
            && rule.protocol == Protocol::Tcp
    };

    match group.ingress_rules.as_slice() {
        [rule] if admits_bastion(rule) => Ok(()),
        rules => Err(ValidationError::PolicyViolation(format!(
            "cache group {} must admit only the bastion group on tcp/{}, found {} rule(s): {}",
            group.logical_id,
            cache_port,
            rules.len(),
            describe_rules(rules)
        ))),
    }
}

/// Validate the bastion group admits SSH from any IPv4 source and nothing else
pub fn validate_bastion_access(group: &SecurityGroupSpec) -> ValidationResult {
    let is_ssh = |rule: &IngressRule| {
        matches!(&rule.peer, Peer::Cidr { cidr } if *cidr == Cidr::any_ipv4())
            && rule.port == Port::SSH
            && rule.protocol == Protocol::Tcp
    };

    match group.ingress_rules.as_slice() {
        [rule] if is_ssh(rule) => Ok(()),
        rules => Err(ValidationError::PolicyViolation(format!(
            "bastion group {} must carry exactly tcp/{} from {}, found {} rule(s): {}",
            group.logical_id,
            Port::SSH,
            Cidr::any_ipv4(),
            rules.len(),
            describe_rules(rules)
        ))),
    }
}

fn describe_rules(rules: &[IngressRule]) -> String {
    rules
        .iter()
        .map(|rule| format!("{}/{} from {}", rule.protocol, rule.port, rule.peer))
        .collect::<Vec<_>>()
        .join(", ")
}

fn validate_cidr_peer(target: &SecurityGroupSpec, cidr: &Cidr) -> ValidationResult {
    if !target.kind.admits_cidr_peers() {
        return Err(ValidationError::PolicyViolation(format!(
            "{} group {} cannot admit ingress from CIDR {}",
            target.kind, target.logical_id, cidr
        )));
    }
    Ok(())
}

/// Validate every invariant of a security group
///
/// The cache group's port depends on the cluster it guards, so
/// [`validate_cache_access`] runs where the cluster is known.
pub fn validate_security_group(group: &SecurityGroupSpec) -> ValidationResult {
    validate_egress_policy(group)?;
    for rule in &group.ingress_rules {
        validate_ingress_rule(group, rule)?;
    }
    if group.kind == GroupKind::Bastion {
        validate_bastion_access(group)?;
    }
    Ok(())
}

/// Validate the group bound to a bastion host
///
/// # Rules
/// - Only a bastion-role group may be bound; the cache group never is
pub fn validate_bastion_binding(bastion: &LogicalId, group: &SecurityGroupRef) -> ValidationResult {
    if group.kind != GroupKind::Bastion {
        return Err(ValidationError::PolicyViolation(format!(
            "bastion host {} cannot be bound to {} group {}",
            bastion, group.kind, group.logical_id
        )));
    }
    Ok(())
}

/// Validate every subnet of a group belongs to the network
pub fn validate_subnet_membership(group: &SubnetGroup, network: &NetworkRef) -> ValidationResult {
    validate_same_network(group.name(), network.id(), group.network())?;
    for subnet in group.subnet_ids() {
        if !network.contains_subnet(subnet) {
            return Err(ValidationError::ForeignSubnet {
                subnet: subnet.clone(),
                network: network.id().clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Port, Protocol};

    fn network_id() -> NetworkId {
        NetworkId::new("vpc-ea3b6581").unwrap()
    }

    fn group(kind: GroupKind, allow_all_outbound: bool) -> SecurityGroupSpec {
        SecurityGroupSpec {
            logical_id: LogicalId::new("TestSG").unwrap(),
            description: "test".to_string(),
            network: network_id(),
            kind,
            allow_all_outbound,
            ingress_rules: Vec::new(),
        }
    }

    fn cidr_rule(cidr: &str, port: Port) -> IngressRule {
        IngressRule {
            peer: Peer::Cidr {
                cidr: Cidr::new(cidr).unwrap(),
            },
            port,
            protocol: Protocol::Tcp,
            description: "rule".to_string(),
        }
    }

    #[test]
    fn test_validate_node_count() {
        assert!(validate_node_count(1).is_ok());
        assert_eq!(
            validate_node_count(0),
            Err(ValidationError::InvalidNodeCount(0))
        );
        assert_eq!(
            validate_node_count(2),
            Err(ValidationError::InvalidNodeCount(2))
        );
    }

    #[test]
    fn test_validate_egress_policy() {
        assert!(validate_egress_policy(&group(GroupKind::Cache, false)).is_ok());
        assert!(validate_egress_policy(&group(GroupKind::Bastion, true)).is_ok());

        assert!(matches!(
            validate_egress_policy(&group(GroupKind::Cache, true)),
            Err(ValidationError::EgressPolicy { expected: false, .. })
        ));
        assert!(matches!(
            validate_egress_policy(&group(GroupKind::Bastion, false)),
            Err(ValidationError::EgressPolicy { expected: true, .. })
        ));
    }

    #[test]
    fn test_cache_group_rejects_any_cidr() {
        let cache = group(GroupKind::Cache, false);

        for cidr in ["0.0.0.0/0", "10.0.0.0/8", "203.0.113.7/32"] {
            let result = validate_ingress_rule(&cache, &cidr_rule(cidr, Port::REDIS));
            assert!(matches!(result, Err(ValidationError::PolicyViolation(_))));
        }
    }

    #[test]
    fn test_bastion_group_admits_cidr() {
        let bastion = group(GroupKind::Bastion, true);
        assert!(validate_ingress_rule(&bastion, &cidr_rule("0.0.0.0/0", Port::SSH)).is_ok());
    }

    #[test]
    fn test_group_peer_must_share_network() {
        let cache = group(GroupKind::Cache, false);
        let foreign = SecurityGroupRef {
            logical_id: LogicalId::new("OtherSG").unwrap(),
            network: NetworkId::new("vpc-0ther").unwrap(),
            kind: GroupKind::Bastion,
        };
        let rule = IngressRule {
            peer: Peer::SecurityGroup { group: foreign },
            port: Port::REDIS,
            protocol: Protocol::Tcp,
            description: "cross network".to_string(),
        };

        assert!(matches!(
            validate_ingress_rule(&cache, &rule),
            Err(ValidationError::NetworkMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_bastion_binding() {
        let bastion_id = LogicalId::new("BastionHost").unwrap();
        let mut group_ref = SecurityGroupRef {
            logical_id: LogicalId::new("BastionSG").unwrap(),
            network: network_id(),
            kind: GroupKind::Bastion,
        };
        assert!(validate_bastion_binding(&bastion_id, &group_ref).is_ok());

        group_ref.kind = GroupKind::Cache;
        assert!(matches!(
            validate_bastion_binding(&bastion_id, &group_ref),
            Err(ValidationError::PolicyViolation(_))
        ));
    }

    fn group_rule(kind: GroupKind, port: Port) -> IngressRule {
        IngressRule {
            peer: Peer::SecurityGroup {
                group: SecurityGroupRef {
                    logical_id: LogicalId::new("PeerSG").unwrap(),
                    network: network_id(),
                    kind,
                },
            },
            port,
            protocol: Protocol::Tcp,
            description: "rule".to_string(),
        }
    }

    #[test]
    fn test_cache_group_rejects_non_bastion_group_peer() {
        let cache = group(GroupKind::Cache, false);

        assert!(validate_ingress_rule(&cache, &group_rule(GroupKind::Bastion, Port::REDIS)).is_ok());
        assert!(matches!(
            validate_ingress_rule(&cache, &group_rule(GroupKind::Cache, Port::REDIS)),
            Err(ValidationError::PolicyViolation(_))
        ));
    }

    #[test]
    fn test_cache_access_requires_single_bastion_rule_on_cache_port() {
        let mut cache = group(GroupKind::Cache, false);
        cache.ingress_rules.push(group_rule(GroupKind::Bastion, Port::REDIS));
        assert!(validate_cache_access(&cache, Port::REDIS).is_ok());

        // Right source, wrong port for the cluster
        assert!(matches!(
            validate_cache_access(&cache, Port::MEMCACHED),
            Err(ValidationError::PolicyViolation(_))
        ));

        cache.ingress_rules.push(group_rule(GroupKind::Bastion, Port::SSH));
        assert!(matches!(
            validate_cache_access(&cache, Port::REDIS),
            Err(ValidationError::PolicyViolation(_))
        ));

        cache.ingress_rules.clear();
        assert!(validate_cache_access(&cache, Port::REDIS).is_err());
    }

    #[test]
    fn test_bastion_group_carries_exactly_ssh() {
        let mut bastion = group(GroupKind::Bastion, true);
        assert!(validate_security_group(&bastion).is_err());

        bastion.ingress_rules.push(cidr_rule("0.0.0.0/0", Port::SSH));
        assert!(validate_security_group(&bastion).is_ok());

        bastion
            .ingress_rules
            .push(cidr_rule("0.0.0.0/0", Port::new(3389).unwrap()));
        assert!(matches!(
            validate_security_group(&bastion),
            Err(ValidationError::PolicyViolation(_))
        ));

        bastion.ingress_rules = vec![cidr_rule("10.0.0.0/8", Port::SSH)];
        assert!(validate_bastion_access(&bastion).is_err());
    }
}
