// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Resource Graphs
//!
//! Networks are generated with arbitrary mixes of subnet types and orderings.
//! Whenever at least one public subnet exists the graph must build, and its
//! access policy must never widen beyond bastion-only cache access.

use cim_cache_stack::domain::{
    Cidr, GroupKind, LogicalId, NetworkId, NetworkRef, Peer, Port, Subnet, SubnetId, SubnetType,
    ValidationError,
};
use cim_cache_stack::{ResourceGraph, ResourceNode, StackConfig};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn subnet_type() -> impl Strategy<Value = SubnetType> {
    prop_oneof![
        Just(SubnetType::Public),
        Just(SubnetType::PrivateWithEgress),
        Just(SubnetType::PrivateIsolated),
    ]
}

fn zone() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c"]).prop_map(|suffix| format!("us-west-2{}", suffix))
}

/// Subnets with unique ids, built from (type, zone) pairs
fn subnets(types: Vec<(SubnetType, String)>) -> Vec<Subnet> {
    types
        .into_iter()
        .enumerate()
        .map(|(i, (subnet_type, zone))| {
            let id = SubnetId::new(format!("subnet-{:08x}", i * 7919 + 1)).unwrap();
            Subnet::new(id, subnet_type, zone)
        })
        .collect()
}

/// A network with at least one public subnet, in arbitrary order
fn network_with_public_subnet() -> impl Strategy<Value = NetworkRef> {
    (
        zone(),
        prop::collection::vec((subnet_type(), zone()), 0..8),
    )
        .prop_map(|(public_zone, mut rest)| {
            rest.push((SubnetType::Public, public_zone));
            subnets(rest)
        })
        .prop_shuffle()
        .prop_map(|subnets| NetworkRef::new(network_id(), subnets))
}

/// A network whose subnets are all private
fn network_without_public_subnet() -> impl Strategy<Value = NetworkRef> {
    let private = prop_oneof![
        Just(SubnetType::PrivateWithEgress),
        Just(SubnetType::PrivateIsolated),
    ];
    prop::collection::vec((private, zone()), 0..8)
        .prop_map(|types| NetworkRef::new(network_id(), subnets(types)))
}

fn network_id() -> NetworkId {
    NetworkId::new("vpc-ea3b6581").unwrap()
}

fn build(network: &NetworkRef) -> ResourceGraph {
    ResourceGraph::build(&StackConfig::default(), network).unwrap()
}

fn public_ids(network: &NetworkRef) -> BTreeSet<SubnetId> {
    network
        .subnets_of_type(SubnetType::Public)
        .map(|s| s.id.clone())
        .collect()
}

fn id(s: &str) -> LogicalId {
    LogicalId::new(s).unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: The cache group never admits a CIDR and never opens egress
    #[test]
    fn prop_cache_group_admits_only_bastion(network in network_with_public_subnet()) {
        let graph = build(&network);

        for node in graph.resources().values() {
            if let ResourceNode::SecurityGroup(group) = node {
                if group.kind != GroupKind::Cache {
                    continue;
                }
                prop_assert!(!group.allow_all_outbound);
                for rule in &group.ingress_rules {
                    prop_assert_eq!(rule.port, Port::REDIS);
                    match &rule.peer {
                        Peer::SecurityGroup { group } => {
                            prop_assert_eq!(group.kind, GroupKind::Bastion)
                        }
                        Peer::Cidr { cidr } => {
                            prop_assert!(false, "cache group admits CIDR {}", cidr)
                        }
                    }
                }
            }
        }
    }

    /// Property: The bastion group has exactly one rule, SSH from any IPv4
    #[test]
    fn prop_bastion_group_is_ssh_only(network in network_with_public_subnet()) {
        let graph = build(&network);

        match graph.get(&id("BastionSG")) {
            Some(ResourceNode::SecurityGroup(group)) => {
                prop_assert_eq!(group.ingress_rules.len(), 1);
                prop_assert_eq!(group.ingress_rules[0].port, Port::SSH);
                prop_assert_eq!(
                    &group.ingress_rules[0].peer,
                    &Peer::Cidr { cidr: Cidr::any_ipv4() }
                );
            }
            other => prop_assert!(false, "unexpected BastionSG node {:?}", other),
        }
    }

    /// Property: Building twice from the same inputs yields identical JSON
    #[test]
    fn prop_build_is_deterministic(network in network_with_public_subnet()) {
        let first = build(&network).to_json().unwrap();
        let second = build(&network).to_json().unwrap();

        prop_assert_eq!(first, second);
    }

    /// Property: A graph diffed against itself plans no changes
    #[test]
    fn prop_self_diff_is_noop(network in network_with_public_subnet()) {
        let graph = build(&network);

        let diff = graph.diff(Some(&graph)).unwrap();

        prop_assert!(diff.is_noop());
        prop_assert_eq!(diff.changes.len(), graph.resources().len());
    }

    /// Property: Every resource comes after all of its dependencies
    #[test]
    fn prop_topological_order_respects_dependencies(network in network_with_public_subnet()) {
        let graph = build(&network);
        let order = graph.topological_order().unwrap();

        prop_assert_eq!(order.len(), graph.resources().len());
        for (position, logical_id) in order.iter().enumerate() {
            let node = graph.get(logical_id).unwrap();
            for dependency in node.dependencies() {
                let before = order.iter().position(|i| *i == dependency).unwrap();
                prop_assert!(before < position, "{} must follow {}", logical_id, dependency);
            }
        }
    }

    /// Property: The subnet group is exactly the set of public subnets
    #[test]
    fn prop_subnet_group_is_public_subnets(network in network_with_public_subnet()) {
        let graph = build(&network);

        match graph.get(&id("RedisSubnetGroup")) {
            Some(ResourceNode::SubnetGroup(group)) => {
                prop_assert_eq!(group.subnet_ids(), &public_ids(&network));
            }
            other => prop_assert!(false, "unexpected RedisSubnetGroup node {:?}", other),
        }

        match graph.get(&id("BastionHost")) {
            Some(ResourceNode::BastionHost(host)) => {
                prop_assert!(public_ids(&network).contains(host.subnet()));
            }
            other => prop_assert!(false, "unexpected BastionHost node {:?}", other),
        }
    }

    /// Property: Without a public subnet the build fails with empty placement
    #[test]
    fn prop_private_networks_fail_placement(network in network_without_public_subnet()) {
        let result = ResourceGraph::build(&StackConfig::default(), &network);

        let is_empty_placement = matches!(
            result,
            Err(ValidationError::EmptyPlacement { subnet_type: SubnetType::Public, .. })
        );
        prop_assert!(is_empty_placement);
    }
}
