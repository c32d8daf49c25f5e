// Copyright (c) 2025 - Cowboy AI, Inc.
//! Desired-State Resource Graph
//!
//! A [`ResourceGraph`] is the complete declarative description of one stack:
//! the borrowed network, every owned resource keyed by logical id, and the
//! output bindings. Building it performs no I/O and the same inputs always
//! produce the same graph, down to the bytes of [`ResourceGraph::to_json`].
//!
//! Dependencies point from a resource to what it consumes:
//!
//! ```text
//! RedisSG ──▶ BastionSG ◀── BastionHost
//!    ▲
//! CacheCluster ──▶ RedisSubnetGroup
//! ```
//!
//! The network itself is not a node. Every node records the network it
//! lives in and [`ResourceGraph::validate`] checks it against the lookup.

mod diff;

pub use diff::{PlannedChange, ResourceChange, StackDiff};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::{Environment, StackConfig, StackVariant};
use crate::domain::{
    emit_outputs, invariants, naming, standard_bindings, BastionHost, CacheCluster, GroupKind,
    LogicalId, NetworkId, NetworkRef, OutputBinding, Peer, ResolvedAttributes, SecurityGroupRef,
    SecurityGroupSpec, SecurityPolicy, StackName, StackOutput, SubnetGroup, SubnetSelection,
    ValidationError, ValidationResult,
};
use crate::errors::{DependencyError, StackResult};

/// Kind of an owned resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    SecurityGroup,
    SubnetGroup,
    CacheCluster,
    BastionHost,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::SecurityGroup => "SecurityGroup",
            ResourceKind::SubnetGroup => "SubnetGroup",
            ResourceKind::CacheCluster => "CacheCluster",
            ResourceKind::BastionHost => "BastionHost",
        };
        write!(f, "{}", s)
    }
}

/// One owned resource in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties")]
pub enum ResourceNode {
    SecurityGroup(SecurityGroupSpec),
    SubnetGroup(SubnetGroup),
    CacheCluster(CacheCluster),
    BastionHost(BastionHost),
}

impl ResourceNode {
    pub fn logical_id(&self) -> &LogicalId {
        match self {
            ResourceNode::SecurityGroup(group) => &group.logical_id,
            ResourceNode::SubnetGroup(group) => group.name(),
            ResourceNode::CacheCluster(cluster) => cluster.logical_id(),
            ResourceNode::BastionHost(host) => host.logical_id(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceNode::SecurityGroup(_) => ResourceKind::SecurityGroup,
            ResourceNode::SubnetGroup(_) => ResourceKind::SubnetGroup,
            ResourceNode::CacheCluster(_) => ResourceKind::CacheCluster,
            ResourceNode::BastionHost(_) => ResourceKind::BastionHost,
        }
    }

    pub fn network(&self) -> &NetworkId {
        match self {
            ResourceNode::SecurityGroup(group) => &group.network,
            ResourceNode::SubnetGroup(group) => group.network(),
            ResourceNode::CacheCluster(cluster) => &cluster.subnet_group().network,
            ResourceNode::BastionHost(host) => host.network(),
        }
    }

    /// Logical ids this resource consumes, sorted
    pub fn dependencies(&self) -> BTreeSet<LogicalId> {
        match self {
            ResourceNode::SecurityGroup(group) => group.referenced_groups().cloned().collect(),
            ResourceNode::SubnetGroup(_) => BTreeSet::new(),
            ResourceNode::CacheCluster(cluster) => cluster.references().into_iter().collect(),
            ResourceNode::BastionHost(host) => host.references().into_iter().collect(),
        }
    }

    /// The node's own invariants against the looked-up network
    pub fn validate(&self, network: &NetworkRef) -> ValidationResult {
        invariants::validate_same_network(self.logical_id(), network.id(), self.network())?;

        match self {
            ResourceNode::SecurityGroup(group) => group.validate(),
            ResourceNode::SubnetGroup(group) => group.validate_against(network),
            ResourceNode::CacheCluster(cluster) => cluster.validate(),
            ResourceNode::BastionHost(host) => host.validate(),
        }
    }
}

/// Desired state of a whole stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    stack_name: StackName,
    environment: Environment,
    variant: StackVariant,
    network: NetworkRef,
    resources: BTreeMap<LogicalId, ResourceNode>,
    outputs: Vec<OutputBinding>,
}

impl ResourceGraph {
    /// Empty graph for a stack; only the network reference
    pub fn new(stack_name: StackName, environment: Environment, network: NetworkRef) -> Self {
        Self {
            stack_name,
            environment,
            variant: StackVariant::NetworkOnly,
            network,
            resources: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    /// Build and validate the graph `config` describes
    ///
    /// # Errors
    /// - `NetworkMismatch` if `network` is not the one `config` names
    /// - `InvalidNodeCount`, `EmptyPlacement`, `PolicyViolation` from the builders
    pub fn build(config: &StackConfig, network: &NetworkRef) -> Result<Self, ValidationError> {
        invariants::validate_same_network(
            &LogicalId::new(naming::NETWORK)?,
            &config.network_id,
            network.id(),
        )?;
        config.validate()?;

        let mut graph = Self::new(
            config.stack_name.clone(),
            config.environment(),
            network.clone(),
        );
        if config.variant == StackVariant::NetworkOnly {
            return Ok(graph);
        }
        graph.variant = StackVariant::Full;

        let policy = SecurityPolicy::build(network, config.engine.default_port())?;

        let subnet_group = SubnetGroup::from_network(
            LogicalId::new(naming::SUBNET_GROUP)?,
            naming::SUBNET_GROUP_DESCRIPTION,
            network,
            SubnetSelection::public(),
        )?;

        let cache_cluster = CacheCluster::new(
            LogicalId::new(naming::CACHE_CLUSTER)?,
            &config.cache_settings(),
            &subnet_group,
            &policy.cache,
        )?;

        let bastion_host = BastionHost::new(
            LogicalId::new(naming::BASTION_HOST)?,
            naming::BASTION_INSTANCE_NAME,
            network,
            SubnetSelection::public(),
            &policy.bastion,
        )?;

        graph.outputs = standard_bindings(cache_cluster.logical_id(), bastion_host.logical_id());

        graph.insert(ResourceNode::SecurityGroup(policy.cache.into_spec()))?;
        graph.insert(ResourceNode::SecurityGroup(policy.bastion.into_spec()))?;
        graph.insert(ResourceNode::SubnetGroup(subnet_group))?;
        graph.insert(ResourceNode::CacheCluster(cache_cluster))?;
        graph.insert(ResourceNode::BastionHost(bastion_host))?;

        graph.validate()?;
        Ok(graph)
    }

    /// Add a node
    ///
    /// # Errors
    /// - `DuplicateLogicalId` if the id is already taken
    pub fn insert(&mut self, node: ResourceNode) -> ValidationResult {
        let id = node.logical_id().clone();
        if self.resources.contains_key(&id) {
            return Err(ValidationError::DuplicateLogicalId(id));
        }
        self.resources.insert(id, node);
        Ok(())
    }

    pub fn stack_name(&self) -> &StackName {
        &self.stack_name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn variant(&self) -> StackVariant {
        self.variant
    }

    pub fn network(&self) -> &NetworkRef {
        &self.network
    }

    pub fn resources(&self) -> &BTreeMap<LogicalId, ResourceNode> {
        &self.resources
    }

    pub fn get(&self, id: &LogicalId) -> Option<&ResourceNode> {
        self.resources.get(id)
    }

    pub fn outputs(&self) -> &[OutputBinding] {
        &self.outputs
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Check every invariant over the finished graph
    ///
    /// Applies to graphs that did not come from [`ResourceGraph::build`]
    /// too, such as one deserialized from a previous run.
    pub fn validate(&self) -> ValidationResult {
        for node in self.resources.values() {
            node.validate(&self.network)?;
            self.validate_references(node)?;
        }

        for binding in &self.outputs {
            if !self.resources.contains_key(&binding.resource) {
                return Err(ValidationError::DanglingReference {
                    resource: LogicalId::from_static(binding.key.as_str()),
                    reference: binding.resource.clone(),
                });
            }
        }

        self.topological_order().map(|_| ())
    }

    fn validate_references(&self, node: &ResourceNode) -> ValidationResult {
        for reference in node.dependencies() {
            if !self.resources.contains_key(&reference) {
                return Err(ValidationError::DanglingReference {
                    resource: node.logical_id().clone(),
                    reference,
                });
            }
        }

        match node {
            ResourceNode::CacheCluster(cluster) => {
                let subnet_group = &cluster.subnet_group().logical_id;
                if !matches!(self.get(subnet_group), Some(ResourceNode::SubnetGroup(_))) {
                    return Err(ValidationError::DanglingReference {
                        resource: cluster.logical_id().clone(),
                        reference: subnet_group.clone(),
                    });
                }
                for group in cluster.security_groups() {
                    self.validate_group_reference(cluster.logical_id(), group)?;
                    if group.kind != GroupKind::Cache {
                        return Err(ValidationError::PolicyViolation(format!(
                            "cache cluster {} cannot be bound to {} group {}",
                            cluster.logical_id(),
                            group.kind,
                            group.logical_id
                        )));
                    }
                    if let Some(ResourceNode::SecurityGroup(spec)) = self.get(&group.logical_id) {
                        invariants::validate_cache_access(spec, cluster.port())?;
                    }
                }
                Ok(())
            }
            ResourceNode::BastionHost(host) => {
                self.validate_group_reference(host.logical_id(), host.security_group())
            }
            ResourceNode::SecurityGroup(group) => {
                for rule in &group.ingress_rules {
                    if let Peer::SecurityGroup { group: peer } = &rule.peer {
                        self.validate_group_reference(&group.logical_id, peer)?;
                    }
                }
                Ok(())
            }
            ResourceNode::SubnetGroup(_) => Ok(()),
        }
    }

    /// A reference must name a security group of the kind it claims
    fn validate_group_reference(
        &self,
        resource: &LogicalId,
        reference: &SecurityGroupRef,
    ) -> ValidationResult {
        match self.get(&reference.logical_id) {
            Some(ResourceNode::SecurityGroup(group)) if group.kind == reference.kind => Ok(()),
            Some(ResourceNode::SecurityGroup(group)) => {
                Err(ValidationError::PolicyViolation(format!(
                    "{} references {} as a {} group but it is a {} group",
                    resource, group.logical_id, reference.kind, group.kind
                )))
            }
            _ => Err(ValidationError::DanglingReference {
                resource: resource.clone(),
                reference: reference.logical_id.clone(),
            }),
        }
    }

    /// Logical ids in dependency order, dependencies first
    ///
    /// Ties are broken by logical id, so the order is deterministic.
    /// References to ids outside the graph are ignored here.
    ///
    /// # Errors
    /// - `DependencyCycle` naming one member of a cycle
    pub fn topological_order(&self) -> Result<Vec<LogicalId>, ValidationError> {
        let mut remaining: BTreeMap<&LogicalId, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&LogicalId, Vec<&LogicalId>> = BTreeMap::new();

        for (id, node) in &self.resources {
            let mut count = 0;
            for dep in node.dependencies() {
                if let Some((dep_id, _)) = self.resources.get_key_value(&dep) {
                    dependents.entry(dep_id).or_default().push(id);
                    count += 1;
                }
            }
            remaining.insert(id, count);
        }

        let mut ready: BTreeSet<&LogicalId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.resources.len());

        while let Some(id) = ready.pop_first() {
            order.push(id.clone());
            remaining.remove(id);

            for dependent in dependents.get(id).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        match remaining.keys().next() {
            None => Ok(order),
            Some(first) => Err(ValidationError::DependencyCycle(
                self.cycle_member(&remaining)
                    .unwrap_or_else(|| (*first).clone()),
            )),
        }
    }

    /// Every unordered node still waits on another unordered node, so
    /// following those edges from any of them must revisit a node.
    fn cycle_member(&self, unordered: &BTreeMap<&LogicalId, usize>) -> Option<LogicalId> {
        let mut current = (*unordered.keys().next()?).clone();
        let mut visited = BTreeSet::new();

        while visited.insert(current.clone()) {
            let next = self
                .resources
                .get(&current)?
                .dependencies()
                .into_iter()
                .find(|dep| unordered.contains_key(dep))?;
            current = next;
        }
        Some(current)
    }

    /// Project output bindings onto resolved attributes
    pub fn emit_outputs(
        &self,
        attributes: &ResolvedAttributes,
    ) -> Result<Vec<StackOutput>, DependencyError> {
        emit_outputs(&self.outputs, attributes)
    }

    /// Deterministic, pretty-printed JSON
    pub fn to_json(&self) -> StackResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> StackResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Subnet, SubnetId, SubnetType};

    fn network() -> NetworkRef {
        NetworkRef::new(
            NetworkId::new("vpc-ea3b6581").unwrap(),
            vec![
                Subnet::new(SubnetId::new("subnet-a").unwrap(), SubnetType::Public, "us-west-2a"),
                Subnet::new(SubnetId::new("subnet-b").unwrap(), SubnetType::Public, "us-west-2b"),
                Subnet::new(
                    SubnetId::new("subnet-c").unwrap(),
                    SubnetType::PrivateIsolated,
                    "us-west-2c",
                ),
            ],
        )
    }

    fn ids(order: &[LogicalId]) -> Vec<&str> {
        order.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn test_build_full_graph() {
        let graph = ResourceGraph::build(&StackConfig::default(), &network()).unwrap();

        let kinds: Vec<(&str, ResourceKind)> = graph
            .resources()
            .iter()
            .map(|(id, node)| (id.as_str(), node.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("BastionHost", ResourceKind::BastionHost),
                ("BastionSG", ResourceKind::SecurityGroup),
                ("CacheCluster", ResourceKind::CacheCluster),
                ("RedisSG", ResourceKind::SecurityGroup),
                ("RedisSubnetGroup", ResourceKind::SubnetGroup),
            ]
        );
        assert_eq!(graph.outputs().len(), 4);
        assert_eq!(graph.variant(), StackVariant::Full);
    }

    #[test]
    fn test_topological_order_is_dependencies_first() {
        let graph = ResourceGraph::build(&StackConfig::default(), &network()).unwrap();

        assert_eq!(
            ids(&graph.topological_order().unwrap()),
            vec!["BastionSG", "BastionHost", "RedisSG", "RedisSubnetGroup", "CacheCluster"]
        );
    }

    #[test]
    fn test_network_only_graph() {
        let config = StackConfig {
            variant: StackVariant::NetworkOnly,
            ..StackConfig::default()
        };
        let graph = ResourceGraph::build(&config, &network()).unwrap();

        assert!(graph.is_empty());
        assert!(graph.outputs().is_empty());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_wrong_network_rejected() {
        let config = StackConfig {
            network_id: NetworkId::new("vpc-other").unwrap(),
            ..StackConfig::default()
        };

        assert!(matches!(
            ResourceGraph::build(&config, &network()),
            Err(ValidationError::NetworkMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_logical_id() {
        let mut graph = ResourceGraph::build(&StackConfig::default(), &network()).unwrap();
        let policy = SecurityPolicy::build(&network(), crate::domain::Port::REDIS).unwrap();

        assert_eq!(
            graph.insert(ResourceNode::SecurityGroup(policy.cache.into_spec())),
            Err(ValidationError::DuplicateLogicalId(
                LogicalId::new("RedisSG").unwrap()
            ))
        );
    }

    #[test]
    fn test_dangling_reference_detected() {
        let mut graph = ResourceGraph::build(&StackConfig::default(), &network()).unwrap();
        graph
            .resources
            .remove(&LogicalId::new("RedisSubnetGroup").unwrap());

        assert!(matches!(
            graph.validate(),
            Err(ValidationError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = ResourceGraph::build(&StackConfig::default(), &network()).unwrap();
        let bastion_sg = LogicalId::new("BastionSG").unwrap();
        let cache_ref = match graph.get(&LogicalId::new("RedisSG").unwrap()) {
            Some(ResourceNode::SecurityGroup(group)) => group.reference(),
            other => panic!("unexpected node {:?}", other),
        };

        if let Some(ResourceNode::SecurityGroup(group)) = graph.resources.get_mut(&bastion_sg) {
            group.ingress_rules.push(crate::domain::IngressRule::tcp(
                Peer::SecurityGroup { group: cache_ref },
                crate::domain::Port::SSH,
                "loop",
            ));
        }

        assert_eq!(
            graph.topological_order(),
            Err(ValidationError::DependencyCycle(bastion_sg))
        );
    }

    #[test]
    fn test_json_round_trip_is_stable() {
        let graph = ResourceGraph::build(&StackConfig::default(), &network()).unwrap();
        let json = graph.to_json().unwrap();

        let restored = ResourceGraph::from_json(&json).unwrap();
        assert_eq!(restored, graph);
        assert_eq!(restored.to_json().unwrap(), json);
        assert!(restored.validate().is_ok());
    }
}
