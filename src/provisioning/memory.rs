// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Provisioning Engine
//!
//! A fake cloud with deterministic attributes. Applying the same graph twice
//! yields the same endpoints, so it doubles as a dry-run backend for the
//! binary and as the engine behind the integration tests.
//!
//! Only Redis-compatible clusters are served: the attributes it reports are
//! the Redis endpoint attributes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ProvisioningEngine;
use crate::config::StackConfig;
use crate::domain::{
    Attribute, LogicalId, NetworkId, NetworkRef, Region, ResolvedAttributes, StackName, Subnet,
    SubnetId, SubnetType,
};
use crate::errors::{StackError, StackResult};
use crate::graph::{ResourceChange, ResourceGraph, ResourceKind, ResourceNode, StackDiff};

/// Address every fake bastion host receives (TEST-NET-3)
const BASTION_PUBLIC_IP: &str = "203.0.113.10";

#[derive(Debug, Default)]
struct DeployedStack {
    resources: BTreeMap<LogicalId, ResourceKind>,
    attributes: ResolvedAttributes,
}

#[derive(Debug, Default)]
struct EngineState {
    stacks: BTreeMap<StackName, DeployedStack>,
    apply_count: usize,
    destroy_count: usize,
}

/// Deterministic in-process [`ProvisioningEngine`]
#[derive(Debug, Default)]
pub struct InMemoryProvisioningEngine {
    networks: BTreeMap<NetworkId, NetworkRef>,
    fail_apply_on: Option<LogicalId>,
    state: Mutex<EngineState>,
}

impl InMemoryProvisioningEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that knows one network shaped like the reference deployment:
    /// two public subnets and one private subnet with egress
    pub fn with_reference_network(config: &StackConfig) -> Self {
        let zone = |suffix: char| format!("{}{}", config.region, suffix);
        let network = NetworkRef::new(
            config.network_id.clone(),
            vec![
                Subnet::new(
                    SubnetId::from_static("subnet-0a1b2c3d"),
                    SubnetType::Public,
                    zone('a'),
                ),
                Subnet::new(
                    SubnetId::from_static("subnet-4e5f6a7b"),
                    SubnetType::Public,
                    zone('b'),
                ),
                Subnet::new(
                    SubnetId::from_static("subnet-8c9d0e1f"),
                    SubnetType::PrivateWithEgress,
                    zone('a'),
                ),
            ],
        );
        Self::new().with_network(network)
    }

    pub fn with_network(mut self, network: NetworkRef) -> Self {
        self.networks.insert(network.id().clone(), network);
        self
    }

    /// Make every apply that touches `resource` fail
    pub fn fail_apply_on(mut self, resource: LogicalId) -> Self {
        self.fail_apply_on = Some(resource);
        self
    }

    /// Number of apply calls received
    pub async fn apply_count(&self) -> usize {
        self.state.lock().await.apply_count
    }

    pub async fn destroy_count(&self) -> usize {
        self.state.lock().await.destroy_count
    }

    /// Logical ids currently deployed for `stack`, sorted
    pub async fn deployed_resources(&self, stack: &StackName) -> Vec<LogicalId> {
        self.state
            .lock()
            .await
            .stacks
            .get(stack)
            .map(|deployed| deployed.resources.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn attributes_for(node: &ResourceNode, stack: &StackName, region: &Region) -> Vec<(Attribute, String)> {
        match node {
            ResourceNode::CacheCluster(cluster) => vec![
                (
                    Attribute::RedisEndpointAddress,
                    format!(
                        "{}-{}.{}.{}.cache.amazonaws.com",
                        stack.as_str().to_lowercase(),
                        cluster.logical_id().as_str().to_lowercase(),
                        cluster.engine(),
                        region
                    ),
                ),
                (
                    Attribute::RedisEndpointPort,
                    cluster.port().value().to_string(),
                ),
            ],
            ResourceNode::BastionHost(_) => vec![
                (Attribute::PublicIp, BASTION_PUBLIC_IP.to_string()),
                (
                    Attribute::PublicDnsName,
                    format!(
                        "ec2-{}.{}.compute.amazonaws.com",
                        BASTION_PUBLIC_IP.replace('.', "-"),
                        region
                    ),
                ),
            ],
            ResourceNode::SecurityGroup(_) | ResourceNode::SubnetGroup(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl ProvisioningEngine for InMemoryProvisioningEngine {
    async fn lookup_network(&self, id: &NetworkId) -> StackResult<NetworkRef> {
        debug!("Looking up network {}", id);
        self.networks
            .get(id)
            .cloned()
            .ok_or_else(|| StackError::NotFound(format!("network {}", id)))
    }

    async fn apply(
        &self,
        graph: &ResourceGraph,
        diff: &StackDiff,
    ) -> StackResult<ResolvedAttributes> {
        if !self.networks.contains_key(graph.network().id()) {
            return Err(StackError::NotFound(format!(
                "network {}",
                graph.network().id()
            )));
        }

        for planned in diff.actionable() {
            if let Some(ResourceNode::CacheCluster(cluster)) = graph.get(&planned.logical_id) {
                if !cluster.engine().speaks_redis() {
                    return Err(StackError::Apply {
                        resource: planned.logical_id.to_string(),
                        cause: format!(
                            "{} engine is not served in memory, only redis-compatible engines are",
                            cluster.engine()
                        ),
                    });
                }
            }
        }

        let mut state = self.state.lock().await;
        state.apply_count += 1;

        let stack_name = graph.stack_name().clone();
        let region = graph.environment().region.clone();
        let deployed = state.stacks.entry(stack_name.clone()).or_default();

        for planned in diff.actionable() {
            if self.fail_apply_on.as_ref() == Some(&planned.logical_id) {
                return Err(StackError::Apply {
                    resource: planned.logical_id.to_string(),
                    cause: "injected failure".to_string(),
                });
            }

            match planned.change {
                ResourceChange::Create | ResourceChange::Update => {
                    let node = graph.get(&planned.logical_id).ok_or_else(|| {
                        StackError::Apply {
                            resource: planned.logical_id.to_string(),
                            cause: "not present in the desired graph".to_string(),
                        }
                    })?;

                    deployed.attributes.remove_resource(&planned.logical_id);
                    for (attribute, value) in Self::attributes_for(node, &stack_name, &region) {
                        deployed
                            .attributes
                            .insert(planned.logical_id.clone(), attribute, value);
                    }
                    deployed
                        .resources
                        .insert(planned.logical_id.clone(), node.kind());
                }
                ResourceChange::Delete => {
                    deployed.resources.remove(&planned.logical_id);
                    deployed.attributes.remove_resource(&planned.logical_id);
                }
                ResourceChange::NoOp => {}
            }
            debug!("{} {} {}", planned.change, planned.kind, planned.logical_id);
        }

        info!(
            "Applied {} changes to stack {}",
            diff.actionable().count(),
            stack_name
        );
        Ok(deployed.attributes.clone())
    }

    async fn destroy(&self, stack: &StackName) -> StackResult<()> {
        let mut state = self.state.lock().await;
        state.destroy_count += 1;

        match state.stacks.remove(stack) {
            Some(deployed) => info!(
                "Destroyed stack {} ({} resources)",
                stack,
                deployed.resources.len()
            ),
            None => debug!("Stack {} was not deployed", stack),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CacheEngine;

    fn setup() -> (StackConfig, InMemoryProvisioningEngine) {
        let config = StackConfig::default();
        let engine = InMemoryProvisioningEngine::with_reference_network(&config);
        (config, engine)
    }

    #[tokio::test]
    async fn test_lookup_known_and_unknown_network() {
        let (config, engine) = setup();

        let network = engine.lookup_network(&config.network_id).await.unwrap();
        assert_eq!(network.subnets_of_type(SubnetType::Public).count(), 2);

        let missing = NetworkId::new("vpc-missing").unwrap();
        assert!(matches!(
            engine.lookup_network(&missing).await,
            Err(StackError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_resolves_attributes() {
        let (config, engine) = setup();
        let network = engine.lookup_network(&config.network_id).await.unwrap();
        let graph = ResourceGraph::build(&config, &network).unwrap();
        let diff = graph.diff(None).unwrap();

        let attributes = engine.apply(&graph, &diff).await.unwrap();

        let cache = LogicalId::new("CacheCluster").unwrap();
        let bastion = LogicalId::new("BastionHost").unwrap();
        assert_eq!(
            attributes.get(&cache, Attribute::RedisEndpointAddress),
            Some("redisstack-cachecluster.redis.us-west-2.cache.amazonaws.com")
        );
        assert_eq!(attributes.get(&cache, Attribute::RedisEndpointPort), Some("6379"));
        assert_eq!(attributes.get(&bastion, Attribute::PublicIp), Some("203.0.113.10"));
        assert_eq!(
            attributes.get(&bastion, Attribute::PublicDnsName),
            Some("ec2-203-0-113-10.us-west-2.compute.amazonaws.com")
        );
        assert_eq!(engine.deployed_resources(&config.stack_name).await.len(), 5);
    }

    #[tokio::test]
    async fn test_injected_failure_names_resource() {
        let config = StackConfig::default();
        let engine = InMemoryProvisioningEngine::with_reference_network(&config)
            .fail_apply_on(LogicalId::new("BastionHost").unwrap());
        let network = engine.lookup_network(&config.network_id).await.unwrap();
        let graph = ResourceGraph::build(&config, &network).unwrap();

        let result = engine.apply(&graph, &graph.diff(None).unwrap()).await;

        match result {
            Err(StackError::Apply { resource, .. }) => assert_eq!(resource, "BastionHost"),
            other => panic!("expected apply error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_memcached_cluster_is_rejected_before_any_change() {
        let config = StackConfig {
            engine: CacheEngine::Memcached,
            ..StackConfig::default()
        };
        let engine = InMemoryProvisioningEngine::with_reference_network(&config);
        let network = engine.lookup_network(&config.network_id).await.unwrap();
        let graph = ResourceGraph::build(&config, &network).unwrap();

        let result = engine.apply(&graph, &graph.diff(None).unwrap()).await;

        match result {
            Err(StackError::Apply { resource, cause }) => {
                assert_eq!(resource, "CacheCluster");
                assert!(cause.contains("memcached"));
            }
            other => panic!("expected apply error, got {:?}", other),
        }
        assert!(engine.deployed_resources(&config.stack_name).await.is_empty());
        assert_eq!(engine.apply_count().await, 0);
    }

    #[tokio::test]
    async fn test_valkey_cluster_reports_redis_endpoint() {
        let config = StackConfig {
            engine: CacheEngine::Valkey,
            ..StackConfig::default()
        };
        let engine = InMemoryProvisioningEngine::with_reference_network(&config);
        let network = engine.lookup_network(&config.network_id).await.unwrap();
        let graph = ResourceGraph::build(&config, &network).unwrap();

        let attributes = engine.apply(&graph, &graph.diff(None).unwrap()).await.unwrap();

        let cache = LogicalId::new("CacheCluster").unwrap();
        assert_eq!(attributes.get(&cache, Attribute::RedisEndpointPort), Some("6379"));
    }

    #[tokio::test]
    async fn test_destroy_removes_stack() {
        let (config, engine) = setup();
        let network = engine.lookup_network(&config.network_id).await.unwrap();
        let graph = ResourceGraph::build(&config, &network).unwrap();
        engine.apply(&graph, &graph.diff(None).unwrap()).await.unwrap();

        engine.destroy(&config.stack_name).await.unwrap();

        assert!(engine.deployed_resources(&config.stack_name).await.is_empty());
        assert_eq!(engine.destroy_count().await, 1);
    }
}
