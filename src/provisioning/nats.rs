// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS Provisioning Transport
//!
//! [`NatsProvisioningEngine`] forwards every engine call as a JSON request on
//! a subject and waits for the reply. [`ProvisioningResponder`] is the other
//! side: it serves any local [`ProvisioningEngine`] on the same subjects.
//!
//! # Subjects
//!
//! | Subject | Request | Reply |
//! |---|---|---|
//! | `provisioning.network.lookup` | `lookup_network` | `network` |
//! | `provisioning.stack.apply` | `apply` | `applied` |
//! | `provisioning.stack.destroy` | `destroy` | `destroyed` |
//!
//! Any call may instead be answered with `failed` or `not_found`.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::ProvisioningEngine;
use crate::domain::{NetworkId, NetworkRef, ResolvedAttributes, StackName};
use crate::errors::{StackError, StackResult};
use crate::graph::{ResourceGraph, StackDiff};
use crate::nats::{NatsClient, NatsConfig};

pub const SUBJECT_NETWORK_LOOKUP: &str = "provisioning.network.lookup";
pub const SUBJECT_STACK_APPLY: &str = "provisioning.stack.apply";
pub const SUBJECT_STACK_DESTROY: &str = "provisioning.stack.destroy";

/// Wildcard covering every provisioning subject
pub const SUBJECT_ALL: &str = "provisioning.>";

/// Engine call carried over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProvisioningCommand {
    LookupNetwork { network_id: NetworkId },
    Apply { graph: ResourceGraph, diff: StackDiff },
    Destroy { stack: StackName },
}

impl ProvisioningCommand {
    pub fn subject(&self) -> &'static str {
        match self {
            ProvisioningCommand::LookupNetwork { .. } => SUBJECT_NETWORK_LOOKUP,
            ProvisioningCommand::Apply { .. } => SUBJECT_STACK_APPLY,
            ProvisioningCommand::Destroy { .. } => SUBJECT_STACK_DESTROY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    pub request_id: Uuid,
    pub command: ProvisioningCommand,
}

impl ProvisioningRequest {
    pub fn new(command: ProvisioningCommand) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            command,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProvisioningReply {
    Network { network: NetworkRef },
    Applied { attributes: ResolvedAttributes },
    Destroyed,
    Failed {
        resource: Option<String>,
        message: String,
    },
    NotFound { message: String },
}

impl ProvisioningReply {
    /// Wire form of an engine error
    pub fn from_error(err: StackError) -> Self {
        match err {
            StackError::NotFound(message) => ProvisioningReply::NotFound { message },
            StackError::Apply { resource, cause } => ProvisioningReply::Failed {
                resource: Some(resource),
                message: cause,
            },
            other => ProvisioningReply::Failed {
                resource: None,
                message: other.to_string(),
            },
        }
    }

    fn unexpected(&self, expected: &str) -> StackError {
        StackError::Deserialization(format!("expected {} reply, got {:?}", expected, self))
    }
}

/// [`ProvisioningEngine`] backed by a remote responder
pub struct NatsProvisioningEngine {
    client: NatsClient,
}

impl NatsProvisioningEngine {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }

    pub async fn connect(config: NatsConfig) -> StackResult<Self> {
        Ok(Self::new(NatsClient::new(config).await?))
    }

    async fn call(&self, command: ProvisioningCommand) -> StackResult<ProvisioningReply> {
        let subject = command.subject();
        let request = ProvisioningRequest::new(command);
        debug!("Request {} on {}", request.request_id, subject);

        self.client.request(subject, &request).await
    }
}

#[async_trait]
impl ProvisioningEngine for NatsProvisioningEngine {
    async fn lookup_network(&self, id: &NetworkId) -> StackResult<NetworkRef> {
        let reply = self
            .call(ProvisioningCommand::LookupNetwork {
                network_id: id.clone(),
            })
            .await?;

        match reply {
            ProvisioningReply::Network { network } => Ok(network),
            ProvisioningReply::NotFound { message } => Err(StackError::NotFound(message)),
            ProvisioningReply::Failed { message, .. } => Err(StackError::NotFound(format!(
                "network {}: {}",
                id, message
            ))),
            other => Err(other.unexpected("network")),
        }
    }

    async fn apply(
        &self,
        graph: &ResourceGraph,
        diff: &StackDiff,
    ) -> StackResult<ResolvedAttributes> {
        let reply = self
            .call(ProvisioningCommand::Apply {
                graph: graph.clone(),
                diff: diff.clone(),
            })
            .await?;

        match reply {
            ProvisioningReply::Applied { attributes } => Ok(attributes),
            ProvisioningReply::Failed { resource, message } => Err(StackError::Apply {
                resource: resource.unwrap_or_else(|| graph.stack_name().to_string()),
                cause: message,
            }),
            ProvisioningReply::NotFound { message } => Err(StackError::NotFound(message)),
            other => Err(other.unexpected("applied")),
        }
    }

    async fn destroy(&self, stack: &StackName) -> StackResult<()> {
        let reply = self
            .call(ProvisioningCommand::Destroy {
                stack: stack.clone(),
            })
            .await?;

        match reply {
            ProvisioningReply::Destroyed => Ok(()),
            ProvisioningReply::Failed { message, .. } | ProvisioningReply::NotFound { message } => {
                Err(StackError::Destroy {
                    stack: stack.clone(),
                    cause: message,
                })
            }
            other => Err(other.unexpected("destroyed")),
        }
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Serves a local engine to [`NatsProvisioningEngine`] clients
pub struct ProvisioningResponder<E: ProvisioningEngine> {
    engine: Arc<E>,
}

impl<E: ProvisioningEngine + 'static> ProvisioningResponder<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// Answer one request
    ///
    /// A graph received for apply is validated and its plan checked before
    /// the engine sees it.
    pub async fn handle(&self, request: ProvisioningRequest) -> ProvisioningReply {
        debug!("Handling request {}", request.request_id);

        let result = match request.command {
            ProvisioningCommand::LookupNetwork { network_id } => self
                .engine
                .lookup_network(&network_id)
                .await
                .map(|network| ProvisioningReply::Network { network }),
            ProvisioningCommand::Apply { graph, diff } => {
                match graph.validate().and_then(|()| graph.check_plan(&diff)) {
                    Ok(()) => self
                        .engine
                        .apply(&graph, &diff)
                        .await
                        .map(|attributes| ProvisioningReply::Applied { attributes }),
                    Err(e) => Err(StackError::Validation(e)),
                }
            }
            ProvisioningCommand::Destroy { stack } => self
                .engine
                .destroy(&stack)
                .await
                .map(|()| ProvisioningReply::Destroyed),
        };

        result.unwrap_or_else(|err| {
            warn!("Request {} failed: {}", request.request_id, err);
            ProvisioningReply::from_error(err)
        })
    }

    /// Serve requests until the subscription closes
    pub async fn serve(&self, client: &NatsClient) -> StackResult<()> {
        let mut subscriber = client.subscribe(SUBJECT_ALL).await?;
        info!(
            "Serving {} engine on {}",
            self.engine.name(),
            SUBJECT_ALL
        );

        while let Some(message) = subscriber.next().await {
            let Some(reply_to) = message.reply.as_ref().map(|r| r.to_string()) else {
                warn!("Dropping request on {} without reply subject", message.subject);
                continue;
            };

            let reply = match serde_json::from_slice::<ProvisioningRequest>(&message.payload) {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    error!("Failed to deserialize request on {}: {}", message.subject, e);
                    ProvisioningReply::Failed {
                        resource: None,
                        message: format!("malformed request: {}", e),
                    }
                }
            };

            if let Err(e) = client.publish(&reply_to, &reply).await {
                error!("Failed to reply on {}: {}", reply_to, e);
            }
        }

        info!("Provisioning subscription closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::provisioning::InMemoryProvisioningEngine;

    fn responder() -> (StackConfig, ProvisioningResponder<InMemoryProvisioningEngine>) {
        let config = StackConfig::default();
        let engine = InMemoryProvisioningEngine::with_reference_network(&config);
        (config, ProvisioningResponder::new(Arc::new(engine)))
    }

    async fn reference_graph(
        config: &StackConfig,
        responder: &ProvisioningResponder<InMemoryProvisioningEngine>,
    ) -> ResourceGraph {
        let network = responder
            .engine
            .lookup_network(&config.network_id)
            .await
            .unwrap();
        ResourceGraph::build(config, &network).unwrap()
    }

    #[test]
    fn test_request_wire_shape() {
        let request = ProvisioningRequest::new(ProvisioningCommand::Destroy {
            stack: StackName::new("RedisStack").unwrap(),
        });

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["command"]["type"], "destroy");
        assert_eq!(json["command"]["stack"], "RedisStack");
        assert!(json["request_id"].is_string());

        let back: ProvisioningRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_subjects() {
        let lookup = ProvisioningCommand::LookupNetwork {
            network_id: NetworkId::new("vpc-ea3b6581").unwrap(),
        };
        assert_eq!(lookup.subject(), "provisioning.network.lookup");
    }

    #[test]
    fn test_error_to_reply() {
        let reply = ProvisioningReply::from_error(StackError::Apply {
            resource: "CacheCluster".to_string(),
            cause: "quota exceeded".to_string(),
        });
        assert_eq!(
            reply,
            ProvisioningReply::Failed {
                resource: Some("CacheCluster".to_string()),
                message: "quota exceeded".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_responder_round_trip() {
        let (config, responder) = responder();

        let reply = responder
            .handle(ProvisioningRequest::new(ProvisioningCommand::LookupNetwork {
                network_id: config.network_id.clone(),
            }))
            .await;
        let network = match reply {
            ProvisioningReply::Network { network } => network,
            other => panic!("unexpected reply {:?}", other),
        };

        let graph = ResourceGraph::build(&config, &network).unwrap();
        let diff = graph.diff(None).unwrap();
        let reply = responder
            .handle(ProvisioningRequest::new(ProvisioningCommand::Apply { graph, diff }))
            .await;
        assert!(matches!(reply, ProvisioningReply::Applied { ref attributes } if !attributes.is_empty()));
    }

    #[tokio::test]
    async fn test_responder_unknown_network() {
        let (_, responder) = responder();

        let reply = responder
            .handle(ProvisioningRequest::new(ProvisioningCommand::LookupNetwork {
                network_id: NetworkId::new("vpc-missing").unwrap(),
            }))
            .await;

        assert!(matches!(reply, ProvisioningReply::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_responder_rejects_cache_group_open_to_internet() {
        let (config, responder) = responder();
        let graph = reference_graph(&config, &responder).await;
        let diff = graph.diff(None).unwrap();

        let mut json = serde_json::to_value(&graph).unwrap();
        json["resources"]["RedisSG"]["properties"]["ingress_rules"][0]["peer"] =
            serde_json::json!({"type": "cidr", "cidr": "0.0.0.0/0"});
        let open: ResourceGraph = serde_json::from_value(json).unwrap();

        let reply = responder
            .handle(ProvisioningRequest::new(ProvisioningCommand::Apply {
                graph: open,
                diff,
            }))
            .await;

        match reply {
            ProvisioningReply::Failed { resource, message } => {
                assert_eq!(resource, None);
                assert!(message.contains("Policy constraint violated"), "{}", message);
            }
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(responder.engine.apply_count().await, 0);
    }

    #[tokio::test]
    async fn test_responder_rejects_plan_for_another_graph() {
        let (config, responder) = responder();
        let graph = reference_graph(&config, &responder).await;

        let reply = responder
            .handle(ProvisioningRequest::new(ProvisioningCommand::Apply {
                graph,
                diff: StackDiff::default(),
            }))
            .await;

        assert!(
            matches!(reply, ProvisioningReply::Failed { ref message, .. } if message.contains("Plan does not match"))
        );
        assert_eq!(responder.engine.apply_count().await, 0);
    }
}
