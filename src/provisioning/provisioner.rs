// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Provisioner
//!
//! Orchestrates one named stack against a [`ProvisioningEngine`]:
//!
//! 1. look up the network
//! 2. build and validate the desired graph (fails before any apply)
//! 3. diff against the last applied graph; skip the engine when nothing changed
//! 4. apply, then advance each resource's lifecycle
//! 5. project outputs from the resolved attributes
//!
//! A failed apply leaves the deployed state unknown: attributes are dropped,
//! so outputs stay unresolved, and the next deploy re-applies every resource.
//!
//! Methods take `&mut self`, so a provisioner never runs two deployments of
//! its stack at once. Serializing runs across processes is a deployment-level
//! concern.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::ProvisioningEngine;
use crate::config::StackConfig;
use crate::domain::{LogicalId, ResolvedAttributes, StackName, StackOutput};
use crate::errors::{DependencyError, StackError, StackResult};
use crate::graph::{ResourceChange, ResourceGraph, StackDiff};
use crate::state_machine::{LifecycleCommand, ResourceStatus, StateMachineWithHistory};

type Lifecycle = StateMachineWithHistory<ResourceStatus>;

/// Result of one [`StackProvisioner::deploy`] run
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub run_id: Uuid,
    pub stack_name: StackName,
    pub diff: StackDiff,
    /// Whether the engine was called; false when the diff was a no-op
    pub applied: bool,
    pub outputs: Vec<StackOutput>,
    pub completed_at: DateTime<Utc>,
}

/// Lifecycle state of every resource the stack has ever declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackStatus {
    pub stack_name: StackName,
    pub resources: BTreeMap<LogicalId, ResourceStatus>,
}

pub struct StackProvisioner<E: ProvisioningEngine> {
    config: StackConfig,
    engine: E,
    desired: Option<ResourceGraph>,
    applied: Option<ResourceGraph>,
    attributes: ResolvedAttributes,
    lifecycles: BTreeMap<LogicalId, Lifecycle>,
    /// Set when an apply failed part way
    stale: bool,
}

impl<E: ProvisioningEngine> StackProvisioner<E> {
    pub fn new(config: StackConfig, engine: E) -> Self {
        Self {
            config,
            engine,
            desired: None,
            applied: None,
            attributes: ResolvedAttributes::new(),
            lifecycles: BTreeMap::new(),
            stale: false,
        }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn stack_name(&self) -> &StackName {
        &self.config.stack_name
    }

    /// Replace the configuration used by the next run
    pub fn reconfigure(&mut self, config: StackConfig) {
        self.config = config;
    }

    pub fn desired_graph(&self) -> Option<&ResourceGraph> {
        self.desired.as_ref()
    }

    pub fn applied_graph(&self) -> Option<&ResourceGraph> {
        self.applied.as_ref()
    }

    /// Look up the network and build the desired graph
    ///
    /// Every resource of the graph ends up `Validated`, or stays `Applied`
    /// / `Updated` if an earlier run applied it.
    pub async fn synth(&mut self) -> StackResult<&ResourceGraph> {
        let network = self.engine.lookup_network(&self.config.network_id).await?;
        debug!(
            "Network {} has {} subnets",
            network.id(),
            network.subnets().len()
        );

        let graph = ResourceGraph::build(&self.config, &network)?;

        for id in graph.resources().keys() {
            let fresh = self
                .lifecycles
                .get(id)
                .map_or(true, |machine| machine.current_state().is_terminal());
            if fresh {
                self.lifecycles
                    .insert(id.clone(), Lifecycle::new(ResourceStatus::Declared));
            }
            if *self.status_of(id) == ResourceStatus::Declared {
                self.advance(id, LifecycleCommand::Validate)?;
            }
        }

        info!(
            "Synthesized stack {} ({} resources, {})",
            graph.stack_name(),
            graph.resources().len(),
            graph.variant()
        );
        Ok(&*self.desired.insert(graph))
    }

    /// Bring the deployed stack in line with the configuration
    ///
    /// # Errors
    /// - `Validation` before any engine call if an invariant fails
    /// - `Apply` from the engine; lifecycles are left where they were
    pub async fn deploy(&mut self) -> StackResult<DeploymentReport> {
        let run_id = Uuid::now_v7();
        info!("Deploy {} of stack {} via {}", run_id, self.stack_name(), self.engine.name());

        self.synth().await?;
        let desired = self
            .desired
            .clone()
            .ok_or_else(|| DependencyError::GraphNotBuilt(self.config.stack_name.clone()))?;
        let mut diff = desired.diff(self.applied.as_ref())?;
        if self.stale {
            warn!(
                "Last apply of stack {} failed, re-applying every resource",
                self.stack_name()
            );
            diff = diff.refreshed();
        }

        let applied = !diff.is_noop();
        if applied {
            info!(
                "Applying {} create, {} update, {} delete",
                diff.count(ResourceChange::Create),
                diff.count(ResourceChange::Update),
                diff.count(ResourceChange::Delete)
            );
            match self.engine.apply(&desired, &diff).await {
                Ok(attributes) => self.attributes = attributes,
                Err(e) => {
                    error!("Deploy {} failed: {}", run_id, e);
                    self.attributes = ResolvedAttributes::new();
                    self.stale = true;
                    return Err(e);
                }
            }
            self.stale = false;
            self.record_changes(&diff)?;
        } else {
            info!("Stack {} is up to date", self.stack_name());
        }
        self.applied = Some(desired);

        let outputs = self.outputs()?;
        Ok(DeploymentReport {
            run_id,
            stack_name: self.config.stack_name.clone(),
            diff,
            applied,
            outputs,
            completed_at: Utc::now(),
        })
    }

    fn record_changes(&mut self, diff: &StackDiff) -> StackResult<()> {
        for planned in diff.actionable() {
            let command = match planned.change {
                ResourceChange::Create => LifecycleCommand::Apply,
                ResourceChange::Update => LifecycleCommand::Update,
                ResourceChange::Delete => LifecycleCommand::Destroy,
                ResourceChange::NoOp => continue,
            };
            self.advance(&planned.logical_id, command)?;
        }
        Ok(())
    }

    /// Outputs of the current stack
    ///
    /// # Errors
    /// - `GraphNotBuilt` before the first synth
    /// - `UnresolvedAttribute` for any output whose resource is not applied
    pub fn outputs(&self) -> StackResult<Vec<StackOutput>> {
        let graph = self
            .applied
            .as_ref()
            .or(self.desired.as_ref())
            .ok_or_else(|| DependencyError::GraphNotBuilt(self.config.stack_name.clone()))?;

        for binding in graph.outputs() {
            let resolved = self
                .lifecycles
                .get(&binding.resource)
                .is_some_and(|machine| machine.current_state().has_resolved_attributes());
            if !resolved {
                return Err(DependencyError::UnresolvedAttribute {
                    resource: binding.resource.clone(),
                    attribute: binding.attribute,
                }
                .into());
            }
        }

        Ok(graph.emit_outputs(&self.attributes)?)
    }

    /// Tear down the whole stack and invalidate its outputs
    pub async fn destroy(&mut self) -> StackResult<()> {
        info!("Destroying stack {}", self.stack_name());
        self.engine.destroy(&self.config.stack_name).await?;

        let ids: Vec<LogicalId> = self
            .lifecycles
            .iter()
            .filter(|(_, machine)| !machine.current_state().is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            self.advance(id, LifecycleCommand::Destroy)?;
        }

        self.applied = None;
        self.attributes = ResolvedAttributes::new();
        self.stale = false;
        info!("Stack {} destroyed ({} resources)", self.stack_name(), ids.len());
        Ok(())
    }

    pub fn status(&self) -> StackStatus {
        StackStatus {
            stack_name: self.config.stack_name.clone(),
            resources: self
                .lifecycles
                .iter()
                .map(|(id, machine)| (id.clone(), *machine.current_state()))
                .collect(),
        }
    }

    pub fn lifecycle(&self, id: &LogicalId) -> Option<&Lifecycle> {
        self.lifecycles.get(id)
    }

    fn status_of(&self, id: &LogicalId) -> &ResourceStatus {
        self.lifecycles
            .get(id)
            .map(Lifecycle::current_state)
            .unwrap_or(&ResourceStatus::Declared)
    }

    fn advance(&mut self, id: &LogicalId, command: LifecycleCommand) -> StackResult<()> {
        let machine = self
            .lifecycles
            .entry(id.clone())
            .or_insert_with(|| Lifecycle::new(ResourceStatus::Declared));

        let output = machine
            .transition_with_history(command, Utc::now())
            .map_err(|source| StackError::Lifecycle {
                resource: id.clone(),
                source,
            })?;

        debug!("{} is now {}", id, machine.current_state());

        for warning in &output.warnings {
            warn!("{}: {}", id, warning);
        }
        if output.invalidates_outputs {
            self.attributes.remove_resource(id);
        }
        Ok(())
    }
}
