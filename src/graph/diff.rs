// Copyright (c) 2025 - Cowboy AI, Inc.
//! Desired vs. Applied Diff
//!
//! Re-running a stack with unchanged inputs must be a no-op. [`ResourceGraph::diff`]
//! compares the desired graph with the last applied one and plans one change
//! per logical id: creates and updates in dependency order, deletes in reverse
//! dependency order of the previous graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{ResourceGraph, ResourceKind};
use crate::domain::{LogicalId, ValidationError, ValidationResult};

/// What the provisioning engine must do to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceChange {
    Create,
    Update,
    Delete,
    NoOp,
}

impl fmt::Display for ResourceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceChange::Create => "create",
            ResourceChange::Update => "update",
            ResourceChange::Delete => "delete",
            ResourceChange::NoOp => "no-op",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedChange {
    pub logical_id: LogicalId,
    pub kind: ResourceKind,
    pub change: ResourceChange,
}

/// Ordered plan for one provisioning run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDiff {
    pub changes: Vec<PlannedChange>,
}

impl StackDiff {
    /// Nothing to create, update or delete
    pub fn is_noop(&self) -> bool {
        self.changes
            .iter()
            .all(|c| c.change == ResourceChange::NoOp)
    }

    pub fn change_for(&self, id: &LogicalId) -> Option<ResourceChange> {
        self.changes
            .iter()
            .find(|c| &c.logical_id == id)
            .map(|c| c.change)
    }

    pub fn count(&self, change: ResourceChange) -> usize {
        self.changes.iter().filter(|c| c.change == change).count()
    }

    /// Changes the engine has to act on, in plan order
    pub fn actionable(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes
            .iter()
            .filter(|c| c.change != ResourceChange::NoOp)
    }

    /// Same plan with every no-op turned into an update
    ///
    /// Used when the deployed state is unknown and every kept resource must
    /// be re-applied.
    pub fn refreshed(mut self) -> Self {
        for planned in &mut self.changes {
            if planned.change == ResourceChange::NoOp {
                planned.change = ResourceChange::Update;
            }
        }
        self
    }
}

impl ResourceGraph {
    /// Plan the changes that turn `previous` into `self`
    ///
    /// With no previous graph every resource is a create.
    pub fn diff(&self, previous: Option<&ResourceGraph>) -> Result<StackDiff, ValidationError> {
        let mut changes = Vec::with_capacity(self.resources.len());

        for id in self.topological_order()? {
            let Some(node) = self.resources.get(&id) else {
                continue;
            };
            let change = match previous.and_then(|p| p.resources.get(&id)) {
                None => ResourceChange::Create,
                Some(old) if old == node => ResourceChange::NoOp,
                Some(_) => ResourceChange::Update,
            };
            changes.push(PlannedChange {
                logical_id: id,
                kind: node.kind(),
                change,
            });
        }

        if let Some(previous) = previous {
            for id in previous.topological_order()?.into_iter().rev() {
                if self.resources.contains_key(&id) {
                    continue;
                }
                if let Some(old) = previous.resources.get(&id) {
                    changes.push(PlannedChange {
                        logical_id: id,
                        kind: old.kind(),
                        change: ResourceChange::Delete,
                    });
                }
            }
        }

        Ok(StackDiff { changes })
    }

    /// Check that `diff` was planned for this graph
    ///
    /// Every resource appears exactly once as a create, update or no-op of
    /// its own kind. A delete names a resource the graph no longer holds.
    ///
    /// # Errors
    /// - `InconsistentPlan` naming the first offending change
    pub fn check_plan(&self, diff: &StackDiff) -> ValidationResult {
        let mut planned = BTreeSet::new();

        for change in &diff.changes {
            let consistent = match (self.resources.get(&change.logical_id), change.change) {
                (None, ResourceChange::Delete) => true,
                (Some(node), ResourceChange::Create | ResourceChange::Update | ResourceChange::NoOp) => {
                    node.kind() == change.kind
                }
                _ => false,
            };
            if !consistent || !planned.insert(&change.logical_id) {
                return Err(ValidationError::InconsistentPlan(format!(
                    "{} of {} {}",
                    change.change, change.kind, change.logical_id
                )));
            }
        }

        match self.resources.keys().find(|id| !planned.contains(id)) {
            Some(missing) => Err(ValidationError::InconsistentPlan(format!(
                "no change planned for {}",
                missing
            ))),
            None => Ok(()),
        }
    }
}
