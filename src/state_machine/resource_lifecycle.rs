// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Lifecycle State Machine
//!
//! Every resource owned by a stack moves through the same lifecycle:
//!
//! ```text
//! Declared ──Validate──▶ Validated ──Apply──▶ Applied ──Update──▶ Updated
//!                                                         ▲          │
//!                                                         └─Update───┘
//!    any non-terminal state ──Destroy──▶ Destroyed (terminal)
//! ```
//!
//! Only `Applied` and `Updated` resources have attributes an output may read.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Lifecycle state of a stack resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Declared,
    Validated,
    Applied,
    Updated,
    Destroyed,
}

impl ResourceStatus {
    /// Whether the provisioning engine has reported attributes for this state
    pub fn has_resolved_attributes(&self) -> bool {
        matches!(self, ResourceStatus::Applied | ResourceStatus::Updated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceStatus::Destroyed)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceStatus::Declared => "declared",
            ResourceStatus::Validated => "validated",
            ResourceStatus::Applied => "applied",
            ResourceStatus::Updated => "updated",
            ResourceStatus::Destroyed => "destroyed",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle command (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCommand {
    /// All invariants held
    Validate,

    /// Provisioning engine created the resource
    Apply,

    /// Provisioning engine changed the resource in place
    Update,

    /// Resource torn down with its stack
    Destroy,
}

/// Transition output with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutput {
    pub warnings: Vec<String>,

    /// Set when the transition discards resolved attributes
    pub invalidates_outputs: bool,
}

impl TransitionOutput {
    pub fn ok() -> Self {
        Self {
            warnings: Vec::new(),
            invalidates_outputs: false,
        }
    }

    pub fn invalidating(warning: impl Into<String>) -> Self {
        Self {
            warnings: vec![warning.into()],
            invalidates_outputs: true,
        }
    }
}

impl StateMachine for ResourceStatus {
    type Input = LifecycleCommand;
    type Output = TransitionOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use LifecycleCommand::*;
        use ResourceStatus::*;

        match (self, input) {
            (Declared, Validate) => Ok((Validated, TransitionOutput::ok())),
            (Validated, Validate) => Ok((Validated, TransitionOutput::ok())),
            (Validated, Apply) => Ok((Applied, TransitionOutput::ok())),
            (Applied | Updated, Update) => Ok((Updated, TransitionOutput::ok())),

            (Declared | Validated, Destroy) => Ok((Destroyed, TransitionOutput::ok())),
            (Applied | Updated, Destroy) => Ok((
                Destroyed,
                TransitionOutput::invalidating("Destroying a resource with resolved attributes"),
            )),

            (Declared, Apply) => Err(TransitionError::PreconditionFailed(
                "Resource must be validated before it is applied".to_string(),
            )),
            (Declared | Validated, Update) => Err(TransitionError::PreconditionFailed(
                "Resource must be applied before it is updated".to_string(),
            )),
            (Applied | Updated, Apply) => Err(TransitionError::BusinessRuleViolation(
                "Already applied".to_string(),
            )),
            (Applied | Updated, Validate) => Err(TransitionError::InvalidTransition {
                from: self.to_string(),
                to: Validated.to_string(),
            }),
            (Destroyed, _) => Err(TransitionError::InvalidTransition {
                from: Destroyed.to_string(),
                to: "any state".to_string(),
            }),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use LifecycleCommand::*;
        use ResourceStatus::*;

        match self {
            Declared => vec![Validate, Destroy],
            Validated => vec![Validate, Apply, Destroy],
            Applied | Updated => vec![Update, Destroy],
            Destroyed => Vec::new(),
        }
    }
}
