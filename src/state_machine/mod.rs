// Copyright (c) 2025 - Cowboy AI, Inc.
//! Finite State Machine Abstractions
//!
//! Generic state machine types used to track each stack resource from
//! declaration to teardown. Transitions are pure functions; recording them
//! with a timestamp is left to [`StateMachineWithHistory`].
//!
//! Machines here are Mealy machines: the output depends on both the current
//! state and the input.
//!
//! ```text
//! (State, Input) → (State, Output)
//! ```
//!
//! # Example
//!
//! ```rust
//! use cim_cache_stack::state_machine::{StateMachine, TransitionError, TransitionResult};
//!
//! #[derive(Debug, Clone, PartialEq, Eq)]
//! enum Door {
//!     Open,
//!     Closed,
//! }
//!
//! enum Push {
//!     Open,
//!     Close,
//! }
//!
//! impl StateMachine for Door {
//!     type Input = Push;
//!     type Output = ();
//!
//!     fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
//!         match (self, input) {
//!             (Door::Closed, Push::Open) => Ok((Door::Open, ())),
//!             (Door::Open, Push::Close) => Ok((Door::Closed, ())),
//!             _ => Err(TransitionError::InvalidTransition {
//!                 from: format!("{:?}", self),
//!                 to: "same state".to_string(),
//!             }),
//!         }
//!     }
//! }
//!
//! assert!(Door::Closed.can_transition(&Push::Open));
//! assert!(!Door::Closed.can_transition(&Push::Close));
//! ```

pub mod resource_lifecycle;

pub use resource_lifecycle::{LifecycleCommand, ResourceStatus, TransitionOutput};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition from current state to target state is not allowed
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Precondition not met for transition
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Business rule prevents transition
    #[error("Business rule violated: {0}")]
    BusinessRuleViolation(String),
}

/// Finite state machine with typed states, inputs and outputs
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Output produced by a transition (use `()` if none)
    type Output;

    /// Attempt a transition
    ///
    /// # Returns
    /// - `Ok((new_state, output))` if the transition is allowed
    /// - `Err(TransitionError)` otherwise
    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    /// Check a transition without performing it
    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }

    /// Inputs accepted from the current state, if enumerable
    fn valid_inputs(&self) -> Vec<Self::Input>
    where
        Self::Input: Clone,
    {
        Vec::new()
    }
}

/// One recorded transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition<S, I> {
    pub from: S,
    pub to: S,
    pub input: I,
    pub timestamp: DateTime<Utc>,
}

impl<S, I> Transition<S, I> {
    pub fn new(from: S, to: S, input: I, timestamp: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            input,
            timestamp,
        }
    }
}

/// State machine that keeps an audit trail of its transitions
///
/// Rejected transitions leave both the state and the history untouched.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "FSM: Serialize, FSM::Input: Serialize"))]
pub struct StateMachineWithHistory<FSM: StateMachine> {
    pub current: FSM,
    pub history: Vec<Transition<FSM, FSM::Input>>,
}

impl<FSM: StateMachine> StateMachineWithHistory<FSM> {
    pub fn new(initial: FSM) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    /// Transition and record it at `timestamp`
    pub fn transition_with_history(
        &mut self,
        input: FSM::Input,
        timestamp: DateTime<Utc>,
    ) -> TransitionResult<FSM::Output> {
        let (to, output) = self.current.transition(&input)?;
        let from = std::mem::replace(&mut self.current, to.clone());

        self.history.push(Transition::new(from, to, input, timestamp));
        Ok(output)
    }

    pub fn get_history(&self) -> &[Transition<FSM, FSM::Input>] {
        &self.history
    }

    pub fn current_state(&self) -> &FSM {
        &self.current
    }

    pub fn last_transition(&self) -> Option<&Transition<FSM, FSM::Input>> {
        self.history.last()
    }
}
