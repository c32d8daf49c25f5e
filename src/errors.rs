// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for stack construction and provisioning

use thiserror::Error;

use crate::domain::{Attribute, LogicalId, StackName, ValidationError};
use crate::state_machine::TransitionError;

/// Errors raised when a resource attribute is read out of dependency order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// Attribute read before the owning resource reached `Applied`
    #[error("Attribute {attribute} of {resource} is not resolved")]
    UnresolvedAttribute {
        resource: LogicalId,
        attribute: Attribute,
    },

    /// No desired-state graph has been built for this stack yet
    #[error("No resource graph has been synthesized for stack {0}")]
    GraphNotBuilt(StackName),
}

/// Errors that can occur while building or provisioning a stack
#[derive(Debug, Error)]
pub enum StackError {
    /// Invariant violation detected before any apply
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Dependency ordering bug
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// Resource lifecycle transition rejected
    #[error("Lifecycle error for {resource}: {source}")]
    Lifecycle {
        resource: LogicalId,
        #[source]
        source: TransitionError,
    },

    /// Referenced external resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provisioning engine failed to apply a resource
    #[error("Apply failed for {resource}: {cause}")]
    Apply { resource: String, cause: String },

    /// Provisioning engine failed to tear down the stack
    #[error("Destroy failed for stack {stack}: {cause}")]
    Destroy { stack: StackName, cause: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// NATS transport error
    #[error("NATS error: {0}")]
    Nats(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Result type for stack operations
pub type StackResult<T> = Result<T, StackError>;

impl From<async_nats::Error> for StackError {
    fn from(err: async_nats::Error) -> Self {
        StackError::Nats(err.to_string())
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_converts() {
        let err: StackError = ValidationError::InvalidNodeCount(3).into();
        assert!(matches!(
            err,
            StackError::Validation(ValidationError::InvalidNodeCount(3))
        ));
        assert!(err.to_string().contains("Invalid node count: 3"));
    }

    #[test]
    fn test_unresolved_attribute_names_resource() {
        let err = DependencyError::UnresolvedAttribute {
            resource: LogicalId::new("CacheCluster").unwrap(),
            attribute: Attribute::RedisEndpointAddress,
        };
        let message = StackError::from(err).to_string();
        assert!(message.contains("CacheCluster"));
        assert!(message.contains("redis_endpoint_address"));
    }
}
