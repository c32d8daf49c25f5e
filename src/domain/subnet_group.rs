// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subnet Placement
//!
//! A [`SubnetSelection`] names a kind of subnet; resolving it against a
//! [`NetworkRef`] yields concrete subnet ids. A [`SubnetGroup`] is the named
//! set the cache cluster is allowed to use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::identifiers::{LogicalId, NetworkId, SubnetId};
use super::invariants::{self, ValidationError, ValidationResult};
use super::network::{NetworkRef, SubnetType};

/// Which subnets of a network a resource may be placed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubnetSelection {
    pub subnet_type: SubnetType,
}

impl SubnetSelection {
    pub fn new(subnet_type: SubnetType) -> Self {
        Self { subnet_type }
    }

    pub fn public() -> Self {
        Self::new(SubnetType::Public)
    }

    /// Resolve to the matching subnet ids, sorted
    ///
    /// # Errors
    /// - `EmptyPlacement` if the network has no subnet of the selected kind
    pub fn resolve(&self, network: &NetworkRef) -> Result<BTreeSet<SubnetId>, ValidationError> {
        let ids: BTreeSet<SubnetId> = network
            .subnets_of_type(self.subnet_type)
            .map(|s| s.id.clone())
            .collect();

        if ids.is_empty() {
            return Err(ValidationError::EmptyPlacement {
                network: network.id().clone(),
                subnet_type: self.subnet_type,
            });
        }
        Ok(ids)
    }
}

/// Typed reference to a subnet group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubnetGroupRef {
    pub logical_id: LogicalId,
    pub network: NetworkId,
}

/// Named collection of subnets a managed cache may be placed into
///
/// # Invariants
/// - `subnet_ids` is non-empty
/// - Every subnet belongs to `network`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetGroup {
    name: LogicalId,
    description: String,
    network: NetworkId,
    subnet_type: SubnetType,
    subnet_ids: BTreeSet<SubnetId>,
}

impl SubnetGroup {
    /// Select every subnet of `selection`'s kind from `network`
    pub fn from_network(
        name: LogicalId,
        description: impl Into<String>,
        network: &NetworkRef,
        selection: SubnetSelection,
    ) -> Result<Self, ValidationError> {
        let subnet_ids = selection.resolve(network)?;

        Ok(Self {
            name,
            description: description.into(),
            network: network.id().clone(),
            subnet_type: selection.subnet_type,
            subnet_ids,
        })
    }

    pub fn name(&self) -> &LogicalId {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn network(&self) -> &NetworkId {
        &self.network
    }

    pub fn subnet_type(&self) -> SubnetType {
        self.subnet_type
    }

    pub fn subnet_ids(&self) -> &BTreeSet<SubnetId> {
        &self.subnet_ids
    }

    pub fn reference(&self) -> SubnetGroupRef {
        SubnetGroupRef {
            logical_id: self.name.clone(),
            network: self.network.clone(),
        }
    }

    /// Structural invariants that need no network lookup
    pub fn validate(&self) -> ValidationResult {
        if self.subnet_ids.is_empty() {
            return Err(ValidationError::EmptyPlacement {
                network: self.network.clone(),
                subnet_type: self.subnet_type,
            });
        }
        Ok(())
    }

    /// Full invariants against the resolved network
    pub fn validate_against(&self, network: &NetworkRef) -> ValidationResult {
        self.validate()?;
        invariants::validate_subnet_membership(self, network)
    }
}
