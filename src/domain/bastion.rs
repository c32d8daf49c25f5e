// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bastion Host Resource
//!
//! Jump host placed in the same subnet placement as the cache. Its security
//! group is statically constrained to the bastion role: the constructor only
//! accepts a `SecurityGroup<Bastion>`.

use serde::{Deserialize, Serialize};

use super::identifiers::{LogicalId, NetworkId, SubnetId};
use super::invariants::{self, ValidationError, ValidationResult};
use super::network::NetworkRef;
use super::security_group::{Bastion, SecurityGroup, SecurityGroupRef};
use super::subnet_group::SubnetSelection;

/// Desired state of the bastion host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BastionHost {
    logical_id: LogicalId,
    instance_name: String,
    network: NetworkId,
    placement: SubnetSelection,
    subnet: SubnetId,
    security_group: SecurityGroupRef,
}

impl BastionHost {
    /// Place a bastion host into the first subnet of `placement`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cim_cache_stack::domain::{
    ///     BastionHost, LogicalId, NetworkId, NetworkRef, Port, SecurityPolicy, Subnet,
    ///     SubnetId, SubnetSelection, SubnetType,
    /// };
    ///
    /// let network = NetworkRef::new(
    ///     NetworkId::new("vpc-ea3b6581").unwrap(),
    ///     vec![Subnet::new(SubnetId::new("subnet-a").unwrap(), SubnetType::Public, "us-west-2a")],
    /// );
    /// let policy = SecurityPolicy::build(&network, Port::REDIS).unwrap();
    ///
    /// let bastion = BastionHost::new(
    ///     LogicalId::new("BastionHost").unwrap(),
    ///     "Redis-Bastion",
    ///     &network,
    ///     SubnetSelection::public(),
    ///     &policy.bastion,
    /// )
    /// .unwrap();
    /// assert_eq!(bastion.security_group().logical_id.as_str(), "BastionSG");
    /// ```
    ///
    /// Binding the cache group does not compile:
    ///
    /// ```compile_fail
    /// use cim_cache_stack::domain::{
    ///     BastionHost, LogicalId, NetworkId, NetworkRef, Port, SecurityPolicy, Subnet,
    ///     SubnetId, SubnetSelection, SubnetType,
    /// };
    ///
    /// let network = NetworkRef::new(
    ///     NetworkId::new("vpc-ea3b6581").unwrap(),
    ///     vec![Subnet::new(SubnetId::new("subnet-a").unwrap(), SubnetType::Public, "us-west-2a")],
    /// );
    /// let policy = SecurityPolicy::build(&network, Port::REDIS).unwrap();
    ///
    /// let _ = BastionHost::new(
    ///     LogicalId::new("BastionHost").unwrap(),
    ///     "Redis-Bastion",
    ///     &network,
    ///     SubnetSelection::public(),
    ///     &policy.cache,
    /// );
    /// ```
    pub fn new(
        logical_id: LogicalId,
        instance_name: impl Into<String>,
        network: &NetworkRef,
        placement: SubnetSelection,
        security_group: &SecurityGroup<Bastion>,
    ) -> Result<Self, ValidationError> {
        let subnet = placement
            .resolve(network)?
            .into_iter()
            .next()
            .ok_or_else(|| ValidationError::EmptyPlacement {
                network: network.id().clone(),
                subnet_type: placement.subnet_type,
            })?;

        let host = Self {
            logical_id,
            instance_name: instance_name.into(),
            network: network.id().clone(),
            placement,
            subnet,
            security_group: security_group.reference(),
        };
        host.validate()?;
        Ok(host)
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn network(&self) -> &NetworkId {
        &self.network
    }

    pub fn placement(&self) -> SubnetSelection {
        self.placement
    }

    pub fn subnet(&self) -> &SubnetId {
        &self.subnet
    }

    pub fn security_group(&self) -> &SecurityGroupRef {
        &self.security_group
    }

    /// Runtime check of the same rules the constructor enforces by type
    pub fn validate(&self) -> ValidationResult {
        if self.instance_name.trim().is_empty() {
            return Err(ValidationError::InvalidIdentifier {
                kind: "instance name",
                value: self.instance_name.clone(),
            });
        }
        invariants::validate_bastion_binding(&self.logical_id, &self.security_group)?;
        invariants::validate_same_network(
            &self.security_group.logical_id,
            &self.network,
            &self.security_group.network,
        )
    }

    pub fn references(&self) -> Vec<LogicalId> {
        vec![self.security_group.logical_id.clone()]
    }
}
