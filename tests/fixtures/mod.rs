// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-cache-stack
//!
//! Deterministic networks, configurations and engines shared by the
//! integration tests. Identifiers are fixed literals so graphs and their
//! JSON are reproducible across runs.

#![allow(dead_code)]

use cim_cache_stack::domain::{NetworkId, NetworkRef, Subnet, SubnetId, SubnetType};
use cim_cache_stack::{InMemoryProvisioningEngine, StackConfig, StackProvisioner, StackVariant};

pub const NETWORK_ID: &str = "vpc-ea3b6581";
pub const PUBLIC_SUBNET_A: &str = "subnet-0a1b2c3d";
pub const PUBLIC_SUBNET_B: &str = "subnet-4e5f6a7b";
pub const PRIVATE_SUBNET: &str = "subnet-8c9d0e1f";

fn subnet(id: &str, subnet_type: SubnetType, zone: &str) -> Subnet {
    Subnet::new(
        SubnetId::new(id).expect("Invalid subnet id in test fixture"),
        subnet_type,
        zone,
    )
}

pub fn network_id() -> NetworkId {
    NetworkId::new(NETWORK_ID).expect("Invalid network id in test fixture")
}

/// Two public subnets and one private subnet with egress
pub fn reference_network() -> NetworkRef {
    NetworkRef::new(
        network_id(),
        vec![
            subnet(PUBLIC_SUBNET_A, SubnetType::Public, "us-west-2a"),
            subnet(PUBLIC_SUBNET_B, SubnetType::Public, "us-west-2b"),
            subnet(PRIVATE_SUBNET, SubnetType::PrivateWithEgress, "us-west-2a"),
        ],
    )
}

/// Same network id, but only isolated private subnets
pub fn private_only_network() -> NetworkRef {
    NetworkRef::new(
        network_id(),
        vec![
            subnet("subnet-11111111", SubnetType::PrivateIsolated, "us-west-2a"),
            subnet("subnet-22222222", SubnetType::PrivateIsolated, "us-west-2b"),
        ],
    )
}

pub fn reference_config() -> StackConfig {
    StackConfig::default()
}

pub fn network_only_config() -> StackConfig {
    StackConfig {
        variant: StackVariant::NetworkOnly,
        ..StackConfig::default()
    }
}

pub fn engine_with(network: NetworkRef) -> InMemoryProvisioningEngine {
    InMemoryProvisioningEngine::new().with_network(network)
}

pub fn provisioner(config: StackConfig) -> StackProvisioner<InMemoryProvisioningEngine> {
    StackProvisioner::new(config, engine_with(reference_network()))
}
