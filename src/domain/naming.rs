// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical ids and descriptions of the resources in a cache stack

pub const NETWORK: &str = "VPC";

pub const CACHE_SECURITY_GROUP: &str = "RedisSG";
pub const CACHE_SECURITY_GROUP_DESCRIPTION: &str = "Security group for Redis cluster";

pub const BASTION_SECURITY_GROUP: &str = "BastionSG";
pub const BASTION_SECURITY_GROUP_DESCRIPTION: &str = "Security group for Bastion Host";

pub const SSH_RULE_DESCRIPTION: &str = "Allow SSH access";
pub const CACHE_RULE_DESCRIPTION: &str = "Allow Redis access from Bastion";

pub const SUBNET_GROUP: &str = "RedisSubnetGroup";
pub const SUBNET_GROUP_DESCRIPTION: &str = "Subnet group for Redis cluster";

pub const CACHE_CLUSTER: &str = "CacheCluster";

pub const BASTION_HOST: &str = "BastionHost";
pub const BASTION_INSTANCE_NAME: &str = "Redis-Bastion";
