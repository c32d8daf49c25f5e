// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants
//!
//! A [`NetworkRef`] is borrowed from the cloud: it is resolved by id, never
//! created or mutated by a stack. Everything else here (CIDR blocks, ports,
//! protocols, subnet kinds) is the vocabulary security rules and placements
//! are written in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use super::identifiers::{NetworkId, SubnetId};
use super::invariants::ValidationError;

/// CIDR block used as an ingress source
///
/// Invariants:
/// - Valid IP address
/// - Prefix length present: 0-32 for IPv4, 0-128 for IPv6
///
/// # Examples
///
/// ```rust
/// use cim_cache_stack::domain::Cidr;
///
/// let cidr = Cidr::new("10.0.0.0/16").unwrap();
/// assert_eq!(cidr.prefix_length(), 16);
/// assert_eq!(Cidr::any_ipv4().to_string(), "0.0.0.0/0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    address: IpAddr,
    prefix_length: u8,
}

impl Cidr {
    /// Parse a CIDR block such as `192.168.1.0/24`
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, ValidationError> {
        let cidr = cidr.as_ref();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| ValidationError::InvalidCidr(cidr.to_string()))?;

        let address = IpAddr::from_str(addr_str)
            .map_err(|_| ValidationError::InvalidCidr(cidr.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| ValidationError::InvalidCidr(cidr.to_string()))?;

        let max_prefix = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        if prefix_length > max_prefix {
            return Err(ValidationError::InvalidCidr(cidr.to_string()));
        }

        Ok(Self {
            address,
            prefix_length,
        })
    }

    /// Every IPv4 source (`0.0.0.0/0`)
    pub fn any_ipv4() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            prefix_length: 0,
        }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    pub fn is_ipv4(&self) -> bool {
        matches!(self.address, IpAddr::V4(_))
    }

    /// A zero-length prefix matches the whole address family
    pub fn is_unrestricted(&self) -> bool {
        self.prefix_length == 0
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

impl FromStr for Cidr {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Cidr {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cidr> for String {
    fn from(value: Cidr) -> Self {
        value.to_string()
    }
}

/// TCP/UDP port number (1-65535)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    pub const SSH: Port = Port(22);
    pub const REDIS: Port = Port(6379);
    pub const MEMCACHED: Port = Port(11211);

    pub fn new(port: u16) -> Result<Self, ValidationError> {
        if port == 0 {
            return Err(ValidationError::InvalidPort(port));
        }
        Ok(Self(port))
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = ValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Port> for u16 {
    fn from(value: Port) -> Self {
        value.0
    }
}

/// Transport protocol of an ingress rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

/// Kind of subnet within a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    /// Routed to an internet gateway
    Public,
    /// Private with outbound NAT
    PrivateWithEgress,
    /// No route outside the network
    PrivateIsolated,
}

impl SubnetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetType::Public => "public",
            SubnetType::PrivateWithEgress => "private_with_egress",
            SubnetType::PrivateIsolated => "private_isolated",
        }
    }
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubnetType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(SubnetType::Public),
            "private_with_egress" => Ok(SubnetType::PrivateWithEgress),
            "private_isolated" => Ok(SubnetType::PrivateIsolated),
            other => Err(ValidationError::InvalidSubnetType(other.to_string())),
        }
    }
}

/// A subnet as reported by network lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subnet {
    pub id: SubnetId,
    pub subnet_type: SubnetType,
    pub availability_zone: String,
}

impl Subnet {
    pub fn new(
        id: SubnetId,
        subnet_type: SubnetType,
        availability_zone: impl Into<String>,
    ) -> Self {
        Self {
            id,
            subnet_type,
            availability_zone: availability_zone.into(),
        }
    }
}

/// Resolved reference to an existing network
///
/// Immutable once resolved. A stack borrows it to place resources; it never
/// owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRef {
    id: NetworkId,
    subnets: Vec<Subnet>,
}

impl NetworkRef {
    pub fn new(id: NetworkId, subnets: Vec<Subnet>) -> Self {
        Self { id, subnets }
    }

    pub fn id(&self) -> &NetworkId {
        &self.id
    }

    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    /// All subnets of the given kind, in lookup order
    pub fn subnets_of_type(&self, subnet_type: SubnetType) -> impl Iterator<Item = &Subnet> {
        self.subnets
            .iter()
            .filter(move |s| s.subnet_type == subnet_type)
    }

    pub fn contains_subnet(&self, id: &SubnetId) -> bool {
        self.subnets.iter().any(|s| &s.id == id)
    }
}
