// Copyright (c) 2025 - Cowboy AI, Inc.
//! Identifier Value Objects
//!
//! Cloud identifiers are opaque strings, but each one has a recognizable
//! shape. Every type here checks that shape on construction, so a typo in a
//! network id or region surfaces as a [`ValidationError`] while the graph is
//! being built rather than as a failed cloud call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::invariants::ValidationError;

fn invalid(kind: &'static str, value: &str) -> ValidationError {
    ValidationError::InvalidIdentifier {
        kind,
        value: value.to_string(),
    }
}

/// `{prefix}{suffix}` where the suffix is non-empty lowercase alphanumeric
fn validate_prefixed(kind: &'static str, value: &str, prefix: &str) -> Result<(), ValidationError> {
    let suffix = value
        .strip_prefix(prefix)
        .ok_or_else(|| invalid(kind, value))?;

    if suffix.is_empty()
        || !suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(invalid(kind, value));
    }
    Ok(())
}

macro_rules! string_identifier {
    ($name:ident) => {
        impl $name {
            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Known-valid literal; checked in debug builds only
            pub(crate) fn from_static(value: &'static str) -> Self {
                debug_assert!(Self::new(value).is_ok(), "invalid literal {}", value);
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// Identifier of an existing virtual network (`vpc-…`)
///
/// The network is never created by a stack; it is looked up by this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkId(String);

impl NetworkId {
    pub const PREFIX: &'static str = "vpc-";

    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        validate_prefixed("network id", &id, Self::PREFIX)?;
        Ok(Self(id))
    }
}

string_identifier!(NetworkId);

/// Identifier of a subnet inside a network (`subnet-…`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubnetId(String);

impl SubnetId {
    pub const PREFIX: &'static str = "subnet-";

    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        validate_prefixed("subnet id", &id, Self::PREFIX)?;
        Ok(Self(id))
    }
}

string_identifier!(SubnetId);

/// Logical name of a resource within a stack (e.g. `RedisSG`)
///
/// Logical ids are the only identity a resource keeps across provisioning
/// runs, so they must be stable and unambiguous.
///
/// # Invariants
/// - Starts with an ASCII letter
/// - ASCII alphanumeric only
/// - At most 255 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    pub const MAX_LENGTH: usize = 255;

    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();

        let starts_with_letter = id.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_with_letter
            || id.len() > Self::MAX_LENGTH
            || !id.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid("logical id", &id));
        }
        Ok(Self(id))
    }
}

string_identifier!(LogicalId);

/// Name of a deployable stack
///
/// # Invariants
/// - Starts with an ASCII letter
/// - ASCII alphanumeric and hyphens only
/// - At most 128 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StackName(String);

impl StackName {
    pub const MAX_LENGTH: usize = 128;

    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        let starts_with_letter = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_with_letter
            || name.len() > Self::MAX_LENGTH
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid("stack name", &name));
        }
        Ok(Self(name))
    }
}

string_identifier!(StackName);

/// Twelve-digit cloud account identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub const LENGTH: usize = 12;

    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.len() != Self::LENGTH || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("account id", &id));
        }
        Ok(Self(id))
    }
}

string_identifier!(AccountId);

/// Cloud region such as `us-west-2`
///
/// # Invariants
/// - At least three hyphen-separated segments
/// - Segments are lowercase alphanumeric
/// - Final segment is numeric
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

impl Region {
    pub fn new(region: impl Into<String>) -> Result<Self, ValidationError> {
        let region = region.into();
        let segments: Vec<&str> = region.split('-').collect();

        let well_formed = segments.len() >= 3
            && segments.iter().all(|s| {
                !s.is_empty()
                    && s.chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            })
            && segments
                .last()
                .is_some_and(|s| s.chars().all(|c| c.is_ascii_digit()));

        if !well_formed {
            return Err(invalid("region", &region));
        }
        Ok(Self(region))
    }
}

string_identifier!(Region);

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("vpc-ea3b6581" ; "hex suffix")]
    #[test_case("vpc-0a1b2c3d4e5f67890" ; "long suffix")]
    fn test_valid_network_id(id: &str) {
        assert_eq!(NetworkId::new(id).unwrap().as_str(), id);
    }

    #[test_case("" ; "empty")]
    #[test_case("vpc-" ; "missing suffix")]
    #[test_case("subnet-abc" ; "wrong prefix")]
    #[test_case("vpc-EA3B" ; "uppercase suffix")]
    fn test_invalid_network_id(id: &str) {
        assert!(matches!(
            NetworkId::new(id),
            Err(ValidationError::InvalidIdentifier { kind: "network id", .. })
        ));
    }

    #[test]
    fn test_subnet_id() {
        assert!(SubnetId::new("subnet-a").is_ok());
        assert!(SubnetId::new("subnet-0f12").is_ok());
        assert!(SubnetId::new("sub-a").is_err());
        assert!(SubnetId::new("subnet-a b").is_err());
    }

    #[test]
    fn test_logical_id() {
        assert!(LogicalId::new("RedisSG").is_ok());
        assert!(LogicalId::new("BastionHost").is_ok());
        assert!(LogicalId::new("").is_err());
        assert!(LogicalId::new("1Cache").is_err());
        assert!(LogicalId::new("Redis-SG").is_err());
        assert!(LogicalId::new("a".repeat(256)).is_err());
    }

    #[test]
    fn test_stack_name() {
        assert!(StackName::new("RedisStack").is_ok());
        assert!(StackName::new("redis-stack-dev").is_ok());
        assert!(StackName::new("-redis").is_err());
        assert!(StackName::new("redis_stack").is_err());
    }

    #[test]
    fn test_account_id() {
        assert!(AccountId::new("618537831167").is_ok());
        assert!(AccountId::new("61853783116").is_err());
        assert!(AccountId::new("61853783116x").is_err());
    }

    #[test_case("us-west-2", true)]
    #[test_case("eu-central-1", true)]
    #[test_case("us-gov-west-1", true)]
    #[test_case("us-west", false)]
    #[test_case("US-WEST-2", false)]
    #[test_case("us--2", false)]
    fn test_region(region: &str, valid: bool) {
        assert_eq!(Region::new(region).is_ok(), valid);
    }

    #[test]
    fn test_deserialize_rejects_invalid_identifier() {
        let ok: Result<NetworkId, _> = serde_json::from_str("\"vpc-ea3b6581\"");
        assert!(ok.is_ok());

        let bad: Result<NetworkId, _> = serde_json::from_str("\"not-a-vpc\"");
        assert!(bad.is_err());
    }
}
