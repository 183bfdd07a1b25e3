//! Core protocol-facing types: object identifiers, values, var-binds, and
//! the enumerated transport/security attributes that classification keys on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Oid
// ---------------------------------------------------------------------------

/// Object identifier: a dotted sequence of sub-identifiers, e.g.
/// `1.3.6.1.2.1.1.5.0`.
///
/// Ordering is lexicographic over sub-identifiers, which is exactly the
/// MIB tree traversal order required by iterate/bulk operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Creates an OID from raw sub-identifiers.
    #[must_use]
    pub fn new(arcs: Vec<u32>) -> Self {
        Self(arcs)
    }

    /// The sub-identifier sequence.
    #[must_use]
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    /// Whether `self` is a prefix of (or equal to) `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Oid) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

/// Error parsing a dotted-decimal OID string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid object identifier {input:?}")]
pub struct ParseOidError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Oid {
    type Err = ParseOidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(ParseOidError { input: s.to_string() });
        }
        trimmed
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map(Oid)
            .map_err(|_| ParseOidError { input: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Runtime value carried in a var-bind.
///
/// Covers the SMI application types plus the SNMPv2 var-bind exception
/// markers (`NoSuchObject`, `NoSuchInstance`, `EndOfMibView`), which ride
/// inside var-binds rather than being operation-level errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    OctetString(Vec<u8>),
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    /// The requested object does not exist in the tree.
    NoSuchObject,
    /// The object exists but the requested instance does not.
    NoSuchInstance,
    /// Iteration walked past the last object in the tree.
    EndOfMibView,
}

impl Value {
    /// Whether this value is one of the var-bind exception markers.
    #[must_use]
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }
}

// ---------------------------------------------------------------------------
// VarBind
// ---------------------------------------------------------------------------

/// An (object identifier, value) pair carried in a request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    /// Creates a var-bind.
    #[must_use]
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// Creates a request-side var-bind with a `Null` value.
    #[must_use]
    pub fn request(oid: Oid) -> Self {
        Self {
            oid,
            value: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport / security attributes
// ---------------------------------------------------------------------------

/// Transport domain a request arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportDomain {
    Udp4,
    Udp6,
}

impl fmt::Display for TransportDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportDomain::Udp4 => write!(f, "udp4"),
            TransportDomain::Udp6 => write!(f, "udp6"),
        }
    }
}

/// Error parsing a transport domain name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown transport domain {input:?}")]
pub struct ParseTransportDomainError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for TransportDomain {
    type Err = ParseTransportDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udp4" | "udp" => Ok(TransportDomain::Udp4),
            "udp6" => Ok(TransportDomain::Udp6),
            other => Err(ParseTransportDomainError {
                input: other.to_string(),
            }),
        }
    }
}

/// Security model a request was authenticated under.
///
/// `Display` renders the numeric model (1/2/3) so macro expansion of
/// `${snmp-security-model}` yields the same text the composite keys use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityModel {
    V1,
    V2c,
    Usm,
}

impl SecurityModel {
    /// Numeric model identifier as carried on the wire.
    #[must_use]
    pub fn as_number(self) -> u8 {
        match self {
            SecurityModel::V1 => 1,
            SecurityModel::V2c => 2,
            SecurityModel::Usm => 3,
        }
    }

    /// Community-based models share principal bookkeeping rules.
    #[must_use]
    pub fn is_community_based(self) -> bool {
        matches!(self, SecurityModel::V1 | SecurityModel::V2c)
    }
}

impl fmt::Display for SecurityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_number())
    }
}

/// Security level a request was processed at. Numeric `Display` (1/2/3),
/// matching the composite-key text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

impl SecurityLevel {
    /// Numeric level identifier.
    #[must_use]
    pub fn as_number(self) -> u8 {
        match self {
            SecurityLevel::NoAuthNoPriv => 1,
            SecurityLevel::AuthNoPriv => 2,
            SecurityLevel::AuthPriv => 3,
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_number())
    }
}

/// Identifier of a protocol engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineId(pub String);

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EngineId {
    fn from(s: &str) -> Self {
        EngineId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
