//! Per-request attribute and context types.
//!
//! `RequestAttributes` is the read-only input handed over by the protocol
//! engine; `RequestContext` is the immutable per-request value the
//! classification resolver produces and every later pipeline stage reads.
//! Contexts are freshly allocated per request and never shared, so
//! asynchronous completions can reorder freely without aliasing state.

use std::fmt;
use std::net::IpAddr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::macros::MacroContext;
use crate::pdu::Pdu;
use crate::types::{EngineId, SecurityLevel, SecurityModel, TransportDomain};

// ---------------------------------------------------------------------------
// CallflowId
// ---------------------------------------------------------------------------

/// Fixed-width random correlation id, generated once per request and
/// carried on every log line about it. Always ten lowercase hex digits
/// (40 random bits), so log greps can rely on the width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallflowId(String);

impl CallflowId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        let bits: u64 = rand::rng().random_range(0..=0xff_ffff_ffff);
        Self(format!("{bits:010x}"))
    }

    /// Wraps a pre-rendered id (tests, replay tooling).
    #[must_use]
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RequestAttributes
// ---------------------------------------------------------------------------

/// Raw per-request attributes delivered by the protocol engine's
/// request-received extension point. Read-only input to classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAttributes {
    /// Engine instance that received the request.
    pub engine_id: EngineId,
    pub transport_domain: TransportDomain,
    pub peer_address: IpAddr,
    pub peer_port: u16,
    pub bind_address: IpAddr,
    pub bind_port: u16,
    pub security_model: SecurityModel,
    pub security_level: SecurityLevel,
    pub security_name: String,
    pub context_engine_id: EngineId,
    pub context_name: String,
    /// Decoded request PDU.
    pub pdu: Pdu,
    /// Security engine id resolved by a prior security-layer pass, when
    /// one ran (USM). Absent for community-based models.
    pub security_engine_id: Option<EngineId>,
}

impl RequestAttributes {
    /// Peer classification composite: `peerAddr:peerPort#bindAddr:bindPort`.
    #[must_use]
    pub fn peer_composite(&self) -> String {
        format!(
            "{}:{}#{}:{}",
            self.peer_address, self.peer_port, self.bind_address, self.bind_port
        )
    }

    /// Context classification composite: `contextEngineId#contextName`.
    #[must_use]
    pub fn context_composite(&self) -> String {
        format!("{}#{}", self.context_engine_id, self.context_name)
    }

    /// Seeds a macro context with this request's attribute fields, under
    /// the binding names emitted identifiers may reference.
    #[must_use]
    pub fn macro_context(&self) -> MacroContext {
        let mut ctx = MacroContext::new();
        ctx.set("snmp-engine-id", &self.engine_id);
        ctx.set("snmp-transport-domain", self.transport_domain);
        ctx.set("snmp-peer-address", self.peer_address);
        ctx.set("snmp-peer-port", self.peer_port);
        ctx.set("snmp-bind-address", self.bind_address);
        ctx.set("snmp-bind-port", self.bind_port);
        ctx.set("snmp-security-model", self.security_model);
        ctx.set("snmp-security-level", self.security_level);
        ctx.set("snmp-security-name", &self.security_name);
        ctx.set("snmp-context-engine-id", &self.context_engine_id);
        ctx.set("snmp-context-name", &self.context_name);
        ctx
    }
}

// ---------------------------------------------------------------------------
// ClassificationKey
// ---------------------------------------------------------------------------

/// The 4-identifier composite key routing tables are looked up by.
///
/// `None` on any axis is a distinct, valid value ("unclassified") that
/// participates in lookups exactly like a string identifier. It is never
/// a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ClassificationKey {
    pub credentials_id: Option<String>,
    pub context_id: Option<String>,
    pub peer_id: Option<String>,
    pub content_id: Option<String>,
}

impl fmt::Display for ClassificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn axis(id: Option<&String>) -> &str {
            id.map_or("<null>", String::as_str)
        }
        write!(
            f,
            "{}/{}/{}/{}",
            axis(self.credentials_id.as_ref()),
            axis(self.context_id.as_ref()),
            axis(self.peer_id.as_ref()),
            axis(self.content_id.as_ref())
        )
    }
}

// ---------------------------------------------------------------------------
// RequestContext
// ---------------------------------------------------------------------------

/// Fully resolved per-request context: attributes plus the classification
/// outcome. Immutable after construction; owned by exactly one in-flight
/// request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub callflow_id: CallflowId,
    pub attributes: RequestAttributes,
    pub key: ClassificationKey,
    /// Security engine id, defaulted to the local engine id when no
    /// security-layer pass supplied one.
    pub security_engine_id: EngineId,
    /// Ordered plugin chain resolved for this request. Empty when no
    /// routing entry matched.
    pub plugin_ids: Vec<String>,
    /// Destination tree, or `None` when no routing entry matched.
    pub tree_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
