//! `MibGate` Core: OID/PDU data model, classification keys, and macro
//! expansion shared by the responder pipeline.

pub mod context;
pub mod macros;
pub mod pdu;
pub mod types;

pub use context::{CallflowId, ClassificationKey, RequestAttributes, RequestContext};
pub use macros::{expand_macro, expand_macros, expand_str, MacroContext};
pub use pdu::{Pdu, PduType};
pub use types::{
    EngineId, Oid, ParseOidError, SecurityLevel, SecurityModel, TransportDomain, Value, VarBind,
};
