//! Managed-object tree boundary.
//!
//! Defines [`MibInstrumentation`], the interface between the responder
//! pipeline and a loaded MIB tree. The pipeline never looks inside a
//! tree: it hands over var-binds, an operation kind, and a continuation,
//! and the tree replies through the continuation, synchronously or
//! asynchronously at its own discretion.

pub mod mem;

pub use mem::MemoryMibTree;

use mibgate_core::{PduType, VarBind};

// ---------------------------------------------------------------------------
// MibOperation
// ---------------------------------------------------------------------------

/// Operation kind a PDU maps onto at the tree boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MibOperation {
    /// Read the named objects.
    Fetch,
    /// Read the objects following the named ones in tree order.
    Iterate,
    /// Bulk variant of [`Iterate`](MibOperation::Iterate); rides the same
    /// next-object walk, repetition control stays with the protocol layer.
    Bulk,
    /// Create or update the named objects.
    Write,
}

impl MibOperation {
    /// Maps a PDU kind to its tree operation. Response PDUs are not
    /// dispatchable and yield `None`.
    #[must_use]
    pub fn from_pdu_type(pdu_type: PduType) -> Option<Self> {
        match pdu_type {
            PduType::Get => Some(MibOperation::Fetch),
            PduType::GetNext => Some(MibOperation::Iterate),
            PduType::GetBulk => Some(MibOperation::Bulk),
            PduType::Set => Some(MibOperation::Write),
            PduType::Response => None,
        }
    }

    /// Short name for log lines.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MibOperation::Fetch => "fetch",
            MibOperation::Iterate => "iterate",
            MibOperation::Bulk => "bulk",
            MibOperation::Write => "write",
        }
    }
}

// ---------------------------------------------------------------------------
// MibError
// ---------------------------------------------------------------------------

/// Error indicator a tree (or the multiplexer itself) reports alongside
/// result var-binds. Maps onto the protocol's generic-error response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MibError {
    /// Generic tree or routing failure; details are in the log, keyed by
    /// the request's callflow id.
    #[error("general error")]
    General,
    /// A write touched an object the tree refuses to modify.
    #[error("not writable")]
    NotWritable,
}

// ---------------------------------------------------------------------------
// Continuation + instrumentation trait
// ---------------------------------------------------------------------------

/// Continuation a tree invokes with result var-binds and an optional
/// error indicator. Invoked exactly once per dispatched operation.
pub type ResponseCallback = Box<dyn FnOnce(Vec<VarBind>, Option<MibError>) + Send>;

/// A loaded managed-object tree.
///
/// Implementations own their traversal machinery; the responder only
/// requires that `apply` eventually invokes `done` with the resulting
/// var-binds. Handles live behind `Arc` for the process lifetime and are
/// never mutated by the pipeline.
pub trait MibInstrumentation: Send + Sync + 'static {
    /// Applies `op` over `var_binds`, replying through `done`.
    fn apply(&self, op: MibOperation, var_binds: Vec<VarBind>, done: ResponseCallback);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdu_kinds_map_to_operations() {
        assert_eq!(
            MibOperation::from_pdu_type(PduType::Get),
            Some(MibOperation::Fetch)
        );
        assert_eq!(
            MibOperation::from_pdu_type(PduType::GetNext),
            Some(MibOperation::Iterate)
        );
        assert_eq!(
            MibOperation::from_pdu_type(PduType::GetBulk),
            Some(MibOperation::Bulk)
        );
        assert_eq!(
            MibOperation::from_pdu_type(PduType::Set),
            Some(MibOperation::Write)
        );
        assert_eq!(MibOperation::from_pdu_type(PduType::Response), None);
    }
}
