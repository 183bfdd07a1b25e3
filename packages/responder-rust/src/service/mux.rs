//! Managed-object tree multiplexer.
//!
//! Terminal pipeline stage: resolves the request context's destination
//! tree and applies the PDU's operation to it, threading the caller's
//! continuation through a wrapper that logs tree-reported errors under
//! the request's callflow id. Responses flow straight back through the
//! continuation; the response-side plugin chain is not driven here.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use mibgate_core::{Pdu, RequestContext};

use crate::tree::{MibError, MibInstrumentation, MibOperation, ResponseCallback};

// ---------------------------------------------------------------------------
// TreeEntry
// ---------------------------------------------------------------------------

/// One loaded tree: its id and instrumentation handle. Created at
/// startup, immutable for the process lifetime.
#[derive(Clone)]
pub struct TreeEntry {
    pub tree_id: String,
    pub instrumentation: Arc<dyn MibInstrumentation>,
}

// ---------------------------------------------------------------------------
// MibTreeMux
// ---------------------------------------------------------------------------

/// Frozen tree-id → instrumentation map.
#[derive(Default)]
pub struct MibTreeMux {
    trees: HashMap<String, Arc<dyn MibInstrumentation>>,
}

impl MibTreeMux {
    /// Builds the multiplexer over the given loaded trees.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = TreeEntry>) -> Self {
        Self {
            trees: entries
                .into_iter()
                .map(|entry| (entry.tree_id, entry.instrumentation))
                .collect(),
        }
    }

    /// Whether a tree is loaded under `tree_id`.
    #[must_use]
    pub fn contains(&self, tree_id: &str) -> bool {
        self.trees.contains_key(tree_id)
    }

    /// Dispatches `pdu` to the context's destination tree.
    ///
    /// A request with no destination, an unknown destination, or a
    /// non-dispatchable PDU kind is answered through `done` with the
    /// request var-binds and [`MibError::General`]; no tree is touched.
    /// The error detail lands in the log keyed by the callflow id.
    pub fn dispatch(&self, ctx: &RequestContext, pdu: Pdu, done: ResponseCallback) {
        let tree = ctx
            .tree_id
            .as_deref()
            .and_then(|tree_id| self.trees.get(tree_id));
        let Some(tree) = tree else {
            warn!(
                callflow_id = %ctx.callflow_id,
                tree_id = ctx.tree_id.as_deref().unwrap_or("<null>"),
                key = %ctx.key,
                "no destination tree for request"
            );
            counter!("mibgate.mux.unrouted").increment(1);
            done(pdu.var_binds, Some(MibError::General));
            return;
        };

        let Some(op) = MibOperation::from_pdu_type(pdu.pdu_type) else {
            warn!(
                callflow_id = %ctx.callflow_id,
                pdu_type = pdu.pdu_type.token(),
                "PDU kind is not dispatchable"
            );
            counter!("mibgate.mux.unrouted").increment(1);
            done(pdu.var_binds, Some(MibError::General));
            return;
        };

        debug!(
            callflow_id = %ctx.callflow_id,
            tree_id = ctx.tree_id.as_deref().unwrap_or(""),
            operation = op.name(),
            var_binds = pdu.var_binds.len(),
            "dispatching to tree"
        );
        counter!("mibgate.mux.dispatched", "operation" => op.name()).increment(1);

        let callflow_id = ctx.callflow_id.clone();
        let wrapped: ResponseCallback = Box::new(move |var_binds, error| {
            if let Some(error) = &error {
                info!(
                    callflow_id = %callflow_id,
                    error = %error,
                    "tree reported an error"
                );
                counter!("mibgate.mux.tree_error").increment(1);
            }
            done(var_binds, error);
        });
        tree.apply(op, pdu.var_binds, wrapped);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use mibgate_core::{
        CallflowId, ClassificationKey, EngineId, Oid, PduType, RequestAttributes, SecurityLevel,
        SecurityModel, TransportDomain, Value, VarBind,
    };

    use super::*;
    use crate::tree::MemoryMibTree;

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    fn request_pdu() -> Pdu {
        Pdu::new(
            PduType::Get,
            9,
            vec![VarBind::request(oid("1.3.6.1.2.1.1.5.0"))],
        )
    }

    fn context(tree_id: Option<&str>) -> RequestContext {
        RequestContext {
            callflow_id: CallflowId::from_string("00000000ff".to_string()),
            attributes: RequestAttributes {
                engine_id: EngineId::from("engine-1"),
                transport_domain: TransportDomain::Udp4,
                peer_address: "10.0.0.1".parse().unwrap(),
                peer_port: 33161,
                bind_address: "0.0.0.0".parse().unwrap(),
                bind_port: 161,
                security_model: SecurityModel::V2c,
                security_level: SecurityLevel::NoAuthNoPriv,
                security_name: "public".to_string(),
                context_engine_id: EngineId::from("engine-1"),
                context_name: String::new(),
                pdu: request_pdu(),
                security_engine_id: None,
            },
            key: ClassificationKey::default(),
            security_engine_id: EngineId::from("engine-1"),
            plugin_ids: Vec::new(),
            tree_id: tree_id.map(ToString::to_string),
        }
    }

    fn mux_with_tree() -> MibTreeMux {
        let tree = MemoryMibTree::with_objects(vec![(
            oid("1.3.6.1.2.1.1.5.0"),
            Value::OctetString(b"host-1".to_vec()),
        )]);
        MibTreeMux::new(vec![TreeEntry {
            tree_id: "tree-1".to_string(),
            instrumentation: Arc::new(tree),
        }])
    }

    fn dispatch_sync(
        mux: &MibTreeMux,
        ctx: &RequestContext,
        pdu: Pdu,
    ) -> (Vec<VarBind>, Option<MibError>) {
        let slot = Arc::new(Mutex::new(None));
        let out = slot.clone();
        mux.dispatch(
            ctx,
            pdu,
            Box::new(move |var_binds, error| {
                *out.lock() = Some((var_binds, error));
            }),
        );
        let reply = slot.lock().take();
        reply.expect("continuation not invoked")
    }

    #[test]
    fn known_tree_serves_the_request() {
        let mux = mux_with_tree();
        let (var_binds, error) = dispatch_sync(&mux, &context(Some("tree-1")), request_pdu());
        assert_eq!(error, None);
        assert_eq!(var_binds[0].value, Value::OctetString(b"host-1".to_vec()));
    }

    #[test]
    fn missing_destination_answers_generic_error() {
        let mux = mux_with_tree();
        let pdu = request_pdu();
        let (var_binds, error) = dispatch_sync(&mux, &context(None), pdu.clone());
        assert_eq!(error, Some(MibError::General));
        // Request var-binds come back untouched.
        assert_eq!(var_binds, pdu.var_binds);
    }

    #[test]
    fn unknown_destination_answers_generic_error() {
        let mux = mux_with_tree();
        let (_, error) = dispatch_sync(&mux, &context(Some("tree-9")), request_pdu());
        assert_eq!(error, Some(MibError::General));
    }

    #[test]
    fn response_pdu_is_not_dispatchable() {
        let mux = mux_with_tree();
        let pdu = Pdu::new(PduType::Response, 9, vec![]);
        let (_, error) = dispatch_sync(&mux, &context(Some("tree-1")), pdu);
        assert_eq!(error, Some(MibError::General));
    }
}
