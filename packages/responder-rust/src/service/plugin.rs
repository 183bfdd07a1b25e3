//! Plugin registry and chain executor.
//!
//! Plugins are statically registered observers/transformers threaded
//! between classification and tree dispatch. A chain run hands each
//! plugin the current PDU and a shared scratch map; the returned status
//! drives a small state machine deciding whether the next plugin runs,
//! the chain short-circuits into dispatch, or the request is answered or
//! discarded without touching any tree.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, error};

use mibgate_core::{Pdu, RequestContext};

use super::config::SetupError;
use super::registry::EngineHandle;

// ---------------------------------------------------------------------------
// PluginStatus / scratch
// ---------------------------------------------------------------------------

/// Verdict a plugin returns alongside the (possibly rewritten) PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    /// Continue with the next plugin in the chain.
    Next,
    /// Stop the chain and proceed to dispatch with the current PDU.
    Break,
    /// Discard the request; no tree is consulted, no plugin output is
    /// used for the response.
    Drop,
    /// Answer immediately with the current PDU's var-binds; no tree is
    /// consulted.
    Respond,
}

/// Per-chain-run scratch shared by every plugin in the chain. Dropped
/// when the run ends; never visible across requests.
pub type PluginScratch = HashMap<String, JsonValue>;

// ---------------------------------------------------------------------------
// Plugin trait
// ---------------------------------------------------------------------------

/// A request-processing plugin.
///
/// All four hooks default to passing the PDU through unchanged, so an
/// implementation only overrides the traffic directions it cares about.
/// Implementations must not block; they run inline on the serving path.
#[allow(unused_variables)]
pub trait Plugin: Send + Sync + 'static {
    /// Command-class request passing through (the wired direction).
    fn process_command_request(
        &self,
        plugin_id: &str,
        engine: &EngineHandle,
        pdu: Pdu,
        ctx: &RequestContext,
        scratch: &mut PluginScratch,
    ) -> (PluginStatus, Pdu) {
        (PluginStatus::Next, pdu)
    }

    /// Command-class response passing through. Individually callable;
    /// the tree multiplexer does not currently drive this direction.
    fn process_command_response(
        &self,
        plugin_id: &str,
        engine: &EngineHandle,
        pdu: Pdu,
        ctx: &RequestContext,
        scratch: &mut PluginScratch,
    ) -> (PluginStatus, Pdu) {
        (PluginStatus::Next, pdu)
    }

    /// Notification-class request passing through.
    fn process_notification_request(
        &self,
        plugin_id: &str,
        engine: &EngineHandle,
        pdu: Pdu,
        ctx: &RequestContext,
        scratch: &mut PluginScratch,
    ) -> (PluginStatus, Pdu) {
        (PluginStatus::Next, pdu)
    }

    /// Notification-class response passing through.
    fn process_notification_response(
        &self,
        plugin_id: &str,
        engine: &EngineHandle,
        pdu: Pdu,
        ctx: &RequestContext,
        scratch: &mut PluginScratch,
    ) -> (PluginStatus, Pdu) {
        (PluginStatus::Next, pdu)
    }
}

// ---------------------------------------------------------------------------
// ChainOutcome
// ---------------------------------------------------------------------------

/// Result of running a request chain to completion.
#[derive(Debug)]
pub enum ChainOutcome {
    /// Dispatch to the destination tree with this PDU (`Next` ran off the
    /// end of the chain, or a plugin returned `Break`).
    Proceed(Pdu),
    /// A plugin dropped the request.
    Dropped,
    /// A plugin answered the request with this PDU.
    Responded(Pdu),
}

// ---------------------------------------------------------------------------
// PluginRegistry
// ---------------------------------------------------------------------------

/// Frozen id → plugin map plus the chain state machine.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under `plugin_id`.
    ///
    /// # Errors
    ///
    /// [`SetupError::DuplicatePluginId`] when the id is already taken.
    pub fn register(&mut self, plugin_id: &str, plugin: Arc<dyn Plugin>) -> Result<(), SetupError> {
        if self.plugins.contains_key(plugin_id) {
            return Err(SetupError::DuplicatePluginId {
                plugin_id: plugin_id.to_string(),
            });
        }
        self.plugins.insert(plugin_id.to_string(), plugin);
        Ok(())
    }

    /// Whether `plugin_id` is registered.
    #[must_use]
    pub fn contains(&self, plugin_id: &str) -> bool {
        self.plugins.contains_key(plugin_id)
    }

    /// Runs the context's resolved plugin chain over a command request.
    ///
    /// Plugins execute in resolved order, each receiving the previous
    /// plugin's output PDU and the shared scratch map. An id with no
    /// registered plugin is logged as an error and skipped (implicit
    /// `Next`); a misconfigured chain degrades rather than killing the
    /// request.
    #[must_use]
    pub fn run_command_request_chain(
        &self,
        engine: &EngineHandle,
        mut pdu: Pdu,
        ctx: &RequestContext,
    ) -> ChainOutcome {
        let mut scratch = PluginScratch::new();
        for plugin_id in &ctx.plugin_ids {
            let Some(plugin) = self.plugins.get(plugin_id) else {
                error!(
                    callflow_id = %ctx.callflow_id,
                    plugin_id = %plugin_id,
                    "plugin not registered, skipping"
                );
                continue;
            };
            let (status, next_pdu) =
                plugin.process_command_request(plugin_id, engine, pdu, ctx, &mut scratch);
            pdu = next_pdu;
            debug!(
                callflow_id = %ctx.callflow_id,
                plugin_id = %plugin_id,
                status = ?status,
                "plugin completed"
            );
            match status {
                PluginStatus::Next => {}
                PluginStatus::Break => return ChainOutcome::Proceed(pdu),
                PluginStatus::Drop => return ChainOutcome::Dropped,
                PluginStatus::Respond => return ChainOutcome::Responded(pdu),
            }
        }
        ChainOutcome::Proceed(pdu)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
