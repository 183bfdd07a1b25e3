//! Engine/context registry: per-engine transport bindings and security
//! principal bookkeeping.
//!
//! Populated once during build, single-threaded, then frozen. Re-binding
//! a transport domain an engine already serves reuses the existing
//! binding (shared endpoint across credentials entries); re-registering
//! a security name under a different security model is a fatal
//! configuration conflict.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use mibgate_core::{EngineId, SecurityModel, TransportDomain};

use super::config::SetupError;

// ---------------------------------------------------------------------------
// EngineHandle
// ---------------------------------------------------------------------------

/// Frozen view of one protocol engine instance, handed to plugins.
#[derive(Debug)]
pub struct EngineHandle {
    engine_id: EngineId,
    bindings: HashMap<TransportDomain, String>,
    principals: HashMap<String, SecurityModel>,
}

impl EngineHandle {
    /// A handle with no bindings or principals, for requests arriving on
    /// an engine id the configuration never named.
    pub(crate) fn detached(engine_id: EngineId) -> Self {
        Self {
            engine_id,
            bindings: HashMap::new(),
            principals: HashMap::new(),
        }
    }

    /// The engine's identifier.
    #[must_use]
    pub fn engine_id(&self) -> &EngineId {
        &self.engine_id
    }

    /// The endpoint bound for `domain`, when one is registered.
    #[must_use]
    pub fn binding(&self, domain: TransportDomain) -> Option<&str> {
        self.bindings.get(&domain).map(String::as_str)
    }

    /// The security model `name` is registered under, when it is.
    #[must_use]
    pub fn security_model_of(&self, name: &str) -> Option<SecurityModel> {
        self.principals.get(name).copied()
    }
}

// ---------------------------------------------------------------------------
// EngineRegistry
// ---------------------------------------------------------------------------

/// Mutable build-phase registry of engine instances; [`freeze`] turns it
/// into the immutable per-engine handles the pipeline serves with.
///
/// [`freeze`]: EngineRegistry::freeze
#[derive(Debug, Default)]
pub struct EngineRegistry {
    engines: HashMap<EngineId, EngineHandle>,
}

impl EngineRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures an engine instance exists for `engine_id`.
    pub fn ensure_engine(&mut self, engine_id: &EngineId) {
        if !self.engines.contains_key(engine_id) {
            debug!(engine_id = %engine_id, "instantiating engine");
            self.engines.insert(
                engine_id.clone(),
                EngineHandle {
                    engine_id: engine_id.clone(),
                    bindings: HashMap::new(),
                    principals: HashMap::new(),
                },
            );
        }
    }

    /// Binds `endpoint` for `domain` on the given engine, reusing an
    /// existing binding for the same domain.
    pub fn bind_transport(
        &mut self,
        engine_id: &EngineId,
        domain: TransportDomain,
        endpoint: &str,
    ) {
        self.ensure_engine(engine_id);
        if let Some(engine) = self.engines.get_mut(engine_id) {
            if let Some(existing) = engine.bindings.get(&domain) {
                info!(
                    engine_id = %engine_id,
                    domain = %domain,
                    endpoint = %existing,
                    "transport domain already bound, reusing binding"
                );
                return;
            }
            engine.bindings.insert(domain, endpoint.to_string());
        }
    }

    /// Registers security principal `name` under `model` on the given
    /// engine, reusing an identical registration.
    ///
    /// # Errors
    ///
    /// [`SetupError::SecurityNameConflict`] when `name` is already
    /// registered under a different model.
    pub fn register_principal(
        &mut self,
        engine_id: &EngineId,
        name: &str,
        model: SecurityModel,
    ) -> Result<(), SetupError> {
        self.ensure_engine(engine_id);
        if let Some(engine) = self.engines.get_mut(engine_id) {
            if let Some(&existing) = engine.principals.get(name) {
                if existing != model {
                    return Err(SetupError::SecurityNameConflict {
                        name: name.to_string(),
                        existing,
                    });
                }
                return Ok(());
            }
            engine.principals.insert(name.to_string(), model);
        }
        Ok(())
    }

    /// Freezes the registry into immutable shared handles.
    #[must_use]
    pub fn freeze(self) -> HashMap<EngineId, Arc<EngineHandle>> {
        self.engines
            .into_iter()
            .map(|(id, engine)| (id, Arc::new(engine)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
