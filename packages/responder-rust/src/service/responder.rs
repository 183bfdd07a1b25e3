//! Responder facade: builder-validated assembly of the full pipeline and
//! the per-request entry point.
//!
//! `ResponderBuilder` consumes configuration plus plugin and tree
//! registrations and performs every fatal validation before anything
//! serves; `build` either returns a frozen, `Send + Sync` [`Responder`]
//! or refuses with the violated key named. After that the only way in is
//! `handle_request`, which never mutates shared state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use mibgate_core::{
    CallflowId, ClassificationKey, EngineId, RequestAttributes, RequestContext, TransportDomain,
};

use crate::tree::{MibInstrumentation, ResponseCallback};

use super::classify::ClassificationResolver;
use super::config::{ResponderConfig, SetupError};
use super::mux::{MibTreeMux, TreeEntry};
use super::plugin::{ChainOutcome, Plugin, PluginRegistry};
use super::registry::{EngineHandle, EngineRegistry};
use super::route::RouteTable;

// ---------------------------------------------------------------------------
// ResponderBuilder
// ---------------------------------------------------------------------------

/// Collects configuration, plugins, and trees, then validates and
/// freezes the whole pipeline in one pass.
pub struct ResponderBuilder {
    config: ResponderConfig,
    plugins: Vec<(String, Arc<dyn Plugin>)>,
    trees: Vec<(String, Arc<dyn MibInstrumentation>)>,
}

impl ResponderBuilder {
    /// Starts a builder over parsed configuration.
    #[must_use]
    pub fn new(config: ResponderConfig) -> Self {
        Self {
            config,
            plugins: Vec::new(),
            trees: Vec::new(),
        }
    }

    /// Registers a plugin under `plugin_id`.
    #[must_use]
    pub fn plugin(mut self, plugin_id: &str, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push((plugin_id.to_string(), plugin));
        self
    }

    /// Loads a tree under `tree_id`.
    #[must_use]
    pub fn tree(mut self, tree_id: &str, instrumentation: Arc<dyn MibInstrumentation>) -> Self {
        self.trees.push((tree_id.to_string(), instrumentation));
        self
    }

    /// Validates everything and freezes the pipeline.
    ///
    /// # Errors
    ///
    /// Any configuration ambiguity is fatal: duplicate credentials
    /// composite, duplicate classification identifier, unknown transport
    /// domain, bad rule pattern, security-name conflict, duplicate
    /// route key, duplicate plugin or tree id, or a plugin route naming
    /// an unregistered plugin.
    pub fn build(self) -> Result<Responder, SetupError> {
        let resolver = ClassificationResolver::from_config(&self.config)?;

        let mut engine_registry = EngineRegistry::new();
        for entry in &self.config.credentials {
            let engine_id = EngineId(entry.engine_id.clone());
            // Already validated by the resolver; a parse failure here
            // would be the same fatal error.
            let domain: TransportDomain = entry.transport_domain.parse().map_err(|_| {
                SetupError::UnknownTransportDomain {
                    axis: "credentials",
                    domain: entry.transport_domain.clone(),
                    id: entry.credentials_id.clone(),
                }
            })?;
            engine_registry.bind_transport(&engine_id, domain, &entry.bind_address);
            engine_registry.register_principal(
                &engine_id,
                &entry.security_name,
                entry.security_model,
            )?;
        }
        let engines = engine_registry.freeze();

        let mut plugin_registry = PluginRegistry::new();
        for (plugin_id, plugin) in self.plugins {
            plugin_registry.register(&plugin_id, plugin)?;
        }

        let mut loaded_trees = HashSet::new();
        let mut tree_entries = Vec::new();
        for (tree_id, instrumentation) in self.trees {
            if !loaded_trees.insert(tree_id.clone()) {
                return Err(SetupError::DuplicateTreeId { tree_id });
            }
            tree_entries.push(TreeEntry {
                tree_id,
                instrumentation,
            });
        }

        let mut route_builder = RouteTable::builder();
        for route in &self.config.plugin_routes {
            for plugin_id in &route.plugin_ids {
                if !plugin_registry.contains(plugin_id) {
                    return Err(SetupError::UnresolvedPlugin {
                        plugin_id: plugin_id.clone(),
                    });
                }
            }
            for key in route.matching.keys() {
                route_builder.register_plugin_chain(key, route.plugin_ids.clone())?;
            }
        }
        for route in &self.config.tree_routes {
            if !loaded_trees.contains(&route.tree_id) {
                warn!(tree_id = %route.tree_id, "tree route names a tree that is not loaded");
            }
            for key in route.matching.keys() {
                route_builder.register_tree_route(key, route.tree_id.clone())?;
            }
        }
        let routes = route_builder.build();

        warn_on_unproducible_keys(&resolver, &routes);

        Ok(Responder {
            resolver,
            routes,
            plugins: plugin_registry,
            mux: MibTreeMux::new(tree_entries),
            engines,
        })
    }
}

/// Flags route keys naming identifiers no configured rule can emit.
/// Macro-bearing rule identifiers expand per request, so any such rule
/// on an axis makes its identifiers open-ended and the check skips that
/// comparison direction.
fn warn_on_unproducible_keys(resolver: &ClassificationResolver, routes: &RouteTable) {
    let producible = resolver.static_identifiers();
    let check = |map: &'static str, key: &ClassificationKey| {
        let axes = [
            key.credentials_id.as_deref(),
            key.context_id.as_deref(),
            key.peer_id.as_deref(),
            key.content_id.as_deref(),
        ];
        for id in axes.into_iter().flatten() {
            if !producible.contains(id) && !id.contains("${") {
                warn!(map, key = %key, identifier = id, "route key identifier is produced by no configured rule");
            }
        }
    };
    for (key, _) in routes.plugin_entries() {
        check("plugin", key);
    }
    for (key, _) in routes.tree_entries() {
        check("tree", key);
    }
}

// ---------------------------------------------------------------------------
// Responder
// ---------------------------------------------------------------------------

/// The frozen pipeline. All methods take `&self`; every field is
/// immutable after [`ResponderBuilder::build`], so a single instance can
/// serve from any number of threads.
pub struct Responder {
    resolver: ClassificationResolver,
    routes: RouteTable,
    plugins: PluginRegistry,
    mux: MibTreeMux,
    engines: HashMap<EngineId, Arc<EngineHandle>>,
}

impl Responder {
    /// Serves one request: classify, run the plugin chain, dispatch to
    /// the destination tree, reply through `done`.
    ///
    /// Serving-time failures (no route, unknown tree, tree error) are
    /// logged under the request's callflow id and surfaced through the
    /// callback as a generic error; they never panic and never poison
    /// the responder.
    pub fn handle_request(&self, attributes: RequestAttributes, done: ResponseCallback) {
        let callflow_id = CallflowId::generate();
        counter!("mibgate.responder.requests").increment(1);

        let security_engine_id = attributes
            .security_engine_id
            .clone()
            .unwrap_or_else(|| attributes.engine_id.clone());
        let outcome = self
            .resolver
            .classify(&attributes, &callflow_id, &security_engine_id);
        let key = outcome.key;
        let plugin_ids = self.routes.plugin_chain(&key).to_vec();
        let tree_id = self.routes.tree_id(&key).map(ToString::to_string);

        info!(
            callflow_id = %callflow_id,
            key = %key,
            peer = %attributes.peer_composite(),
            pdu_type = attributes.pdu.pdu_type.token(),
            plugins = plugin_ids.len(),
            tree_id = tree_id.as_deref().unwrap_or("<null>"),
            "request received"
        );

        let ctx = RequestContext {
            callflow_id,
            attributes,
            key,
            security_engine_id,
            plugin_ids,
            tree_id,
        };

        let engine = self
            .engines
            .get(&ctx.attributes.engine_id)
            .cloned()
            .unwrap_or_else(|| Arc::new(EngineHandle::detached(ctx.attributes.engine_id.clone())));

        let pdu = ctx.attributes.pdu.clone();
        match self.plugins.run_command_request_chain(&engine, pdu, &ctx) {
            ChainOutcome::Proceed(pdu) => self.mux.dispatch(&ctx, pdu, done),
            ChainOutcome::Dropped => {
                info!(callflow_id = %ctx.callflow_id, "request dropped by plugin");
                counter!("mibgate.responder.dropped").increment(1);
                // The reply carries the request's var-binds untouched by
                // whatever the chain did to its threaded copy.
                done(ctx.attributes.pdu.var_binds, None);
            }
            ChainOutcome::Responded(pdu) => {
                info!(callflow_id = %ctx.callflow_id, "request answered by plugin");
                counter!("mibgate.responder.answered").increment(1);
                done(pdu.var_binds, None);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use mibgate_core::{
        Oid, Pdu, PduType, SecurityLevel, SecurityModel, Value, VarBind,
    };

    use super::*;
    use crate::service::config::{
        ContentConfig, ContextConfig, CredentialsConfig, PeerConfig, PluginRouteConfig,
        RouteMatch, TreeRouteConfig,
    };
    use crate::service::plugin::{PluginScratch, PluginStatus};
    use crate::tree::{MemoryMibTree, MibError};

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    fn route_match() -> RouteMatch {
        RouteMatch {
            credentials_ids: vec![Some("cred-A".to_string())],
            context_ids: vec![Some("ctx-default".to_string())],
            peer_ids: vec![Some("peer-X".to_string())],
            content_ids: vec![Some("content-read".to_string())],
        }
    }

    fn config() -> ResponderConfig {
        ResponderConfig {
            credentials: vec![CredentialsConfig {
                credentials_id: "cred-A".to_string(),
                engine_id: "engine-1".to_string(),
                transport_domain: "udp".to_string(),
                bind_address: "0.0.0.0:161".to_string(),
                security_model: SecurityModel::V2c,
                security_level: SecurityLevel::NoAuthNoPriv,
                security_name: "public".to_string(),
            }],
            contexts: vec![ContextConfig {
                context_id: "ctx-default".to_string(),
                engine_id_pattern: ".*".to_string(),
                name_pattern: "".to_string(),
            }],
            peers: vec![PeerConfig {
                peer_id: "peer-X".to_string(),
                transport_domain: "udp4".to_string(),
                peer_address_patterns: vec![r"10\.0\.0\.\d+:\d+".to_string()],
                bind_address_patterns: vec![".*".to_string()],
            }],
            contents: vec![ContentConfig {
                content_id: "content-read".to_string(),
                pdu_type_pattern: "GET|GETNEXT|GETBULK".to_string(),
                oid_prefix_patterns: vec![r"1\.3\.6\.1\.2\.1\..*".to_string()],
            }],
            plugin_routes: vec![PluginRouteConfig {
                plugin_ids: vec!["audit".to_string()],
                matching: route_match(),
            }],
            tree_routes: vec![TreeRouteConfig {
                tree_id: "tree-1".to_string(),
                matching: route_match(),
            }],
        }
    }

    fn attributes() -> RequestAttributes {
        RequestAttributes {
            engine_id: EngineId::from("engine-1"),
            transport_domain: mibgate_core::TransportDomain::Udp4,
            peer_address: "10.0.0.1".parse().unwrap(),
            peer_port: 33161,
            bind_address: "0.0.0.0".parse().unwrap(),
            bind_port: 161,
            security_model: SecurityModel::V2c,
            security_level: SecurityLevel::NoAuthNoPriv,
            security_name: "public".to_string(),
            context_engine_id: EngineId::from("engine-1"),
            context_name: String::new(),
            pdu: Pdu::new(
                PduType::Get,
                1,
                vec![VarBind::request(oid("1.3.6.1.2.1.1.5.0"))],
            ),
            security_engine_id: None,
        }
    }

    struct RecordingPlugin {
        status: PluginStatus,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Plugin for RecordingPlugin {
        fn process_command_request(
            &self,
            _plugin_id: &str,
            _engine: &EngineHandle,
            pdu: Pdu,
            ctx: &RequestContext,
            _scratch: &mut PluginScratch,
        ) -> (PluginStatus, Pdu) {
            self.seen.lock().push(ctx.callflow_id.to_string());
            (self.status, pdu)
        }
    }

    fn tree() -> Arc<MemoryMibTree> {
        Arc::new(MemoryMibTree::with_objects(vec![(
            oid("1.3.6.1.2.1.1.5.0"),
            Value::OctetString(b"host-1".to_vec()),
        )]))
    }

    fn build_responder(status: PluginStatus) -> (Responder, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let responder = ResponderBuilder::new(config())
            .plugin(
                "audit",
                Arc::new(RecordingPlugin {
                    status,
                    seen: seen.clone(),
                }),
            )
            .tree("tree-1", tree())
            .build()
            .unwrap();
        (responder, seen)
    }

    fn handle_sync(
        responder: &Responder,
        attrs: RequestAttributes,
    ) -> (Vec<VarBind>, Option<MibError>) {
        let slot = Arc::new(Mutex::new(None));
        let out = slot.clone();
        responder.handle_request(
            attrs,
            Box::new(move |var_binds, error| {
                *out.lock() = Some((var_binds, error));
            }),
        );
        let reply = slot.lock().take();
        reply.expect("continuation not invoked")
    }

    #[test]
    fn matched_request_runs_chain_and_serves_from_tree() {
        let (responder, seen) = build_responder(PluginStatus::Next);
        let (var_binds, error) = handle_sync(&responder, attributes());
        assert_eq!(error, None);
        assert_eq!(var_binds[0].value, Value::OctetString(b"host-1".to_vec()));
        // The audit plugin observed the request once, with a callflow id.
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 10);
    }

    #[test]
    fn dropped_request_replies_with_original_var_binds() {
        let (responder, _) = build_responder(PluginStatus::Drop);
        let attrs = attributes();
        let request_binds = attrs.pdu.var_binds.clone();
        let (var_binds, error) = handle_sync(&responder, attrs);
        assert_eq!(error, None);
        assert_eq!(var_binds, request_binds);
    }

    #[test]
    fn unmatched_peer_falls_off_the_route_and_survives() {
        let (responder, seen) = build_responder(PluginStatus::Next);
        let mut attrs = attributes();
        attrs.peer_address = "192.168.1.1".parse().unwrap();
        let (_, error) = handle_sync(&responder, attrs);
        // Null peer axis means no route entry: generic error, no plugin.
        assert_eq!(error, Some(MibError::General));
        assert!(seen.lock().is_empty());

        // The responder keeps serving matched requests afterwards.
        let (var_binds, error) = handle_sync(&responder, attributes());
        assert_eq!(error, None);
        assert_eq!(var_binds[0].value, Value::OctetString(b"host-1".to_vec()));
    }

    #[test]
    fn responded_request_carries_plugin_pdu_without_tree() {
        struct Answering;
        impl Plugin for Answering {
            fn process_command_request(
                &self,
                _plugin_id: &str,
                _engine: &EngineHandle,
                mut pdu: Pdu,
                _ctx: &RequestContext,
                _scratch: &mut PluginScratch,
            ) -> (PluginStatus, Pdu) {
                pdu.var_binds[0].value = Value::Integer(99);
                (PluginStatus::Respond, pdu)
            }
        }
        let responder = ResponderBuilder::new(config())
            .plugin("audit", Arc::new(Answering))
            .tree("tree-1", tree())
            .build()
            .unwrap();
        let (var_binds, error) = handle_sync(&responder, attributes());
        assert_eq!(error, None);
        assert_eq!(var_binds[0].value, Value::Integer(99));
    }

    #[test]
    fn unresolved_plugin_route_is_fatal() {
        let err = ResponderBuilder::new(config())
            .tree("tree-1", tree())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::UnresolvedPlugin { .. }));
    }

    #[test]
    fn duplicate_tree_registration_is_fatal() {
        let mut cfg = config();
        cfg.plugin_routes.clear();
        let err = ResponderBuilder::new(cfg)
            .tree("tree-1", tree())
            .tree("tree-1", tree())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::DuplicateTreeId { .. }));
    }

    #[test]
    fn duplicate_route_registrations_are_fatal() {
        let mut cfg = config();
        cfg.tree_routes.push(TreeRouteConfig {
            tree_id: "tree-2".to_string(),
            matching: route_match(),
        });
        let err = ResponderBuilder::new(cfg)
            .plugin("audit", Arc::new(RecordingPlugin {
                status: PluginStatus::Next,
                seen: Arc::new(Mutex::new(Vec::new())),
            }))
            .tree("tree-1", tree())
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SetupError::DuplicateRouteKey { map: "tree", .. }
        ));
    }

    #[test]
    fn security_engine_id_defaults_to_local_when_absent() {
        struct Capture {
            seen: Arc<Mutex<Vec<EngineId>>>,
        }
        impl Plugin for Capture {
            fn process_command_request(
                &self,
                _plugin_id: &str,
                _engine: &EngineHandle,
                pdu: Pdu,
                ctx: &RequestContext,
                _scratch: &mut PluginScratch,
            ) -> (PluginStatus, Pdu) {
                self.seen.lock().push(ctx.security_engine_id.clone());
                (PluginStatus::Next, pdu)
            }
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let responder = ResponderBuilder::new(config())
            .plugin("audit", Arc::new(Capture { seen: seen.clone() }))
            .tree("tree-1", tree())
            .build()
            .unwrap();

        // Community-based request: no security engine id supplied.
        handle_sync(&responder, attributes());
        // USM-style request: the resolved id is kept as supplied.
        let mut attrs = attributes();
        attrs.security_engine_id = Some(EngineId::from("remote-engine"));
        handle_sync(&responder, attrs);

        let seen = seen.lock();
        assert_eq!(seen[0], EngineId::from("engine-1"));
        assert_eq!(seen[1], EngineId::from("remote-engine"));
    }
}
