//! Already-parsed configuration consumed by the responder builder, plus
//! the fatal errors build-time validation raises.
//!
//! An external loader (file parser, management API, test fixture) produces
//! these structs; everything here is plain serde-deserializable data. The
//! checks that make a configuration *usable* (duplicate keys, unresolved
//! references, principal conflicts) run in the builder and registry and
//! report [`SetupError`], which refuses process startup.

use serde::{Deserialize, Serialize};

use mibgate_core::{ClassificationKey, SecurityLevel, SecurityModel};

// ---------------------------------------------------------------------------
// SetupError
// ---------------------------------------------------------------------------

/// Fatal configuration-time violation. The process must refuse to start
/// and report the specific violated key.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Two credentials entries produced the same composite lookup key.
    #[error("ambiguous credentials configuration at {credentials_id:?}: composite key already registered by {existing_id:?}")]
    AmbiguousCredentials {
        credentials_id: String,
        existing_id: String,
    },

    /// A peer/context/content identifier was configured twice.
    #[error("duplicate {axis} identifier {id:?}")]
    DuplicateIdentifier { axis: &'static str, id: String },

    /// A transport domain name the responder does not recognize.
    #[error("unknown transport domain {domain:?} at {axis} entry {id:?}")]
    UnknownTransportDomain {
        axis: &'static str,
        domain: String,
        id: String,
    },

    /// A security name re-registered under a conflicting security model.
    #[error("security name {name:?} already in use at security model {existing}")]
    SecurityNameConflict {
        name: String,
        existing: SecurityModel,
    },

    /// The same 4-tuple key registered twice in a routing map.
    #[error("duplicate {map} route for composite key {key}")]
    DuplicateRouteKey {
        map: &'static str,
        key: ClassificationKey,
    },

    /// A plugin route referenced an id absent from the plugin registry.
    #[error("undefined plugin id {plugin_id:?} referenced by a plugin route")]
    UnresolvedPlugin { plugin_id: String },

    /// The same plugin id registered twice.
    #[error("duplicate plugin id {plugin_id:?}")]
    DuplicatePluginId { plugin_id: String },

    /// The same tree id loaded twice.
    #[error("duplicate tree id {tree_id:?}")]
    DuplicateTreeId { tree_id: String },

    /// A classification rule pattern failed to compile.
    #[error("bad pattern {pattern:?} for {axis} rule {id:?}")]
    BadPattern {
        axis: &'static str,
        id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Complete responder configuration, as produced by an external loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResponderConfig {
    /// Enumerated credential entries; each yields one composite-key row
    /// in the credentials table.
    pub credentials: Vec<CredentialsConfig>,
    /// Ordered context classification rules.
    pub contexts: Vec<ContextConfig>,
    /// Ordered peer classification rules.
    pub peers: Vec<PeerConfig>,
    /// Ordered content classification rules.
    pub contents: Vec<ContentConfig>,
    /// Plugin chain registrations keyed by classification 4-tuples.
    pub plugin_routes: Vec<PluginRouteConfig>,
    /// Destination tree registrations keyed by classification 4-tuples.
    pub tree_routes: Vec<TreeRouteConfig>,
}

/// One enumerated credential entry. The composite lookup key is
/// `(engine id, transport domain, security model, security level,
/// security name)`; matching requests classify as `credentials_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CredentialsConfig {
    pub credentials_id: String,
    pub engine_id: String,
    /// Transport domain name (`udp`/`udp4`/`udp6`); anything else is a
    /// fatal [`SetupError::UnknownTransportDomain`].
    pub transport_domain: String,
    /// Endpoint the engine serves this entry on, `addr:port`.
    pub bind_address: String,
    pub security_model: SecurityModel,
    pub security_level: SecurityLevel,
    pub security_name: String,
}

/// One ordered context rule: pattern over `contextEngineId#contextName`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContextConfig {
    pub context_id: String,
    pub engine_id_pattern: String,
    pub name_pattern: String,
}

/// One ordered peer rule, filtered by transport domain. The configured
/// peer-address patterns and bind-address patterns are cross-multiplied
/// into `peer#bind` composite patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeerConfig {
    pub peer_id: String,
    pub transport_domain: String,
    pub peer_address_patterns: Vec<String>,
    pub bind_address_patterns: Vec<String>,
}

/// One ordered content rule: a PDU-type pattern cross-multiplied with
/// OID-prefix patterns over `TYPE#oid1|oid2|...` composites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContentConfig {
    pub content_id: String,
    pub pdu_type_pattern: String,
    pub oid_prefix_patterns: Vec<String>,
}

/// Identifier lists a route registration matches on, one list per
/// classification axis. Entries are optional so an explicit `null`
/// (the distinct "unclassified" value) can be routed; the cross product
/// of the four lists forms the registered 4-tuple keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RouteMatch {
    pub credentials_ids: Vec<Option<String>>,
    pub context_ids: Vec<Option<String>>,
    pub peer_ids: Vec<Option<String>>,
    pub content_ids: Vec<Option<String>>,
}

impl RouteMatch {
    /// Expands the per-axis lists into every 4-tuple key they denote.
    #[must_use]
    pub fn keys(&self) -> Vec<ClassificationKey> {
        let mut keys = Vec::new();
        for cred in &self.credentials_ids {
            for context in &self.context_ids {
                for peer in &self.peer_ids {
                    for content in &self.content_ids {
                        keys.push(ClassificationKey {
                            credentials_id: cred.clone(),
                            context_id: context.clone(),
                            peer_id: peer.clone(),
                            content_id: content.clone(),
                        });
                    }
                }
            }
        }
        keys
    }
}

/// Registers an ordered plugin chain for every key in `matching`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginRouteConfig {
    pub plugin_ids: Vec<String>,
    #[serde(flatten)]
    pub matching: RouteMatch,
}

/// Registers a destination tree for every key in `matching`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TreeRouteConfig {
    pub tree_id: String,
    #[serde(flatten)]
    pub matching: RouteMatch,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_match_cross_product() {
        let matching = RouteMatch {
            credentials_ids: vec![Some("cred-A".to_string()), Some("cred-B".to_string())],
            context_ids: vec![Some("ctx".to_string())],
            peer_ids: vec![Some("peer-X".to_string()), None],
            content_ids: vec![Some("content".to_string())],
        };
        let keys = matching.keys();
        assert_eq!(keys.len(), 4);
        assert!(keys.contains(&ClassificationKey {
            credentials_id: Some("cred-B".to_string()),
            context_id: Some("ctx".to_string()),
            peer_id: None,
            content_id: Some("content".to_string()),
        }));
    }

    #[test]
    fn empty_axis_produces_no_keys() {
        let matching = RouteMatch {
            credentials_ids: vec![Some("cred-A".to_string())],
            ..RouteMatch::default()
        };
        assert!(matching.keys().is_empty());
    }

    #[test]
    fn config_deserializes_from_json() {
        let json = r#"{
            "credentials": [{
                "credentials-id": "cred-A",
                "engine-id": "engine-1",
                "transport-domain": "udp",
                "bind-address": "0.0.0.0:161",
                "security-model": "v2c",
                "security-level": "no-auth-no-priv",
                "security-name": "public"
            }],
            "tree-routes": [{
                "tree-id": "tree-1",
                "credentials-ids": ["cred-A"],
                "context-ids": [null],
                "peer-ids": ["peer-X"],
                "content-ids": ["content-read"]
            }]
        }"#;
        let config: ResponderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.credentials.len(), 1);
        assert_eq!(config.credentials[0].security_model, SecurityModel::V2c);
        let keys = config.tree_routes[0].matching.keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].context_id, None);
    }
}
