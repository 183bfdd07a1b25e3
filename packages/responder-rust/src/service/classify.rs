//! Classification resolver: raw request attributes in, 4-identifier
//! composite key out.
//!
//! The four axes resolve in a fixed order (credentials, context, peer,
//! content) and each resolved identifier is bound into the request's
//! macro context before the next axis runs, so a later identifier can
//! reference an earlier one. Resolution is pure over frozen tables; the
//! same attributes always classify to the same key.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use mibgate_core::{
    expand_str, CallflowId, ClassificationKey, EngineId, MacroContext, RequestAttributes,
    SecurityLevel, SecurityModel, TransportDomain,
};

use super::config::{ResponderConfig, SetupError};
use super::rules::{IdentifierRule, PeerRuleSet, RuleList};

/// Exact composite the credentials table is keyed by.
type CredentialsKey = (EngineId, TransportDomain, SecurityModel, SecurityLevel, String);

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Outcome of one classification pass: the composite routing key plus the
/// macro context accumulated while resolving it (attribute bindings and
/// the per-axis identifier bindings).
#[derive(Debug)]
pub struct Classification {
    pub key: ClassificationKey,
    pub macro_ctx: MacroContext,
}

// ---------------------------------------------------------------------------
// ClassificationResolver
// ---------------------------------------------------------------------------

/// Frozen classification tables, built once from configuration.
#[derive(Debug, Default)]
pub struct ClassificationResolver {
    credentials: HashMap<CredentialsKey, String>,
    context_rules: RuleList,
    peer_rules: PeerRuleSet,
    content_rules: RuleList,
}

impl ClassificationResolver {
    /// Compiles classification tables from configuration.
    ///
    /// # Errors
    ///
    /// Any ambiguity is fatal: two credentials entries mapping the same
    /// composite key, a repeated context/peer/content identifier, an
    /// unknown transport domain name, or an uncompilable rule pattern.
    pub fn from_config(config: &ResponderConfig) -> Result<Self, SetupError> {
        let mut resolver = Self::default();

        for entry in &config.credentials {
            let domain: TransportDomain = entry.transport_domain.parse().map_err(|_| {
                SetupError::UnknownTransportDomain {
                    axis: "credentials",
                    domain: entry.transport_domain.clone(),
                    id: entry.credentials_id.clone(),
                }
            })?;
            let key: CredentialsKey = (
                EngineId(entry.engine_id.clone()),
                domain,
                entry.security_model,
                entry.security_level,
                entry.security_name.clone(),
            );
            if let Some(existing) = resolver.credentials.get(&key) {
                return Err(SetupError::AmbiguousCredentials {
                    credentials_id: entry.credentials_id.clone(),
                    existing_id: existing.clone(),
                });
            }
            resolver
                .credentials
                .insert(key, entry.credentials_id.clone());
        }

        let mut seen = HashSet::new();
        for entry in &config.contexts {
            if !seen.insert(entry.context_id.clone()) {
                return Err(SetupError::DuplicateIdentifier {
                    axis: "context",
                    id: entry.context_id.clone(),
                });
            }
            // Each part is grouped so a top-level alternation inside one
            // cannot swallow the `#` separator under full-match anchoring.
            let pattern = format!(
                "(?:{})#(?:{})",
                entry.engine_id_pattern, entry.name_pattern
            );
            resolver.context_rules.push(IdentifierRule::compile(
                "context",
                &entry.context_id,
                &pattern,
            )?);
        }

        let mut seen = HashSet::new();
        for entry in &config.peers {
            if !seen.insert(entry.peer_id.clone()) {
                return Err(SetupError::DuplicateIdentifier {
                    axis: "peer",
                    id: entry.peer_id.clone(),
                });
            }
            let domain: TransportDomain = entry.transport_domain.parse().map_err(|_| {
                SetupError::UnknownTransportDomain {
                    axis: "peer",
                    domain: entry.transport_domain.clone(),
                    id: entry.peer_id.clone(),
                }
            })?;
            // Cross-multiply peer and bind endpoint patterns into the
            // `peer#bind` composites classification matches on.
            for peer_pattern in &entry.peer_address_patterns {
                for bind_pattern in &entry.bind_address_patterns {
                    let pattern = format!("(?:{peer_pattern})#(?:{bind_pattern})");
                    resolver.peer_rules.push(
                        domain,
                        IdentifierRule::compile("peer", &entry.peer_id, &pattern)?,
                    );
                }
            }
        }

        let mut seen = HashSet::new();
        for entry in &config.contents {
            if !seen.insert(entry.content_id.clone()) {
                return Err(SetupError::DuplicateIdentifier {
                    axis: "content",
                    id: entry.content_id.clone(),
                });
            }
            for oid_pattern in &entry.oid_prefix_patterns {
                let pattern = format!("(?:{})#(?:{})", entry.pdu_type_pattern, oid_pattern);
                resolver.content_rules.push(IdentifierRule::compile(
                    "content",
                    &entry.content_id,
                    &pattern,
                )?);
            }
        }

        Ok(resolver)
    }

    /// Classifies a request's attributes into its composite routing key.
    ///
    /// Never fails: an axis with no match resolves to the explicit null
    /// identifier and classification proceeds. Every emitted identifier
    /// is macro-expanded against the context accumulated so far, then
    /// bound into it for the following axes. The callflow id and the
    /// resolved security engine id are bound up front so emitted
    /// identifiers can reference them.
    #[must_use]
    pub fn classify(
        &self,
        attributes: &RequestAttributes,
        callflow_id: &CallflowId,
        security_engine_id: &EngineId,
    ) -> Classification {
        let mut macro_ctx = attributes.macro_context();
        macro_ctx.set("callflow-id", callflow_id);
        macro_ctx.set("snmp-security-engine-id", security_engine_id);

        let credentials_key: CredentialsKey = (
            attributes.engine_id.clone(),
            attributes.transport_domain,
            attributes.security_model,
            attributes.security_level,
            attributes.security_name.clone(),
        );
        let credentials_id = self
            .credentials
            .get(&credentials_key)
            .map(|id| expand_str(id, &macro_ctx));
        macro_ctx.set_opt("snmp-credentials-id", credentials_id.as_deref());

        let context_id = self
            .context_rules
            .resolve(&attributes.context_composite())
            .map(|id| expand_str(id, &macro_ctx));
        macro_ctx.set_opt("snmp-context-id", context_id.as_deref());

        let peer_id = self
            .peer_rules
            .resolve(attributes.transport_domain, &attributes.peer_composite())
            .map(|id| expand_str(id, &macro_ctx));
        macro_ctx.set_opt("snmp-peer-id", peer_id.as_deref());

        let content_id = self
            .content_rules
            .resolve(&attributes.pdu.content_composite())
            .map(|id| expand_str(id, &macro_ctx));
        macro_ctx.set_opt("snmp-content-id", content_id.as_deref());

        let key = ClassificationKey {
            credentials_id,
            context_id,
            peer_id,
            content_id,
        };
        debug!(%key, "request classified");

        Classification { key, macro_ctx }
    }

    /// Identifiers the configured rules can emit, for cross-checking
    /// route registrations at build time. Identifiers containing macro
    /// placeholders are excluded; their expansions are open-ended.
    #[must_use]
    pub fn static_identifiers(&self) -> HashSet<&str> {
        self.credentials
            .values()
            .map(String::as_str)
            .chain(self.context_rules.identifiers())
            .chain(self.peer_rules.identifiers())
            .chain(self.content_rules.identifiers())
            .filter(|id| !id.contains("${"))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
