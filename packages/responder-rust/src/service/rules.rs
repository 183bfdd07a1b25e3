//! Ordered pattern-rule lists used by classification.
//!
//! Each rule pairs a compiled regex with the identifier it emits. Lists
//! are scanned in configuration order and the first rule whose pattern
//! fully matches the composite string wins; patterns are anchored at
//! compile time so partial matches never classify.

use std::collections::HashMap;

use regex::Regex;

use mibgate_core::TransportDomain;

use super::config::SetupError;

// ---------------------------------------------------------------------------
// IdentifierRule
// ---------------------------------------------------------------------------

/// A single classification rule: full-match pattern plus the identifier
/// it emits (which may itself contain `${...}` placeholders, expanded at
/// resolve time).
#[derive(Debug)]
pub struct IdentifierRule {
    identifier: String,
    pattern: Regex,
}

impl IdentifierRule {
    /// Compiles a rule, anchoring the pattern so only full matches count.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::BadPattern`] when the pattern does not
    /// compile; configuration with an unusable rule must not serve.
    pub fn compile(axis: &'static str, identifier: &str, pattern: &str) -> Result<Self, SetupError> {
        let anchored = format!("^(?:{pattern})$");
        let compiled = Regex::new(&anchored).map_err(|source| SetupError::BadPattern {
            axis,
            id: identifier.to_string(),
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            identifier: identifier.to_string(),
            pattern: compiled,
        })
    }

    /// The identifier this rule emits.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether the composite string fully matches this rule's pattern.
    #[must_use]
    pub fn matches(&self, composite: &str) -> bool {
        self.pattern.is_match(composite)
    }
}

// ---------------------------------------------------------------------------
// RuleList
// ---------------------------------------------------------------------------

/// Ordered rule list; first full match wins.
#[derive(Debug, Default)]
pub struct RuleList {
    rules: Vec<IdentifierRule>,
}

impl RuleList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule, keeping configuration order.
    pub fn push(&mut self, rule: IdentifierRule) {
        self.rules.push(rule);
    }

    /// Resolves a composite string to the first matching rule's
    /// identifier, or `None` when no rule matches.
    #[must_use]
    pub fn resolve(&self, composite: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(composite))
            .map(IdentifierRule::identifier)
    }

    /// Identifiers emitted by the configured rules, in order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(IdentifierRule::identifier)
    }

    /// Number of configured rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// PeerRuleSet
// ---------------------------------------------------------------------------

/// Peer rules carry a transport-domain filter: only the list for the
/// request's domain is scanned.
#[derive(Debug, Default)]
pub struct PeerRuleSet {
    by_domain: HashMap<TransportDomain, RuleList>,
}

impl PeerRuleSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule to the given domain's ordered list.
    pub fn push(&mut self, domain: TransportDomain, rule: IdentifierRule) {
        self.by_domain.entry(domain).or_default().push(rule);
    }

    /// Resolves a peer composite against the rules for `domain`.
    #[must_use]
    pub fn resolve(&self, domain: TransportDomain, composite: &str) -> Option<&str> {
        self.by_domain.get(&domain)?.resolve(composite)
    }

    /// Identifiers emitted across all domains.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.by_domain.values().flat_map(RuleList::identifiers)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
