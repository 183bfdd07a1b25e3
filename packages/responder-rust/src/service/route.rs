//! Immutable routing table: classification 4-tuple -> plugin chain and
//! destination tree.
//!
//! All matching flexibility is consumed during classification; lookups
//! here are pure hash lookups with no pattern or wildcard logic. The
//! table is built once, validated fatally against duplicate keys, and
//! read-only afterwards, so the serving loop can read it without
//! synchronization.

use std::collections::HashMap;

use mibgate_core::ClassificationKey;

use super::config::SetupError;

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// Frozen routing maps.
#[derive(Debug, Default)]
pub struct RouteTable {
    plugin_chains: HashMap<ClassificationKey, Vec<String>>,
    tree_routes: HashMap<ClassificationKey, String>,
}

impl RouteTable {
    /// Starts building a table.
    #[must_use]
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Ordered plugin chain for `key`; empty when no entry exists.
    #[must_use]
    pub fn plugin_chain(&self, key: &ClassificationKey) -> &[String] {
        self.plugin_chains.get(key).map_or(&[], Vec::as_slice)
    }

    /// Destination tree for `key`, or `None` when no entry exists.
    #[must_use]
    pub fn tree_id(&self, key: &ClassificationKey) -> Option<&str> {
        self.tree_routes.get(key).map(String::as_str)
    }

    /// All registered plugin-chain entries (validation walks these).
    pub fn plugin_entries(&self) -> impl Iterator<Item = (&ClassificationKey, &[String])> {
        self.plugin_chains.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// All registered tree-route entries.
    pub fn tree_entries(&self) -> impl Iterator<Item = (&ClassificationKey, &str)> {
        self.tree_routes.iter().map(|(k, v)| (k, v.as_str()))
    }
}

// ---------------------------------------------------------------------------
// RouteTableBuilder
// ---------------------------------------------------------------------------

/// Accumulates route registrations, rejecting duplicate keys fatally.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    plugin_chains: HashMap<ClassificationKey, Vec<String>>,
    tree_routes: HashMap<ClassificationKey, String>,
}

impl RouteTableBuilder {
    /// Registers an ordered plugin chain for `key`.
    ///
    /// # Errors
    ///
    /// [`SetupError::DuplicateRouteKey`] when `key` is already
    /// registered; a prior entry is never silently overwritten.
    pub fn register_plugin_chain(
        &mut self,
        key: ClassificationKey,
        plugin_ids: Vec<String>,
    ) -> Result<(), SetupError> {
        if self.plugin_chains.contains_key(&key) {
            return Err(SetupError::DuplicateRouteKey {
                map: "plugin",
                key,
            });
        }
        self.plugin_chains.insert(key, plugin_ids);
        Ok(())
    }

    /// Registers the destination tree for `key`.
    ///
    /// # Errors
    ///
    /// [`SetupError::DuplicateRouteKey`] when `key` is already
    /// registered.
    pub fn register_tree_route(
        &mut self,
        key: ClassificationKey,
        tree_id: String,
    ) -> Result<(), SetupError> {
        if self.tree_routes.contains_key(&key) {
            return Err(SetupError::DuplicateRouteKey { map: "tree", key });
        }
        self.tree_routes.insert(key, tree_id);
        Ok(())
    }

    /// Freezes the table.
    #[must_use]
    pub fn build(self) -> RouteTable {
        RouteTable {
            plugin_chains: self.plugin_chains,
            tree_routes: self.tree_routes,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
