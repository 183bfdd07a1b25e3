//! In-memory [`MibInstrumentation`] backed by an ordered object map.
//!
//! The reference tree implementation: a `BTreeMap` keyed by OID, whose
//! ordering is exactly the traversal order iterate/bulk need. Suitable
//! for tests and for embedding small static object sets.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use mibgate_core::{Oid, Value, VarBind};

use super::{MibError, MibInstrumentation, MibOperation, ResponseCallback};

/// Ordered in-memory object store serving all four tree operations
/// synchronously.
///
/// Fetch misses produce `NoSuchObject` exception values; iteration past
/// the last object produces `EndOfMibView`. Writes upsert and echo the
/// written var-binds, matching SNMPv2 response shape.
pub struct MemoryMibTree {
    objects: RwLock<BTreeMap<Oid, Value>>,
}

impl MemoryMibTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates a tree pre-populated with the given objects.
    #[must_use]
    pub fn with_objects(objects: impl IntoIterator<Item = (Oid, Value)>) -> Self {
        Self {
            objects: RwLock::new(objects.into_iter().collect()),
        }
    }

    /// Inserts or replaces a single object.
    pub fn insert(&self, oid: Oid, value: Value) {
        self.objects.write().insert(oid, value);
    }

    /// Number of objects currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the tree holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn fetch(&self, var_binds: Vec<VarBind>) -> Vec<VarBind> {
        let objects = self.objects.read();
        var_binds
            .into_iter()
            .map(|vb| {
                let value = objects
                    .get(&vb.oid)
                    .cloned()
                    .unwrap_or(Value::NoSuchObject);
                VarBind::new(vb.oid, value)
            })
            .collect()
    }

    fn iterate(&self, var_binds: Vec<VarBind>) -> Vec<VarBind> {
        let objects = self.objects.read();
        var_binds
            .into_iter()
            .map(|vb| {
                let next = objects
                    .range((Bound::Excluded(vb.oid.clone()), Bound::Unbounded))
                    .next();
                match next {
                    Some((oid, value)) => VarBind::new(oid.clone(), value.clone()),
                    None => VarBind::new(vb.oid, Value::EndOfMibView),
                }
            })
            .collect()
    }

    fn write(&self, var_binds: Vec<VarBind>) -> Vec<VarBind> {
        let mut objects = self.objects.write();
        for vb in &var_binds {
            objects.insert(vb.oid.clone(), vb.value.clone());
        }
        var_binds
    }
}

impl Default for MemoryMibTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MibInstrumentation for MemoryMibTree {
    fn apply(&self, op: MibOperation, var_binds: Vec<VarBind>, done: ResponseCallback) {
        let result = match op {
            MibOperation::Fetch => self.fetch(var_binds),
            MibOperation::Iterate | MibOperation::Bulk => self.iterate(var_binds),
            MibOperation::Write => self.write(var_binds),
        };
        let error: Option<MibError> = None;
        done(result, error);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    fn make_tree() -> MemoryMibTree {
        MemoryMibTree::with_objects(vec![
            (oid("1.3.6.1.2.1.1.1.0"), Value::OctetString(b"MibGate".to_vec())),
            (oid("1.3.6.1.2.1.1.3.0"), Value::TimeTicks(42)),
            (oid("1.3.6.1.2.1.1.5.0"), Value::OctetString(b"host-1".to_vec())),
        ])
    }

    fn apply_sync(tree: &MemoryMibTree, op: MibOperation, vbs: Vec<VarBind>) -> Vec<VarBind> {
        let result = std::sync::Arc::new(parking_lot::Mutex::new(None));
        let slot = result.clone();
        tree.apply(
            op,
            vbs,
            Box::new(move |vbs, err| {
                assert!(err.is_none());
                *slot.lock() = Some(vbs);
            }),
        );
        let reply = result.lock().take();
        reply.expect("continuation not invoked")
    }

    #[test]
    fn fetch_returns_stored_value() {
        let tree = make_tree();
        let out = apply_sync(
            &tree,
            MibOperation::Fetch,
            vec![VarBind::request(oid("1.3.6.1.2.1.1.5.0"))],
        );
        assert_eq!(out[0].value, Value::OctetString(b"host-1".to_vec()));
    }

    #[test]
    fn fetch_miss_yields_no_such_object() {
        let tree = make_tree();
        let out = apply_sync(
            &tree,
            MibOperation::Fetch,
            vec![VarBind::request(oid("1.3.6.1.9.9"))],
        );
        assert_eq!(out[0].value, Value::NoSuchObject);
        assert_eq!(out[0].oid, oid("1.3.6.1.9.9"));
    }

    #[test]
    fn iterate_walks_to_next_object() {
        let tree = make_tree();
        let out = apply_sync(
            &tree,
            MibOperation::Iterate,
            vec![VarBind::request(oid("1.3.6.1.2.1.1.1.0"))],
        );
        assert_eq!(out[0].oid, oid("1.3.6.1.2.1.1.3.0"));
        assert_eq!(out[0].value, Value::TimeTicks(42));
    }

    #[test]
    fn iterate_from_prefix_finds_first_instance() {
        let tree = make_tree();
        let out = apply_sync(
            &tree,
            MibOperation::Iterate,
            vec![VarBind::request(oid("1.3.6.1.2.1.1"))],
        );
        assert_eq!(out[0].oid, oid("1.3.6.1.2.1.1.1.0"));
    }

    #[test]
    fn iterate_past_end_yields_end_of_mib_view() {
        let tree = make_tree();
        let out = apply_sync(
            &tree,
            MibOperation::Iterate,
            vec![VarBind::request(oid("1.3.6.1.2.1.1.5.0"))],
        );
        assert_eq!(out[0].oid, oid("1.3.6.1.2.1.1.5.0"));
        assert_eq!(out[0].value, Value::EndOfMibView);
    }

    #[test]
    fn bulk_rides_the_iterate_path() {
        let tree = make_tree();
        let out = apply_sync(
            &tree,
            MibOperation::Bulk,
            vec![VarBind::request(oid("1.3.6.1.2.1.1.1.0"))],
        );
        assert_eq!(out[0].oid, oid("1.3.6.1.2.1.1.3.0"));
    }

    #[test]
    fn write_then_fetch_round_trips() {
        let tree = MemoryMibTree::new();
        let vb = VarBind::new(oid("1.3.6.1.4.1.1.1.0"), Value::Integer(7));
        let written = apply_sync(&tree, MibOperation::Write, vec![vb.clone()]);
        assert_eq!(written, vec![vb.clone()]);

        let out = apply_sync(&tree, MibOperation::Fetch, vec![VarBind::request(vb.oid)]);
        assert_eq!(out[0].value, Value::Integer(7));
    }
}
