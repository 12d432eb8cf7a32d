//! Exact-match index for equality and range lookups
//!
//! BTreeMap of value keys to RoaringBitmaps plus a reverse map for removals.
//! A single RwLock guards both maps, so a lookup never sees an entity moved
//! halfway between two keys.

use super::value_key::{KeyRange, ValueKey};
use super::PropertyIndex;
use crate::types::EntityId;
use ahash::AHashMap;
use parking_lot::RwLock;
use roaring::RoaringBitmap;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Default)]
struct Inner {
    /// value -> entity ids
    tree: BTreeMap<ValueKey, RoaringBitmap>,
    /// entity id -> value (for fast removal)
    reverse: AHashMap<EntityId, ValueKey>,
}

impl Inner {
    fn unlink(&mut self, id: EntityId) {
        if let Some(old) = self.reverse.remove(&id) {
            if let Some(ids) = self.tree.get_mut(&old) {
                ids.remove(id);
                if ids.is_empty() {
                    self.tree.remove(&old);
                }
            }
        }
    }
}

/// Ordered exact-match index over one property
pub struct ExactIndex {
    name: String,
    inner: RwLock<Inner>,
}

impl ExactIndex {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Lookup exact match. Ids come back ascending.
    pub fn lookup_eq(&self, value: &Value) -> RoaringBitmap {
        let Some(key) = ValueKey::from_json(value) else {
            return RoaringBitmap::new();
        };
        self.inner.read().tree.get(&key).cloned().unwrap_or_default()
    }

    /// Lookup `[min, max]` inclusive. A missing bound is open within the
    /// type of the other bound.
    ///
    /// Bounds that are not indexable (null, arrays, objects) match nothing.
    pub fn lookup_range(&self, min: Option<&Value>, max: Option<&Value>) -> RoaringBitmap {
        let Some(range) = KeyRange::new(min, max) else {
            return RoaringBitmap::new();
        };

        let inner = self.inner.read();
        let mut out = RoaringBitmap::new();
        for (_, ids) in inner.tree.range(range) {
            out |= ids;
        }
        out
    }

    /// Value currently indexed for an entity
    pub fn value_of(&self, id: EntityId) -> Option<Value> {
        self.inner.read().reverse.get(&id).map(|k| k.to_json())
    }

    /// Number of distinct indexed values
    pub fn distinct_values(&self) -> usize {
        self.inner.read().tree.len()
    }
}

impl PropertyIndex for ExactIndex {
    fn insert(&self, id: EntityId, value: &Value) {
        let mut inner = self.inner.write();
        inner.unlink(id);
        if let Some(key) = ValueKey::from_json(value) {
            inner.tree.entry(key.clone()).or_default().insert(id);
            inner.reverse.insert(id, key);
        }
    }

    fn remove(&self, id: EntityId) {
        self.inner.write().unlink(id);
    }

    fn contains(&self, id: EntityId) -> bool {
        self.inner.read().reverse.contains_key(&id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self) -> usize {
        self.inner.read().reverse.len()
    }
}
