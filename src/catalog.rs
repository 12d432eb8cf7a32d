//! Index catalog: one entry per (owner, label, field, kind).
//!
//! Entries are shared (`Arc`) between the catalog, the build job populating
//! them and any in-flight interception. Removing an entry from the catalog
//! marks it dropped; holders notice at their next check and let go.

use crate::fulltext::{FieldConfig, FullTextConfig, FullTextIndex};
use crate::index::{ExactIndex, IndexBacking};
use crate::types::{EntityId, EntityKind, IndexKey, IndexKind, IndexState};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

// ============ BUILD CURSOR ============

/// Position in the ascending id enumeration of a label.
///
/// Ids below the position have been read by the builder. The position only
/// moves forward.
#[derive(Debug, Default)]
pub struct BuildCursor(AtomicU64);

impl BuildCursor {
    /// Past every possible id
    pub const DONE: u64 = 1 << 32;

    pub fn position(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn visited(&self, id: EntityId) -> bool {
        u64::from(id) < self.position()
    }

    pub fn is_done(&self) -> bool {
        self.position() >= Self::DONE
    }

    /// Move forward to `pos`; never moves back.
    pub(crate) fn advance_to(&self, pos: u64) {
        self.0.fetch_max(pos.min(Self::DONE), Ordering::AcqRel);
    }
}

// ============ INDEX ENTRY ============

pub struct IndexEntry {
    key: IndexKey,
    state: AtomicU8,
    cursor: BuildCursor,
    dropped: AtomicBool,
    backing: IndexBacking,
}

impl IndexEntry {
    pub(crate) fn exact(key: IndexKey) -> Self {
        let backing = IndexBacking::Exact(ExactIndex::new(&key.field));
        Self::with_backing(key, backing)
    }

    pub(crate) fn fulltext(key: IndexKey, config: &FullTextConfig, field: FieldConfig) -> Self {
        let backing = IndexBacking::FullText(FullTextIndex::new(config, field));
        Self::with_backing(key, backing)
    }

    fn with_backing(key: IndexKey, backing: IndexBacking) -> Self {
        Self {
            key,
            state: AtomicU8::new(IndexState::Building as u8),
            cursor: BuildCursor::default(),
            dropped: AtomicBool::new(false),
            backing,
        }
    }

    pub fn key(&self) -> &IndexKey {
        &self.key
    }

    pub fn field(&self) -> &str {
        &self.key.field
    }

    pub fn state(&self) -> IndexState {
        IndexState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_operational(&self) -> bool {
        self.state() == IndexState::Operational
    }

    pub fn cursor(&self) -> &BuildCursor {
        &self.cursor
    }

    pub fn backing(&self) -> &IndexBacking {
        &self.backing
    }

    /// Entities currently present in the structure
    pub fn indexed(&self) -> usize {
        self.backing.as_index().count()
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dropped(&self) {
        self.dropped.store(true, Ordering::Release);
    }

    /// Flip BUILDING -> OPERATIONAL. True only for the call that flipped.
    pub(crate) fn mark_operational(&self) -> bool {
        self.state
            .compare_exchange(
                IndexState::Building as u8,
                IndexState::Operational as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Whether a foreground change to `id` must be applied here now.
    /// Unvisited entities are left to the builder.
    pub(crate) fn intercepts(&self, id: EntityId) -> bool {
        !self.is_dropped() && (self.is_operational() || self.cursor.visited(id))
    }

    /// Insert (`Some`) or remove (`None`) the entity's value
    pub(crate) fn apply(&self, id: EntityId, value: Option<&Value>) {
        let index = self.backing.as_index();
        match value {
            Some(v) => index.insert(id, v),
            None => index.remove(id),
        }
    }
}

impl std::fmt::Debug for IndexEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexEntry")
            .field("key", &self.key)
            .field("state", &self.state())
            .field("cursor", &self.cursor.position())
            .field("dropped", &self.is_dropped())
            .finish()
    }
}

// ============ CATALOG ============

type LabelKey = (EntityKind, String);

/// Per-graph registry of index entries
#[derive(Default)]
pub struct Catalog {
    /// (owner, label) → entries of every field and kind
    labels: DashMap<LabelKey, Vec<Arc<IndexEntry>>>,
    /// (owner, label) → immutable full-text configuration
    fulltext: DashMap<LabelKey, FullTextConfig>,
    /// serializes create/drop requests
    ddl: Mutex<()>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn label_key(owner: EntityKind, label: &str) -> LabelKey {
        (owner, label.to_string())
    }

    pub(crate) fn ddl(&self) -> MutexGuard<'_, ()> {
        self.ddl.lock()
    }

    pub fn get(&self, key: &IndexKey) -> Option<Arc<IndexEntry>> {
        self.labels
            .get(&Self::label_key(key.owner, &key.label))?
            .iter()
            .find(|e| e.key() == key)
            .cloned()
    }

    pub fn contains(&self, key: &IndexKey) -> bool {
        self.get(key).is_some()
    }

    /// Live entries of one label/type
    pub fn for_label(&self, owner: EntityKind, label: &str) -> Vec<Arc<IndexEntry>> {
        self.labels
            .get(&Self::label_key(owner, label))
            .map(|entries| entries.iter().filter(|e| !e.is_dropped()).cloned().collect())
            .unwrap_or_default()
    }

    /// Entry for one field of a label, if any (any kind)
    pub fn find(&self, owner: EntityKind, label: &str, field: &str, kind: IndexKind) -> Option<Arc<IndexEntry>> {
        self.get(&IndexKey::new(owner, label, field, kind))
    }

    pub(crate) fn insert(&self, entry: Arc<IndexEntry>) {
        let key = Self::label_key(entry.key().owner, &entry.key().label);
        self.labels.entry(key).or_default().push(entry);
    }

    /// Remove an entry and mark it dropped
    pub(crate) fn remove(&self, key: &IndexKey) -> Option<Arc<IndexEntry>> {
        let label_key = Self::label_key(key.owner, &key.label);
        let removed = {
            let mut entries = self.labels.get_mut(&label_key)?;
            let pos = entries.iter().position(|e| e.key() == key)?;
            entries.remove(pos)
        };
        self.labels.remove_if(&label_key, |_, entries| entries.is_empty());
        removed.mark_dropped();
        Some(removed)
    }

    pub fn fulltext_config(&self, owner: EntityKind, label: &str) -> Option<FullTextConfig> {
        self.fulltext.get(&Self::label_key(owner, label)).map(|c| c.clone())
    }

    pub(crate) fn set_fulltext_config(&self, owner: EntityKind, label: &str, config: FullTextConfig) {
        self.fulltext.insert(Self::label_key(owner, label), config);
    }

    pub(crate) fn remove_fulltext_config(&self, owner: EntityKind, label: &str) -> Option<FullTextConfig> {
        self.fulltext.remove(&Self::label_key(owner, label)).map(|(_, c)| c)
    }

    /// Snapshot of all entries, ordered by key
    pub fn entries(&self) -> Vec<Arc<IndexEntry>> {
        let mut out: Vec<Arc<IndexEntry>> = self
            .labels
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| a.key().cmp(b.key()));
        out
    }

    pub fn len(&self) -> usize {
        self.labels.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Drop everything (graph teardown)
    pub(crate) fn clear(&self) {
        for entry in self.labels.iter() {
            for e in entry.value() {
                e.mark_dropped();
            }
        }
        self.labels.clear();
        self.fulltext.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exact(label: &str, field: &str) -> Arc<IndexEntry> {
        Arc::new(IndexEntry::exact(IndexKey::new(EntityKind::Node, label, field, IndexKind::Exact)))
    }

    #[test]
    fn test_cursor_monotonic() {
        let cursor = BuildCursor::default();
        assert!(!cursor.visited(0));
        cursor.advance_to(10);
        cursor.advance_to(4);
        assert_eq!(cursor.position(), 10);
        assert!(cursor.visited(9));
        assert!(!cursor.visited(10));
        cursor.advance_to(u64::MAX);
        assert!(cursor.is_done());
        assert!(cursor.visited(u32::MAX));
    }

    #[test]
    fn test_entry_flips_once() {
        let entry = exact("L", "v");
        assert_eq!(entry.state(), IndexState::Building);
        assert!(entry.mark_operational());
        assert!(!entry.mark_operational());
        assert!(entry.is_operational());
    }

    #[test]
    fn test_intercepts_visited_or_operational() {
        let entry = exact("L", "v");
        assert!(!entry.intercepts(3));
        entry.cursor().advance_to(4);
        assert!(entry.intercepts(3));
        assert!(!entry.intercepts(4));
        entry.mark_operational();
        assert!(entry.intercepts(4));
        entry.mark_dropped();
        assert!(!entry.intercepts(3));
    }

    #[test]
    fn test_apply_insert_and_remove() {
        let entry = exact("L", "v");
        entry.apply(1, Some(&json!(5)));
        assert_eq!(entry.indexed(), 1);
        entry.apply(1, None);
        assert_eq!(entry.indexed(), 0);
    }

    #[test]
    fn test_catalog_insert_find_remove() {
        let catalog = Catalog::new();
        catalog.insert(exact("L", "a"));
        catalog.insert(exact("L", "b"));
        catalog.insert(exact("M", "a"));

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.for_label(EntityKind::Node, "L").len(), 2);
        assert!(catalog.for_label(EntityKind::Relationship, "L").is_empty());
        assert!(catalog.find(EntityKind::Node, "L", "a", IndexKind::Exact).is_some());
        assert!(catalog.find(EntityKind::Node, "L", "a", IndexKind::FullText).is_none());

        let key = IndexKey::new(EntityKind::Node, "L", "a", IndexKind::Exact);
        let removed = catalog.remove(&key).unwrap();
        assert!(removed.is_dropped());
        assert!(catalog.remove(&key).is_none());
        assert_eq!(catalog.len(), 2);

        let keys: Vec<_> = catalog.entries().iter().map(|e| e.key().clone()).collect();
        assert_eq!(keys[0].label, "L");
        assert_eq!(keys[1].label, "M");
    }

    #[test]
    fn test_clear_marks_everything_dropped() {
        let catalog = Catalog::new();
        let entry = exact("L", "a");
        catalog.insert(entry.clone());
        catalog.set_fulltext_config(EntityKind::Node, "L", FullTextConfig::default());

        catalog.clear();
        assert!(entry.is_dropped());
        assert!(catalog.is_empty());
        assert!(catalog.fulltext_config(EntityKind::Node, "L").is_none());
    }
}
