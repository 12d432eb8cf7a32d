//! LabelBitmapIndex: per-label RoaringBitmaps of entity ids.
//!
//! Gives every node label and relationship type its enumeration order:
//! ascending entity id. Build jobs page through it with [`LabelBitmapIndex::page`]
//! and resume from their cursor after each batch.

use crate::types::EntityId;
use dashmap::DashMap;
use roaring::RoaringBitmap;

pub struct LabelBitmapIndex {
    /// label_hash → bitmap of member ids
    bitmaps: DashMap<u64, RoaringBitmap>,
}

impl Default for LabelBitmapIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelBitmapIndex {
    pub fn new() -> Self {
        Self { bitmaps: DashMap::new() }
    }

    fn hash(label: &str) -> u64 {
        seahash::hash(label.as_bytes())
    }

    /// Add an entity to a label's bitmap.
    pub fn insert(&self, label: &str, id: EntityId) -> bool {
        self.bitmaps.entry(Self::hash(label)).or_default().insert(id)
    }

    /// Remove an entity from a label's bitmap. Empty bitmaps are dropped.
    pub fn remove(&self, label: &str, id: EntityId) -> bool {
        let hash = Self::hash(label);
        let removed = match self.bitmaps.get_mut(&hash) {
            Some(mut bm) => bm.remove(id),
            None => false,
        };
        self.bitmaps.remove_if(&hash, |_, bm| bm.is_empty());
        removed
    }

    pub fn contains(&self, label: &str, id: EntityId) -> bool {
        self.bitmaps
            .get(&Self::hash(label))
            .is_some_and(|bm| bm.contains(id))
    }

    /// Member count of a label
    pub fn len(&self, label: &str) -> u64 {
        self.bitmaps.get(&Self::hash(label)).map_or(0, |bm| bm.len())
    }

    /// Cloned bitmap snapshot for iteration.
    pub fn snapshot(&self, label: &str) -> RoaringBitmap {
        self.bitmaps
            .get(&Self::hash(label))
            .map(|bm| bm.clone())
            .unwrap_or_default()
    }

    /// Up to `limit` member ids `>= from`, ascending.
    pub fn page(&self, label: &str, from: u64, limit: usize) -> Vec<EntityId> {
        let Some(bm) = self.bitmaps.get(&Self::hash(label)) else {
            return Vec::new();
        };
        if from > u64::from(u32::MAX) {
            return Vec::new();
        }

        // rank(x) counts members <= x, so members below `from` are rank(from - 1)
        let skip = if from == 0 { 0 } else { bm.rank(from as u32 - 1) };
        let mut out = Vec::with_capacity(limit.min(bm.len() as usize));
        let mut n = skip;
        while out.len() < limit {
            let Ok(pos) = u32::try_from(n) else { break };
            match bm.select(pos) {
                Some(id) => out.push(id),
                None => break,
            }
            n += 1;
        }
        out
    }
}
