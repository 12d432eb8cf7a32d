//! Property Index Module
//!
//! Backing structures for catalog entries.
//!
//! Design:
//! - ExactIndex: ordered value -> ids map (equality + range)
//! - FullTextIndex: inverted postings token -> {id -> tf} (see `crate::fulltext`)
//! - Every structure guards itself; callers never lock around it
//! - `insert` replaces whatever the entity had before, so re-inserting is safe

mod exact;
mod value_key;

pub use exact::ExactIndex;
pub use value_key::{KeyRange, NumKey, ValueKey};

use crate::fulltext::FullTextIndex;
use crate::types::{EntityId, IndexKind};
use serde_json::Value;

/// Property index trait
pub trait PropertyIndex: Send + Sync {
    /// Insert (or replace) the value for an entity
    fn insert(&self, id: EntityId, value: &Value);

    /// Remove an entity from the index
    fn remove(&self, id: EntityId);

    /// Whether the entity currently has an entry
    fn contains(&self, id: EntityId) -> bool;

    /// Get index name
    fn name(&self) -> &str;

    /// Get indexed entity count
    fn count(&self) -> usize;
}

/// The structure owned by one catalog entry
pub enum IndexBacking {
    Exact(ExactIndex),
    FullText(FullTextIndex),
}

impl IndexBacking {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexBacking::Exact(_) => IndexKind::Exact,
            IndexBacking::FullText(_) => IndexKind::FullText,
        }
    }

    pub fn as_index(&self) -> &dyn PropertyIndex {
        match self {
            IndexBacking::Exact(idx) => idx,
            IndexBacking::FullText(idx) => idx,
        }
    }

    pub fn as_exact(&self) -> Option<&ExactIndex> {
        match self {
            IndexBacking::Exact(idx) => Some(idx),
            IndexBacking::FullText(_) => None,
        }
    }

    pub fn as_fulltext(&self) -> Option<&FullTextIndex> {
        match self {
            IndexBacking::FullText(idx) => Some(idx),
            IndexBacking::Exact(_) => None,
        }
    }
}
