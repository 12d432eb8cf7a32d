// Sekejap Index - online secondary indexes for an embedded property graph
// Exact-match and full-text indexes built in the background while the graph stays writable

pub mod types;
pub mod error;
pub mod config;
pub mod index;
pub mod fulltext;
pub mod label_bitmap;
pub mod store;
pub mod catalog;
pub mod builder;
pub mod indexer;
mod interceptor;
pub mod graph;
pub mod stores;
pub mod manager;
pub mod planner;
pub mod procedures;
pub mod keyspace;

// Re-export main types
pub use config::{BuildMode, FullTextDefaults, GraphConfig, IndexerConfig};
pub use error::{IndexError, Result};
pub use fulltext::{FieldSpec, FullTextOptions};
pub use graph::Graph;
pub use keyspace::Keyspace;
pub use manager::{IndexManager, IndexRow};
pub use stores::{NodeStore, RelationshipStore};
pub use types::{
    EntityId, EntityKind, Hit, IndexKey, IndexKind, IndexState, Outcome, Plan, PlanOp, Predicate, Query, Trace,
};
