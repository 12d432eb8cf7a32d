//! Graph and indexer configuration.
//!
//! # Example
//! ```ignore
//! use sekejap_index::config::{GraphConfig, IndexerConfig, BuildMode};
//!
//! // Background worker thread (default)
//! let config = GraphConfig::default();
//!
//! // Caller-driven builds, small batches
//! let config = GraphConfig::new(IndexerConfig::new(BuildMode::Manual).batch_size(64));
//! ```

use serde::Deserialize;
use std::time::Duration;

use crate::error::Result;

/// How index build jobs are driven - selectable at runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Dedicated worker thread per graph (default)
    #[default]
    Background,

    /// Jobs only advance when the caller invokes `Indexer::step`
    Manual,
}

impl BuildMode {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "manual" | "sync" | "step" | "off" => BuildMode::Manual,
            "background" | "async" | "thread" | "on" => BuildMode::Background,
            _ => BuildMode::default(),
        }
    }
}

/// Index builder configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Build mode
    pub mode: BuildMode,
    /// Entities visited per batch (the graph lock is released between batches)
    pub batch_size: usize,
    /// How long an idle worker parks before re-checking its queue, in milliseconds
    pub idle_park_ms: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            mode: BuildMode::default(),
            batch_size: 10_000,
            idle_park_ms: 50,
        }
    }
}

impl IndexerConfig {
    /// Create config with specific mode
    pub fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set build mode
    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set batch size (clamped to at least 1)
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    pub fn idle_park(&self) -> Duration {
        Duration::from_millis(self.idle_park_ms.max(1))
    }
}

/// Defaults applied to full-text indexes created without explicit options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FullTextDefaults {
    pub language: String,
}

impl Default for FullTextDefaults {
    fn default() -> Self {
        Self { language: "english".to_string() }
    }
}

/// Per-graph configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub indexer: IndexerConfig,
    pub fulltext: FullTextDefaults,
}

impl GraphConfig {
    pub fn new(indexer: IndexerConfig) -> Self {
        Self {
            indexer,
            ..Default::default()
        }
    }

    /// Shorthand for a caller-driven graph
    pub fn manual() -> Self {
        Self::new(IndexerConfig::new(BuildMode::Manual))
    }

    /// Load from a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: GraphConfig = serde_json::from_str(json)?;
        config.indexer.batch_size = config.indexer.batch_size.max(1);
        Ok(config)
    }
}
