//! Full-text indexes.
//!
//! One `FullTextIndex` covers one field of a label. Every field of a label
//! shares the label's `FullTextConfig` (language + stopwords) and carries its
//! own `FieldConfig` (weight, nostem, phonetic).
//!
//! Storage is an inverted index: token -> {entity -> term frequency}, plus the
//! reverse entity -> tokens map used to unlink an entity on update or delete.
//! Queries are analyzed with the same pipeline; every query word must match
//! (either its token or its sound key) and hits rank by weighted tf-idf.

pub mod analyzer;
pub mod config;
pub mod phonetic;

pub use analyzer::{FieldAnalyzer, Term};
pub use config::{FieldConfig, FieldSpec, FullTextConfig, FullTextOptions};

use crate::index::PropertyIndex;
use crate::types::EntityId;
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use smallvec::SmallVec;

/// Search hit result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: EntityId,
    pub score: f32,
}

/// Sound-key matches count for less than exact token matches
const PHONETIC_BOOST: f32 = 0.5;

#[derive(Default)]
struct Inner {
    /// token -> entity -> term frequency
    postings: AHashMap<String, AHashMap<EntityId, u32>>,
    /// entity -> distinct tokens (for fast removal)
    reverse: AHashMap<EntityId, SmallVec<[String; 8]>>,
}

impl Inner {
    fn unlink(&mut self, id: EntityId) {
        let Some(tokens) = self.reverse.remove(&id) else {
            return;
        };
        for token in tokens {
            if let Some(list) = self.postings.get_mut(&token) {
                list.remove(&id);
                if list.is_empty() {
                    self.postings.remove(&token);
                }
            }
        }
    }

    fn idf(&self, df: usize) -> f32 {
        let n = self.reverse.len().max(1) as f32;
        (1.0 + n / df.max(1) as f32).ln()
    }
}

/// Inverted index over one string property
pub struct FullTextIndex {
    field: FieldConfig,
    analyzer: Mutex<FieldAnalyzer>,
    inner: RwLock<Inner>,
}

impl FullTextIndex {
    pub fn new(config: &FullTextConfig, field: FieldConfig) -> Self {
        let analyzer = FieldAnalyzer::new(config, &field);
        Self {
            field,
            analyzer: Mutex::new(analyzer),
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn field_config(&self) -> &FieldConfig {
        &self.field
    }

    /// Ranked search. Words are ANDed; `limit` caps the hit list.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let terms = self.analyzer.lock().terms(query);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let inner = self.inner.read();
        let weight = self.field.weight as f32;
        let mut scores: Option<AHashMap<EntityId, f32>> = None;

        for term in &terms {
            let mut word_scores: AHashMap<EntityId, f32> = AHashMap::new();
            if let Some(list) = inner.postings.get(&term.token) {
                let idf = inner.idf(list.len());
                for (&id, &tf) in list {
                    *word_scores.entry(id).or_default() += tf as f32 * idf;
                }
            }
            if let Some(list) = term.phonetic.as_ref().and_then(|p| inner.postings.get(p)) {
                let idf = inner.idf(list.len());
                for (&id, &tf) in list {
                    *word_scores.entry(id).or_default() += tf as f32 * idf * PHONETIC_BOOST;
                }
            }

            scores = Some(match scores {
                None => word_scores,
                Some(mut acc) => {
                    acc.retain(|id, _| word_scores.contains_key(id));
                    for (id, s) in acc.iter_mut() {
                        *s += word_scores.get(id).copied().unwrap_or_default();
                    }
                    acc
                }
            });
            if scores.as_ref().is_some_and(|s| s.is_empty()) {
                return Vec::new();
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .unwrap_or_default()
            .into_iter()
            .map(|(id, s)| SearchHit { id, score: s * weight })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        hits
    }

    /// Number of distinct tokens (sound keys included)
    pub fn vocabulary(&self) -> usize {
        self.inner.read().postings.len()
    }
}

impl PropertyIndex for FullTextIndex {
    fn insert(&self, id: EntityId, value: &Value) {
        let tokens = match value {
            Value::String(text) => self.analyzer.lock().tokens(text),
            _ => Vec::new(),
        };

        let mut tf: AHashMap<String, u32> = AHashMap::new();
        for token in tokens {
            *tf.entry(token).or_default() += 1;
        }

        let mut inner = self.inner.write();
        inner.unlink(id);
        if tf.is_empty() {
            return;
        }
        let mut distinct: SmallVec<[String; 8]> = SmallVec::with_capacity(tf.len());
        for (token, count) in tf {
            inner.postings.entry(token.clone()).or_default().insert(id, count);
            distinct.push(token);
        }
        inner.reverse.insert(id, distinct);
    }

    fn remove(&self, id: EntityId) {
        self.inner.write().unlink(id);
    }

    fn contains(&self, id: EntityId) -> bool {
        self.inner.read().reverse.contains_key(&id)
    }

    fn name(&self) -> &str {
        &self.field.name
    }

    fn count(&self) -> usize {
        self.inner.read().reverse.len()
    }
}

/// Containment test used when no operational index can serve a match:
/// every query word must appear in `text` (by token or sound key).
pub fn text_matches(analyzer: &mut FieldAnalyzer, query: &str, text: &str) -> bool {
    let wanted = analyzer.terms(query);
    if wanted.is_empty() {
        return false;
    }
    let have = analyzer.terms(text);
    wanted.iter().all(|w| {
        have.iter().any(|h| {
            h.token == w.token || (w.phonetic.is_some() && h.phonetic == w.phonetic)
        })
    })
}
