//! Index manager: the create / drop / usability façade of a graph.
//!
//! Every request is validated completely before the catalog is touched, so a
//! rejected request leaves no trace. Create and drop requests of one graph are
//! serialized with each other and with graph deletion; new BUILDING entries are in the catalog (and therefore seen by
//! interception) before `create_*` returns, and their population is handed to
//! the graph's indexer.

use crate::catalog::IndexEntry;
use crate::error::{IndexError, Result};
use crate::fulltext::{FieldSpec, FullTextOptions};
use crate::graph::Graph;
use crate::types::{normalize_fields, EntityKind, IndexKey, IndexKind, IndexState};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One row of `list()`: all fields of one (owner, label, kind).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub owner: EntityKind,
    pub label: String,
    /// Indexed fields, sorted
    pub properties: Vec<String>,
    pub kind: IndexKind,
    pub language: Option<String>,
    pub stopwords: Option<Vec<String>>,
    /// BUILDING while any field of the row is still building
    pub state: IndexState,
    /// Entities present in the structures, summed over fields
    pub indexed: usize,
}

impl IndexRow {
    pub fn entity_type(&self) -> &'static str {
        self.owner.entity_type()
    }

    pub fn status(&self) -> &'static str {
        self.state.status()
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "label": self.label,
            "properties": self.properties,
            "kind": self.kind.to_string(),
            "entity_type": self.entity_type(),
            "language": self.language,
            "stopwords": self.stopwords,
            "status": self.status(),
            "indexed": self.indexed,
        })
    }
}

/// ZST wrapper for index operations. Compiles to nothing.
pub struct IndexManager<'g>(&'g Graph);

impl<'g> IndexManager<'g> {
    pub(crate) fn new(graph: &'g Graph) -> Self {
        Self(graph)
    }

    fn check_request<S: AsRef<str>>(label: &str, fields: &[S]) -> Result<Vec<String>> {
        if label.is_empty() {
            return Err(IndexError::LabelMissing);
        }
        let fields = normalize_fields(fields);
        if fields.is_empty() || fields.iter().any(|f| f.is_empty()) {
            return Err(IndexError::FieldMissing);
        }
        Ok(fields)
    }

    /// Create an index with default configuration. Returns the number of
    /// entries created (fields already covered count 0).
    pub fn create<S: AsRef<str>>(&self, owner: EntityKind, label: &str, fields: &[S], kind: IndexKind) -> Result<usize> {
        match kind {
            IndexKind::Exact => self.create_exact(owner, label, fields),
            IndexKind::FullText => {
                let specs: Vec<FieldSpec> = fields.iter().map(|f| FieldSpec::named(f.as_ref())).collect();
                self.create_fulltext(owner, &FullTextOptions::new(label), &specs)
            }
        }
    }

    /// Exact-match index over one or more fields of a label/type.
    pub fn create_exact<S: AsRef<str>>(&self, owner: EntityKind, label: &str, fields: &[S]) -> Result<usize> {
        let fields = Self::check_request(label, fields)?;
        let catalog = self.0.catalog();
        let _ddl = catalog.ddl();
        self.0.ensure_live()?;

        let mut created: Vec<Arc<IndexEntry>> = Vec::new();
        for field in &fields {
            let key = IndexKey::new(owner, label, field, IndexKind::Exact);
            if catalog.contains(&key) {
                continue;
            }
            let entry = Arc::new(IndexEntry::exact(key));
            catalog.insert(entry.clone());
            created.push(entry);
        }
        Ok(self.schedule(owner, label, IndexKind::Exact, created))
    }

    /// Full-text index over one or more fields of a label/type.
    ///
    /// The label's language and stopwords are fixed by the first request;
    /// later requests may add fields but fail with `ConfigImmutable` when
    /// they name different index-level or per-field settings.
    pub fn create_fulltext(&self, owner: EntityKind, options: &FullTextOptions, fields: &[FieldSpec]) -> Result<usize> {
        options.validate()?;
        if fields.is_empty() {
            return Err(IndexError::FieldMissing);
        }
        for spec in fields {
            spec.validate()?;
        }

        let label = options.label.as_str();
        let catalog = self.0.catalog();
        let _ddl = catalog.ddl();
        self.0.ensure_live()?;

        let existing = catalog.fulltext_config(owner, label);
        let config = match &existing {
            Some(config) => {
                if config.conflicts_with(options) {
                    tracing::warn!(label, "full-text configuration change rejected");
                    return Err(IndexError::ConfigImmutable);
                }
                config.clone()
            }
            None => options.resolve(&self.0.config().fulltext.language),
        };

        // first descriptor of a field wins; check every conflict before creating anything
        let mut pending: BTreeMap<&str, &FieldSpec> = BTreeMap::new();
        for spec in fields {
            let current = catalog.find(owner, label, &spec.field, IndexKind::FullText);
            if let Some(ft) = current.as_ref().and_then(|e| e.backing().as_fulltext()) {
                if spec.conflicts_with(ft.field_config()) {
                    tracing::warn!(label, field = %spec.field, "full-text field configuration change rejected");
                    return Err(IndexError::ConfigImmutable);
                }
                continue;
            }
            pending.entry(spec.field.as_str()).or_insert(spec);
        }

        if existing.is_none() && !pending.is_empty() {
            catalog.set_fulltext_config(owner, label, config.clone());
        }
        let mut created: Vec<Arc<IndexEntry>> = Vec::new();
        for (field, spec) in pending {
            let key = IndexKey::new(owner, label, field, IndexKind::FullText);
            let entry = Arc::new(IndexEntry::fulltext(key, &config, spec.resolve()));
            catalog.insert(entry.clone());
            created.push(entry);
        }
        Ok(self.schedule(owner, label, IndexKind::FullText, created))
    }

    /// Parse the loose JSON form (`owner` = label or options object, each
    /// field = name or descriptor object) and create.
    pub fn create_fulltext_json(&self, owner: EntityKind, options: &Value, fields: &[Value]) -> Result<usize> {
        let options = FullTextOptions::from_json(options)?;
        let specs = fields.iter().map(FieldSpec::from_json).collect::<Result<Vec<_>>>()?;
        self.create_fulltext(owner, &options, &specs)
    }

    fn schedule(&self, owner: EntityKind, label: &str, kind: IndexKind, created: Vec<Arc<IndexEntry>>) -> usize {
        let count = created.len();
        if count > 0 {
            let fields: Vec<&str> = created.iter().map(|e| e.field()).collect();
            tracing::info!(graph = %self.0.name(), %owner, label, %kind, ?fields, "index created");
            self.0.indexer().schedule(owner, label, created);
        }
        count
    }

    /// Drop exact-match entries of the given fields. Missing ones count 0.
    pub fn drop_exact<S: AsRef<str>>(&self, owner: EntityKind, label: &str, fields: &[S]) -> Result<usize> {
        let fields = Self::check_request(label, fields)?;
        let catalog = self.0.catalog();
        let _ddl = catalog.ddl();
        self.0.ensure_live()?;

        let mut deleted = 0;
        for field in &fields {
            if catalog.remove(&IndexKey::new(owner, label, field, IndexKind::Exact)).is_some() {
                deleted += 1;
            }
        }
        if deleted > 0 {
            tracing::info!(graph = %self.0.name(), %owner, label, deleted, "index dropped");
        }
        Ok(deleted)
    }

    /// Drop a label's full-text index as one unit (1 if it existed). Its
    /// configuration goes with it.
    pub fn drop_fulltext(&self, owner: EntityKind, label: &str) -> Result<usize> {
        if label.is_empty() {
            return Err(IndexError::LabelMissing);
        }
        let catalog = self.0.catalog();
        let _ddl = catalog.ddl();
        self.0.ensure_live()?;

        let mut removed = 0;
        for entry in catalog.for_label(owner, label) {
            if entry.key().kind == IndexKind::FullText && catalog.remove(entry.key()).is_some() {
                removed += 1;
            }
        }
        let had_config = catalog.remove_fulltext_config(owner, label).is_some();
        if removed == 0 && !had_config {
            return Ok(0);
        }
        tracing::info!(graph = %self.0.name(), %owner, label, fields = removed, "full-text index dropped");
        Ok(1)
    }

    /// True iff the entry exists and is OPERATIONAL
    pub fn is_usable(&self, owner: EntityKind, label: &str, field: &str, kind: IndexKind) -> bool {
        self.0
            .catalog()
            .find(owner, label, field, kind)
            .is_some_and(|e| e.is_operational())
    }

    pub fn state(&self, owner: EntityKind, label: &str, field: &str, kind: IndexKind) -> Option<IndexState> {
        self.0.catalog().find(owner, label, field, kind).map(|e| e.state())
    }

    /// Read-only snapshot, one row per (owner, label, kind)
    pub fn list(&self) -> Vec<IndexRow> {
        let catalog = self.0.catalog();
        let mut rows: BTreeMap<(EntityKind, String, IndexKind), IndexRow> = BTreeMap::new();

        for entry in catalog.entries() {
            let key = entry.key();
            let row = rows
                .entry((key.owner, key.label.clone(), key.kind))
                .or_insert_with(|| {
                    let config = match key.kind {
                        IndexKind::FullText => catalog.fulltext_config(key.owner, &key.label),
                        IndexKind::Exact => None,
                    };
                    IndexRow {
                        owner: key.owner,
                        label: key.label.clone(),
                        properties: Vec::new(),
                        kind: key.kind,
                        language: config.as_ref().map(|c| c.language.clone()),
                        stopwords: config.and_then(|c| c.stopwords),
                        state: IndexState::Operational,
                        indexed: 0,
                    }
                });
            row.properties.push(key.field.clone());
            row.indexed += entry.indexed();
            if entry.state() == IndexState::Building {
                row.state = IndexState::Building;
            }
        }

        rows.into_values().collect()
    }
}
