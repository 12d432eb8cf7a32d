//! Query planning over the index catalog.
//!
//! A predicate is served by an index scan only when a matching entry is
//! OPERATIONAL. Anything else (no entry, or an entry still BUILDING) plans a
//! label/type scan followed by a payload filter, so a partially built index is
//! never read.

use crate::catalog::IndexEntry;
use crate::error::Result;
use crate::fulltext::{text_matches, FieldAnalyzer, FieldConfig, FullTextOptions};
use crate::graph::Graph;
use crate::index::{KeyRange, ValueKey};
use crate::store::{EntityStore, Properties};
use crate::types::{EntityId, EntityKind, Hit, IndexKind, Outcome, Plan, PlanOp, Predicate, Query, StepReport, Trace};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// ZST wrapper for query planning. Compiles to nothing.
pub struct Planner<'g>(&'g Graph);

/// (id, score) flowing between plan operations
type Candidates = Vec<(EntityId, f32)>;

impl<'g> Planner<'g> {
    pub(crate) fn new(graph: &'g Graph) -> Self {
        Self(graph)
    }

    /// Operational entry able to serve the query, if any
    fn usable_entry(&self, query: &Query) -> Option<Arc<IndexEntry>> {
        let predicate = &query.predicate;
        self.0
            .catalog()
            .find(query.owner, &query.label, predicate.field(), predicate.index_kind())
            .filter(|e| e.is_operational())
    }

    fn plan_with(query: &Query, entry: Option<&IndexEntry>) -> Plan {
        let mut ops = Vec::with_capacity(3);
        match entry {
            Some(entry) => {
                let field = entry.field().to_string();
                let kind = entry.key().kind;
                ops.push(match query.owner {
                    EntityKind::Node => PlanOp::NodeByIndexScan { label: query.label.clone(), field, kind },
                    EntityKind::Relationship => PlanOp::RelationshipByIndexScan {
                        rel_type: query.label.clone(),
                        field,
                        kind,
                    },
                });
            }
            None => {
                ops.push(match query.owner {
                    EntityKind::Node => PlanOp::LabelScan(query.label.clone()),
                    EntityKind::Relationship => PlanOp::TypeScan(query.label.clone()),
                });
                ops.push(PlanOp::Filter(query.predicate.clone()));
            }
        }
        if let Some(n) = query.limit {
            ops.push(PlanOp::Limit(n));
        }
        Plan { ops }
    }

    /// Plan without executing
    pub fn explain(&self, query: &Query) -> Plan {
        Self::plan_with(query, self.usable_entry(query).as_deref())
    }

    /// Plan and run. The entry chosen at planning time is the one read, even
    /// if it is dropped concurrently.
    pub fn execute(&self, query: &Query) -> Result<Outcome<Vec<Hit>>> {
        self.0.ensure_live()?;
        let entry = self.usable_entry(query);
        let plan = Self::plan_with(query, entry.as_deref());

        let store = self.0.store();
        let mut trace = Trace::default();
        let total_start = Instant::now();
        let mut candidates: Candidates = Vec::new();

        for op in &plan.ops {
            let step_start = Instant::now();
            let input_size = candidates.len();
            let index_used: String;

            match op {
                PlanOp::NodeByIndexScan { .. } | PlanOp::RelationshipByIndexScan { .. } => {
                    let Some(entry) = entry.as_deref() else {
                        continue;
                    };
                    candidates = index_scan(entry, &query.predicate);
                    index_used = entry.key().to_string();
                }
                PlanOp::LabelScan(label) | PlanOp::TypeScan(label) => {
                    candidates = store.members(query.owner).snapshot(label).iter().map(|id| (id, 0.0)).collect();
                    index_used = "label_bitmap".to_string();
                }
                PlanOp::Filter(predicate) => {
                    candidates = self.filter(&store, query, predicate, candidates);
                    index_used = "payload".to_string();
                }
                PlanOp::Limit(n) => {
                    candidates.truncate(*n);
                    index_used = "limit".to_string();
                }
            }

            trace.steps.push(StepReport {
                op: op.name().to_string(),
                input_size,
                output_size: candidates.len(),
                index_used,
                time_us: step_start.elapsed().as_micros() as u64,
            });
        }

        let data = candidates
            .into_iter()
            .filter_map(|(id, score)| {
                let props = store.properties(query.owner, id)?;
                Some(Hit { id, properties: Value::Object(props.clone()), score })
            })
            .collect();
        trace.total_us = total_start.elapsed().as_micros() as u64;
        Ok(Outcome { data, trace })
    }

    /// Ranked full-text search on one field
    pub fn search(&self, owner: EntityKind, label: &str, field: &str, text: &str, limit: usize) -> Result<Outcome<Vec<Hit>>> {
        let query = Query {
            owner,
            label: label.to_string(),
            predicate: Predicate::Matching(field.to_string(), text.to_string()),
            limit: Some(limit),
        };
        self.execute(&query)
    }

    fn filter(&self, store: &EntityStore, query: &Query, predicate: &Predicate, candidates: Candidates) -> Candidates {
        match predicate {
            Predicate::Eq(field, value) => {
                let Some(wanted) = ValueKey::from_json(value) else {
                    return Vec::new();
                };
                filter_props(store, query.owner, candidates, |props| {
                    props.get(field).and_then(ValueKey::from_json).is_some_and(|k| k == wanted)
                })
            }
            Predicate::Range(field, min, max) => {
                let Some(range) = KeyRange::new(min.as_ref(), max.as_ref()) else {
                    return Vec::new();
                };
                filter_props(store, query.owner, candidates, |props| {
                    props
                        .get(field)
                        .and_then(ValueKey::from_json)
                        .is_some_and(|k| range.contains_key(&k))
                })
            }
            Predicate::Matching(field, text) => {
                let mut analyzer = self.fallback_analyzer(query.owner, &query.label, field);
                candidates
                    .into_iter()
                    .filter(|(id, _)| {
                        store
                            .properties(query.owner, *id)
                            .and_then(|p| p.get(field))
                            .and_then(Value::as_str)
                            .is_some_and(|s| text_matches(&mut analyzer, text, s))
                    })
                    .collect()
            }
        }
    }

    /// Analyzer matching what the full-text index (built or not) would use
    fn fallback_analyzer(&self, owner: EntityKind, label: &str, field: &str) -> FieldAnalyzer {
        let catalog = self.0.catalog();
        let config = catalog
            .fulltext_config(owner, label)
            .unwrap_or_else(|| FullTextOptions::default().resolve(&self.0.config().fulltext.language));
        let field_config = catalog
            .find(owner, label, field, IndexKind::FullText)
            .and_then(|e| e.backing().as_fulltext().map(|ft| ft.field_config().clone()))
            .unwrap_or_else(|| FieldConfig::plain(field));
        FieldAnalyzer::new(&config, &field_config)
    }
}

fn index_scan(entry: &IndexEntry, predicate: &Predicate) -> Candidates {
    match predicate {
        Predicate::Eq(_, value) => entry
            .backing()
            .as_exact()
            .map(|idx| idx.lookup_eq(value).iter().map(|id| (id, 0.0)).collect())
            .unwrap_or_default(),
        Predicate::Range(_, min, max) => entry
            .backing()
            .as_exact()
            .map(|idx| idx.lookup_range(min.as_ref(), max.as_ref()).iter().map(|id| (id, 0.0)).collect())
            .unwrap_or_default(),
        Predicate::Matching(_, text) => entry
            .backing()
            .as_fulltext()
            .map(|idx| idx.search(text, usize::MAX).into_iter().map(|h| (h.id, h.score)).collect())
            .unwrap_or_default(),
    }
}

#[cfg(not(feature = "parallel"))]
fn filter_props<F>(store: &EntityStore, owner: EntityKind, candidates: Candidates, keep: F) -> Candidates
where
    F: Fn(&Properties) -> bool,
{
    candidates
        .into_iter()
        .filter(|(id, _)| store.properties(owner, *id).is_some_and(&keep))
        .collect()
}

/// Payload filter fanned out with Rayon; order is preserved.
#[cfg(feature = "parallel")]
fn filter_props<F>(store: &EntityStore, owner: EntityKind, candidates: Candidates, keep: F) -> Candidates
where
    F: Fn(&Properties) -> bool + Sync,
{
    use rayon::prelude::*;

    candidates
        .into_par_iter()
        .filter(|(id, _)| store.properties(owner, *id).is_some_and(&keep))
        .collect()
}
