//! JSON command surface: `{"call": <name>, ...}`.
//!
//! ```json
//! {"call": "create_index", "label": "person", "fields": ["age", "name"]}
//! {"call": "create_fulltext_index", "label": {"label": "doc", "language": "german"}, "fields": ["title", {"field": "body", "weight": 2}]}
//! {"call": "drop_index", "entity": "relationship", "label": "KNOWS", "fields": ["since"]}
//! {"call": "drop_fulltext_index", "label": "doc"}
//! {"call": "indexes"}
//! {"call": "explain", "label": "person", "where": {"field": "age", "eq": 41}}
//! {"call": "query", "label": "person", "where": {"field": "age", "min": 18}, "limit": 10}
//! {"call": "search", "label": "doc", "field": "body", "text": "fox", "limit": 5}
//! ```

use crate::error::{IndexError, Result};
use crate::graph::Graph;
use crate::types::{EntityKind, IndexKind, Predicate, Query};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Known call names
pub const CALLS: &[&str] = &[
    "create_index",
    "create_fulltext_index",
    "drop_index",
    "drop_fulltext_index",
    "indexes",
    "explain",
    "query",
    "search",
];

/// Calls that may create their target graph
pub const CREATE_CALLS: &[&str] = &["create_index", "create_fulltext_index"];

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "call")]
pub enum Command {
    #[serde(rename = "create_index")]
    CreateIndex {
        entity: Option<EntityKind>,
        label: Option<Value>,
        fields: Option<Vec<Value>>,
        kind: Option<IndexKind>,
    },
    #[serde(rename = "create_fulltext_index")]
    CreateFullTextIndex {
        entity: Option<EntityKind>,
        label: Option<Value>,
        fields: Option<Vec<Value>>,
    },
    #[serde(rename = "drop_index")]
    DropIndex {
        entity: Option<EntityKind>,
        label: Option<String>,
        fields: Option<Vec<String>>,
    },
    #[serde(rename = "drop_fulltext_index")]
    DropFullTextIndex { entity: Option<EntityKind>, label: Option<String> },
    #[serde(rename = "indexes")]
    Indexes,
    #[serde(rename = "explain")]
    Explain {
        entity: Option<EntityKind>,
        label: Option<String>,
        #[serde(rename = "where")]
        filter: Option<WhereDef>,
        limit: Option<usize>,
    },
    #[serde(rename = "query")]
    Query {
        entity: Option<EntityKind>,
        label: Option<String>,
        #[serde(rename = "where")]
        filter: Option<WhereDef>,
        limit: Option<usize>,
    },
    #[serde(rename = "search")]
    Search {
        entity: Option<EntityKind>,
        label: Option<String>,
        field: Option<String>,
        text: Option<String>,
        limit: Option<usize>,
    },
}

/// Predicate of `explain` / `query`: exactly one of `eq`, `min`/`max`, `matching`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct WhereDef {
    pub field: Option<String>,
    pub eq: Option<Value>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub matching: Option<String>,
}

impl WhereDef {
    pub fn to_predicate(&self) -> Result<Predicate> {
        let field = self.field.clone().ok_or(IndexError::FieldMissing)?;
        match (&self.eq, &self.matching) {
            (Some(value), None) if self.min.is_none() && self.max.is_none() => Ok(Predicate::Eq(field, value.clone())),
            (None, Some(text)) if self.min.is_none() && self.max.is_none() => {
                Ok(Predicate::Matching(field, text.clone()))
            }
            (None, None) if self.min.is_some() || self.max.is_some() => {
                Ok(Predicate::Range(field, self.min.clone(), self.max.clone()))
            }
            _ => Err(IndexError::InvalidCommand(
                "where: expected exactly one of eq, min/max, matching".to_string(),
            )),
        }
    }
}

/// Name of the call in a raw command, validated against [`CALLS`]
pub fn call_name(value: &Value) -> Result<&str> {
    let name = value
        .get("call")
        .and_then(Value::as_str)
        .ok_or_else(|| IndexError::InvalidCommand("missing \"call\"".to_string()))?;
    if !CALLS.contains(&name) {
        return Err(IndexError::UnknownCall(name.to_string()));
    }
    Ok(name)
}

/// Parse a raw command
pub fn parse(json: &str) -> Result<Command> {
    let value: Value = serde_json::from_str(json)?;
    call_name(&value)?;
    serde_json::from_value(value).map_err(|e| IndexError::InvalidCommand(e.to_string()))
}

pub(crate) fn call(graph: &Graph, json: &str) -> Result<Value> {
    let command = parse(json)?;
    tracing::debug!(graph = %graph.name(), ?command, "call");
    command.run(graph)
}

fn required_label(label: Option<String>) -> Result<String> {
    label.filter(|l| !l.is_empty()).ok_or(IndexError::LabelMissing)
}

fn string_fields(fields: Vec<Value>) -> Result<Vec<String>> {
    fields
        .into_iter()
        .map(|f| match f {
            Value::String(s) => Ok(s),
            _ => Err(IndexError::InvalidFieldType),
        })
        .collect()
}

fn query_of(entity: Option<EntityKind>, label: Option<String>, filter: Option<WhereDef>, limit: Option<usize>) -> Result<Query> {
    let label = required_label(label)?;
    let predicate = filter.ok_or(IndexError::FieldMissing)?.to_predicate()?;
    Ok(Query { owner: entity.unwrap_or(EntityKind::Node), label, predicate, limit })
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateIndex { .. } => "create_index",
            Command::CreateFullTextIndex { .. } => "create_fulltext_index",
            Command::DropIndex { .. } => "drop_index",
            Command::DropFullTextIndex { .. } => "drop_fulltext_index",
            Command::Indexes => "indexes",
            Command::Explain { .. } => "explain",
            Command::Query { .. } => "query",
            Command::Search { .. } => "search",
        }
    }

    pub fn run(self, graph: &Graph) -> Result<Value> {
        let indexes = graph.indexes();
        match self {
            Command::CreateIndex { entity, label, fields, kind } => {
                let owner = entity.unwrap_or(EntityKind::Node);
                let fields = fields.unwrap_or_default();
                let created = match kind.unwrap_or(IndexKind::Exact) {
                    IndexKind::FullText => {
                        indexes.create_fulltext_json(owner, &label.unwrap_or(Value::Null), &fields)?
                    }
                    IndexKind::Exact => {
                        let label = match label {
                            Some(Value::String(s)) => s,
                            _ => return Err(IndexError::LabelMissing),
                        };
                        indexes.create_exact(owner, &label, &string_fields(fields)?)?
                    }
                };
                Ok(json!({ "indices_created": created }))
            }
            Command::CreateFullTextIndex { entity, label, fields } => {
                let owner = entity.unwrap_or(EntityKind::Node);
                let created =
                    indexes.create_fulltext_json(owner, &label.unwrap_or(Value::Null), &fields.unwrap_or_default())?;
                Ok(json!({ "indices_created": created }))
            }
            Command::DropIndex { entity, label, fields } => {
                let label = required_label(label)?;
                let deleted = indexes.drop_exact(entity.unwrap_or(EntityKind::Node), &label, &fields.unwrap_or_default())?;
                Ok(json!({ "indices_deleted": deleted }))
            }
            Command::DropFullTextIndex { entity, label } => {
                let label = required_label(label)?;
                let deleted = indexes.drop_fulltext(entity.unwrap_or(EntityKind::Node), &label)?;
                Ok(json!({ "indices_deleted": deleted }))
            }
            Command::Indexes => {
                let rows: Vec<Value> = indexes.list().iter().map(|r| r.to_json()).collect();
                Ok(json!({ "indexes": rows }))
            }
            Command::Explain { entity, label, filter, limit } => {
                let query = query_of(entity, label, filter, limit)?;
                Ok(json!({ "plan": graph.explain(&query).to_json() }))
            }
            Command::Query { entity, label, filter, limit } => {
                let query = query_of(entity, label, filter, limit)?;
                let outcome = graph.execute(&query)?;
                let hits: Vec<Value> = outcome.data.iter().map(|h| h.to_json()).collect();
                Ok(json!({ "hits": hits, "trace": outcome.trace.to_json() }))
            }
            Command::Search { entity, label, field, text, limit } => {
                let label = required_label(label)?;
                let field = field.filter(|f| !f.is_empty()).ok_or(IndexError::FieldMissing)?;
                let text = text.unwrap_or_default();
                let outcome = graph.planner().search(
                    entity.unwrap_or(EntityKind::Node),
                    &label,
                    &field,
                    &text,
                    limit.unwrap_or(10),
                )?;
                let hits: Vec<Value> = outcome.data.iter().map(|h| h.to_json()).collect();
                Ok(json!({ "hits": hits, "trace": outcome.trace.to_json() }))
            }
        }
    }
}
