use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Arena id of a node or relationship. Assigned in creation order, never reused.
pub type EntityId = u32;

/// Owner of an index: node labels or relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[serde(alias = "NODE")]
    Node,
    #[serde(alias = "rel", alias = "edge", alias = "RELATIONSHIP")]
    Relationship,
}

impl EntityKind {
    /// Column value used by `indexes` listings
    pub fn entity_type(&self) -> &'static str {
        match self {
            EntityKind::Node => "NODE",
            EntityKind::Relationship => "RELATIONSHIP",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => write!(f, "Node"),
            EntityKind::Relationship => write!(f, "Relationship"),
        }
    }
}

/// Index variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Ordered exact-match index (equality + range)
    Exact,
    /// Inverted full-text index
    #[serde(alias = "full_text", alias = "full-text")]
    FullText,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Exact => write!(f, "exact-match"),
            IndexKind::FullText => write!(f, "full-text"),
        }
    }
}

/// Lifecycle state of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IndexState {
    Building = 0,
    Operational = 1,
}

impl IndexState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        if raw == IndexState::Operational as u8 {
            IndexState::Operational
        } else {
            IndexState::Building
        }
    }

    /// `status` column as shown by `indexes`
    pub fn status(&self) -> &'static str {
        match self {
            IndexState::Building => "UNDER CONSTRUCTION",
            IndexState::Operational => "OPERATIONAL",
        }
    }
}

/// Identity of one catalog entry. One entry covers exactly one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey {
    pub owner: EntityKind,
    pub label: String,
    pub field: String,
    pub kind: IndexKind,
}

impl IndexKey {
    pub fn new(owner: EntityKind, label: &str, field: &str, kind: IndexKind) -> Self {
        Self {
            owner,
            label: label.to_string(),
            field: field.to_string(),
            kind,
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}({})", self.kind, self.owner, self.label, self.field)
    }
}

/// Sort and dedup a requested field list so permutations and repeats collide.
pub fn normalize_fields<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    let mut out: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
    out.sort_unstable();
    out.dedup();
    out
}

// ============ QUERY TYPES ============

/// A single filter understood by the planner.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// field = value
    Eq(String, Value),
    /// min <= field <= max, either bound optional
    Range(String, Option<Value>, Option<Value>),
    /// full-text match of `text` against field
    Matching(String, String),
}

impl Predicate {
    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq(f, _) | Predicate::Range(f, _, _) | Predicate::Matching(f, _) => f,
        }
    }

    /// Index kind that can serve this predicate
    pub fn index_kind(&self) -> IndexKind {
        match self {
            Predicate::Matching(_, _) => IndexKind::FullText,
            _ => IndexKind::Exact,
        }
    }
}

/// Query against one label/type with a single predicate.
#[derive(Clone, Debug)]
pub struct Query {
    pub owner: EntityKind,
    pub label: String,
    pub predicate: Predicate,
    pub limit: Option<usize>,
}

impl Query {
    pub fn nodes(label: &str, predicate: Predicate) -> Self {
        Self { owner: EntityKind::Node, label: label.to_string(), predicate, limit: None }
    }

    pub fn relationships(rel_type: &str, predicate: Predicate) -> Self {
        Self { owner: EntityKind::Relationship, label: rel_type.to_string(), predicate, limit: None }
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// One operation of an execution plan.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanOp {
    /// Full enumeration of a node label
    LabelScan(String),
    /// Full enumeration of a relationship type
    TypeScan(String),
    /// Node index lookup on (label, field)
    NodeByIndexScan { label: String, field: String, kind: IndexKind },
    /// Relationship index lookup on (type, field)
    RelationshipByIndexScan { rel_type: String, field: String, kind: IndexKind },
    /// Payload filter applied to scanned candidates
    Filter(Predicate),
    /// Result limit
    Limit(usize),
}

impl PlanOp {
    /// Operation name as printed by `explain`
    pub fn name(&self) -> &'static str {
        match self {
            PlanOp::LabelScan(_) => "Node By Label Scan",
            PlanOp::TypeScan(_) => "Relationship By Type Scan",
            PlanOp::NodeByIndexScan { .. } => "Node By Index Scan",
            PlanOp::RelationshipByIndexScan { .. } => "Relationship By Index Scan",
            PlanOp::Filter(_) => "Filter",
            PlanOp::Limit(_) => "Limit",
        }
    }

    pub fn is_index_scan(&self) -> bool {
        matches!(self, PlanOp::NodeByIndexScan { .. } | PlanOp::RelationshipByIndexScan { .. })
    }
}

/// Plan type returned by explain()
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub ops: Vec<PlanOp>,
}

impl Plan {
    /// Find the first operation with the given explain name
    pub fn locate(&self, name: &str) -> Option<&PlanOp> {
        self.ops.iter().find(|op| op.name() == name)
    }

    pub fn uses_index(&self) -> bool {
        self.ops.iter().any(|op| op.is_index_scan())
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.ops.iter().map(|op| Value::String(op.name().to_string())).collect())
    }
}

/// Execution trace for observability
#[derive(Clone, Debug)]
pub struct StepReport {
    pub op: String,
    pub input_size: usize,
    pub output_size: usize,
    pub index_used: String,
    pub time_us: u64,
}

/// Trace containing step-by-step execution report
#[derive(Clone, Debug, Default)]
pub struct Trace {
    pub steps: Vec<StepReport>,
    pub total_us: u64,
}

impl Trace {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "steps": self.steps.iter().map(|s| serde_json::json!({
                "op": s.op,
                "input_size": s.input_size,
                "output_size": s.output_size,
                "index_used": s.index_used,
                "time_us": s.time_us
            })).collect::<Vec<_>>(),
            "total_us": self.total_us
        })
    }
}

/// Every query returns Outcome<T>: data plus trace
#[derive(Clone, Debug)]
pub struct Outcome<T> {
    pub data: T,
    pub trace: Trace,
}

/// A resolved entity with its properties
#[derive(Clone, Debug)]
pub struct Hit {
    pub id: EntityId,
    pub properties: Value,
    /// Relevance for full-text matches, 0 otherwise
    pub score: f32,
}

impl Hit {
    pub fn to_json(&self) -> Value {
        serde_json::json!({ "id": self.id, "properties": self.properties, "score": self.score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fields_collapses_permutations() {
        assert_eq!(normalize_fields(&["name", "age"]), normalize_fields(&["age", "name"]));
        assert_eq!(normalize_fields(&["age", "age", "name", "height"]), vec!["age", "height", "name"]);
    }

    #[test]
    fn test_state_status_strings() {
        assert_eq!(IndexState::Building.status(), "UNDER CONSTRUCTION");
        assert_eq!(IndexState::Operational.status(), "OPERATIONAL");
        assert_eq!(IndexState::from_u8(IndexState::Operational as u8), IndexState::Operational);
        assert_eq!(IndexState::from_u8(0), IndexState::Building);
    }

    #[test]
    fn test_plan_locate() {
        let plan = Plan {
            ops: vec![
                PlanOp::LabelScan("L".into()),
                PlanOp::Filter(Predicate::Eq("v".into(), serde_json::json!(41))),
            ],
        };
        assert!(plan.locate("Node By Index Scan").is_none());
        assert!(plan.locate("Filter").is_some());
        assert!(!plan.uses_index());
    }

    #[test]
    fn test_entity_kind_serde_aliases() {
        let k: EntityKind = serde_json::from_str("\"edge\"").unwrap();
        assert_eq!(k, EntityKind::Relationship);
        let k: IndexKind = serde_json::from_str("\"fulltext\"").unwrap();
        assert_eq!(k, IndexKind::FullText);
    }
}
