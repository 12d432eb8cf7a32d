//! In-memory entity store.
//!
//! Nodes and relationships live in append-only arenas indexed by id; a deleted
//! slot stays `None`, so ids are never reused and creation order is id order.
//! Every node label and relationship type has a RoaringBitmap of member ids
//! (see [`LabelBitmapIndex`]).
//!
//! The store is plain data. It never talks to indexes; the graph wraps each
//! mutation with interception while holding the store's write lock.

use crate::error::{IndexError, Result};
use crate::label_bitmap::LabelBitmapIndex;
use crate::types::{EntityId, EntityKind};
use ahash::AHashMap;
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Property map of a node or relationship
pub type Properties = Map<String, Value>;

/// Labels of a node, or the single type of a relationship
pub type Tags = SmallVec<[String; 2]>;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: EntityId,
    pub labels: Tags,
    pub properties: Properties,
}

impl Node {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "labels": self.labels.to_vec(),
            "properties": self.properties,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: EntityId,
    pub rel_type: String,
    pub src: EntityId,
    pub dst: EntityId,
    pub properties: Properties,
}

impl Relationship {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "type": self.rel_type,
            "src": self.src,
            "dst": self.dst,
            "properties": self.properties,
        })
    }
}

/// Accept a JSON object (or null for "no properties")
pub fn properties_from_json(value: Value) -> Result<Properties> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Properties::new()),
        _ => Err(IndexError::InvalidProperties),
    }
}

#[derive(Default)]
pub struct EntityStore {
    nodes: Vec<Option<Node>>,
    rels: Vec<Option<Relationship>>,
    node_labels: LabelBitmapIndex,
    rel_types: LabelBitmapIndex,
    /// node → outgoing relationship ids
    adj_fwd: AHashMap<EntityId, SmallVec<[EntityId; 8]>>,
    /// node → incoming relationship ids
    adj_rev: AHashMap<EntityId, SmallVec<[EntityId; 8]>>,
    live_nodes: usize,
    live_rels: usize,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(len: usize, kind: EntityKind) -> Result<EntityId> {
        EntityId::try_from(len).map_err(|_| IndexError::CapacityExceeded(kind))
    }

    fn not_found(kind: EntityKind, id: EntityId) -> IndexError {
        IndexError::EntityNotFound { kind, id }
    }

    // ============ READS ============

    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.nodes.get(id as usize).and_then(Option::as_ref)
    }

    pub fn relationship(&self, id: EntityId) -> Option<&Relationship> {
        self.rels.get(id as usize).and_then(Option::as_ref)
    }

    pub fn exists(&self, kind: EntityKind, id: EntityId) -> bool {
        match kind {
            EntityKind::Node => self.node(id).is_some(),
            EntityKind::Relationship => self.relationship(id).is_some(),
        }
    }

    /// Labels of a node or the type of a relationship
    pub fn tags(&self, kind: EntityKind, id: EntityId) -> Option<Tags> {
        match kind {
            EntityKind::Node => self.node(id).map(|n| n.labels.clone()),
            EntityKind::Relationship => self.relationship(id).map(|r| {
                let mut tags = Tags::new();
                tags.push(r.rel_type.clone());
                tags
            }),
        }
    }

    /// True iff the entity exists and has `label` as a label (node) or type (relationship)
    pub fn carries(&self, kind: EntityKind, id: EntityId, label: &str) -> bool {
        match kind {
            EntityKind::Node => self.node(id).is_some_and(|n| n.has_label(label)),
            EntityKind::Relationship => self.relationship(id).is_some_and(|r| r.rel_type == label),
        }
    }

    pub fn properties(&self, kind: EntityKind, id: EntityId) -> Option<&Properties> {
        match kind {
            EntityKind::Node => self.node(id).map(|n| &n.properties),
            EntityKind::Relationship => self.relationship(id).map(|r| &r.properties),
        }
    }

    fn properties_mut(&mut self, kind: EntityKind, id: EntityId) -> Result<&mut Properties> {
        let slot = match kind {
            EntityKind::Node => self.nodes.get_mut(id as usize).and_then(Option::as_mut).map(|n| &mut n.properties),
            EntityKind::Relationship => {
                self.rels.get_mut(id as usize).and_then(Option::as_mut).map(|r| &mut r.properties)
            }
        };
        slot.ok_or_else(|| Self::not_found(kind, id))
    }

    /// Member bitmaps for labels (nodes) or types (relationships)
    pub fn members(&self, kind: EntityKind) -> &LabelBitmapIndex {
        match kind {
            EntityKind::Node => &self.node_labels,
            EntityKind::Relationship => &self.rel_types,
        }
    }

    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    pub fn relationship_count(&self) -> usize {
        self.live_rels
    }

    /// Relationship ids touching a node, both directions
    pub fn relationships_of(&self, node: EntityId) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = Vec::new();
        if let Some(ids) = self.adj_fwd.get(&node) {
            out.extend(ids.iter().copied());
        }
        if let Some(ids) = self.adj_rev.get(&node) {
            out.extend(ids.iter().copied());
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    // ============ WRITES ============

    pub fn insert_node(&mut self, labels: &[&str], properties: Properties) -> Result<&Node> {
        let id = Self::next_id(self.nodes.len(), EntityKind::Node)?;
        let mut tags = Tags::new();
        for label in labels {
            if !label.is_empty() && !tags.iter().any(|t| t == label) {
                tags.push(label.to_string());
            }
        }
        for label in &tags {
            self.node_labels.insert(label, id);
        }
        self.nodes.push(Some(Node { id, labels: tags, properties }));
        self.live_nodes += 1;
        self.node(id).ok_or_else(|| Self::not_found(EntityKind::Node, id))
    }

    pub fn insert_relationship(
        &mut self,
        rel_type: &str,
        src: EntityId,
        dst: EntityId,
        properties: Properties,
    ) -> Result<&Relationship> {
        for endpoint in [src, dst] {
            if self.node(endpoint).is_none() {
                return Err(Self::not_found(EntityKind::Node, endpoint));
            }
        }
        let id = Self::next_id(self.rels.len(), EntityKind::Relationship)?;
        self.rel_types.insert(rel_type, id);
        self.adj_fwd.entry(src).or_default().push(id);
        self.adj_rev.entry(dst).or_default().push(id);
        self.rels.push(Some(Relationship {
            id,
            rel_type: rel_type.to_string(),
            src,
            dst,
            properties,
        }));
        self.live_rels += 1;
        self.relationship(id).ok_or_else(|| Self::not_found(EntityKind::Relationship, id))
    }

    /// Set one property; returns the previous value.
    pub fn set_property(&mut self, kind: EntityKind, id: EntityId, field: &str, value: Value) -> Result<Option<Value>> {
        Ok(self.properties_mut(kind, id)?.insert(field.to_string(), value))
    }

    /// Remove one property; returns the previous value.
    pub fn remove_property(&mut self, kind: EntityKind, id: EntityId, field: &str) -> Result<Option<Value>> {
        Ok(self.properties_mut(kind, id)?.remove(field))
    }

    /// Replace the whole property map; returns the old one.
    pub fn replace_properties(&mut self, kind: EntityKind, id: EntityId, properties: Properties) -> Result<Properties> {
        Ok(std::mem::replace(self.properties_mut(kind, id)?, properties))
    }

    /// Returns false when the node already carried the label.
    pub fn add_label(&mut self, id: EntityId, label: &str) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| Self::not_found(EntityKind::Node, id))?;
        if label.is_empty() || node.has_label(label) {
            return Ok(false);
        }
        node.labels.push(label.to_string());
        self.node_labels.insert(label, id);
        Ok(true)
    }

    /// Returns false when the node did not carry the label.
    pub fn remove_label(&mut self, id: EntityId, label: &str) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| Self::not_found(EntityKind::Node, id))?;
        let Some(pos) = node.labels.iter().position(|l| l == label) else {
            return Ok(false);
        };
        node.labels.remove(pos);
        self.node_labels.remove(label, id);
        Ok(true)
    }

    pub fn remove_relationship(&mut self, id: EntityId) -> Result<Relationship> {
        let rel = self
            .rels
            .get_mut(id as usize)
            .and_then(Option::take)
            .ok_or_else(|| Self::not_found(EntityKind::Relationship, id))?;
        self.rel_types.remove(&rel.rel_type, id);
        if let Some(out) = self.adj_fwd.get_mut(&rel.src) {
            out.retain(|r| *r != id);
        }
        if let Some(inc) = self.adj_rev.get_mut(&rel.dst) {
            inc.retain(|r| *r != id);
        }
        self.live_rels -= 1;
        Ok(rel)
    }

    /// Delete a node and every relationship attached to it.
    pub fn remove_node(&mut self, id: EntityId) -> Result<(Node, Vec<Relationship>)> {
        if self.node(id).is_none() {
            return Err(Self::not_found(EntityKind::Node, id));
        }
        let mut detached = Vec::new();
        for rel_id in self.relationships_of(id) {
            detached.push(self.remove_relationship(rel_id)?);
        }
        self.adj_fwd.remove(&id);
        self.adj_rev.remove(&id);

        let node = self
            .nodes
            .get_mut(id as usize)
            .and_then(Option::take)
            .ok_or_else(|| Self::not_found(EntityKind::Node, id))?;
        for label in &node.labels {
            self.node_labels.remove(label, id);
        }
        self.live_nodes -= 1;
        Ok((node, detached))
    }

    /// Drop every entity (graph teardown)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(v: Value) -> Properties {
        properties_from_json(v).unwrap()
    }

    #[test]
    fn test_ids_follow_creation_order_and_are_not_reused() {
        let mut store = EntityStore::new();
        let a = store.insert_node(&["L"], props(json!({"v": 1}))).unwrap().id;
        let b = store.insert_node(&["L"], props(json!({"v": 2}))).unwrap().id;
        assert_eq!((a, b), (0, 1));

        store.remove_node(a).unwrap();
        let c = store.insert_node(&["L"], Properties::new()).unwrap().id;
        assert_eq!(c, 2);
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.members(EntityKind::Node).page("L", 0, 10), vec![1, 2]);
    }

    #[test]
    fn test_duplicate_labels_collapse() {
        let mut store = EntityStore::new();
        let node = store.insert_node(&["A", "A", "B"], Properties::new()).unwrap();
        assert_eq!(node.labels.len(), 2);
    }

    #[test]
    fn test_property_updates() {
        let mut store = EntityStore::new();
        let id = store.insert_node(&["L"], props(json!({"v": 1}))).unwrap().id;

        let old = store.set_property(EntityKind::Node, id, "v", json!(2)).unwrap();
        assert_eq!(old, Some(json!(1)));
        assert_eq!(store.remove_property(EntityKind::Node, id, "v").unwrap(), Some(json!(2)));
        assert!(store.properties(EntityKind::Node, id).unwrap().is_empty());

        let err = store.set_property(EntityKind::Node, 99, "v", json!(1)).unwrap_err();
        assert!(matches!(err, IndexError::EntityNotFound { .. }));
    }

    #[test]
    fn test_labels_move_bitmap_membership() {
        let mut store = EntityStore::new();
        let id = store.insert_node(&["A"], Properties::new()).unwrap().id;
        assert!(store.add_label(id, "B").unwrap());
        assert!(!store.add_label(id, "B").unwrap());
        assert!(store.members(EntityKind::Node).contains("B", id));

        assert!(store.remove_label(id, "A").unwrap());
        assert!(!store.remove_label(id, "A").unwrap());
        assert!(!store.members(EntityKind::Node).contains("A", id));
        assert!(store.carries(EntityKind::Node, id, "B"));
        assert!(!store.carries(EntityKind::Node, id, "A"));
        assert!(!store.carries(EntityKind::Relationship, id, "B"));
    }

    #[test]
    fn test_node_delete_cascades_to_relationships() {
        let mut store = EntityStore::new();
        let a = store.insert_node(&["P"], Properties::new()).unwrap().id;
        let b = store.insert_node(&["P"], Properties::new()).unwrap().id;
        let r1 = store.insert_relationship("KNOWS", a, b, props(json!({"since": 2020}))).unwrap().id;
        let r2 = store.insert_relationship("KNOWS", b, a, Properties::new()).unwrap().id;

        let (_, detached) = store.remove_node(a).unwrap();
        let mut ids: Vec<_> = detached.iter().map(|r| r.id).collect();
        ids.sort();
        assert_eq!(ids, vec![r1, r2]);
        assert_eq!(store.relationship_count(), 0);
        assert!(store.members(EntityKind::Relationship).page("KNOWS", 0, 10).is_empty());
        assert!(store.relationships_of(b).is_empty());
    }

    #[test]
    fn test_relationship_needs_endpoints() {
        let mut store = EntityStore::new();
        let a = store.insert_node(&[], Properties::new()).unwrap().id;
        let err = store.insert_relationship("R", a, 7, Properties::new()).unwrap_err();
        assert!(matches!(err, IndexError::EntityNotFound { kind: EntityKind::Node, id: 7 }));
    }

    #[test]
    fn test_properties_must_be_object() {
        assert!(properties_from_json(json!(null)).unwrap().is_empty());
        assert!(matches!(properties_from_json(json!([1])).unwrap_err(), IndexError::InvalidProperties));
    }
}
