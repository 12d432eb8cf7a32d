use crate::error::Result;
use crate::graph::Graph;
use crate::store::{Node, Relationship};
use crate::types::{EntityId, EntityKind};
use serde_json::Value;

// ============ NODE STORE ============

/// ZST wrapper for node operations. Compiles to nothing.
pub struct NodeStore<'g>(&'g Graph);

impl<'g> NodeStore<'g> {
    pub(crate) fn new(graph: &'g Graph) -> Self {
        Self(graph)
    }

    /// Create a node with labels and a JSON object of properties
    pub fn create(&self, labels: &[&str], properties: Value) -> Result<EntityId> {
        self.0.create_node_internal(labels, properties)
    }

    /// Batch create; stops at the first error
    pub fn create_many(&self, labels: &[&str], items: impl IntoIterator<Item = Value>) -> Result<Vec<EntityId>> {
        items
            .into_iter()
            .map(|props| self.0.create_node_internal(labels, props))
            .collect()
    }

    pub fn get(&self, id: EntityId) -> Option<Node> {
        self.0.node_internal(id)
    }

    /// Set one property (`null` removes it)
    pub fn set(&self, id: EntityId, field: &str, value: Value) -> Result<()> {
        self.0.set_property_internal(EntityKind::Node, id, field, value)
    }

    pub fn unset(&self, id: EntityId, field: &str) -> Result<Option<Value>> {
        self.0.remove_property_internal(EntityKind::Node, id, field)
    }

    /// Replace every property at once
    pub fn replace(&self, id: EntityId, properties: Value) -> Result<()> {
        self.0.replace_properties_internal(EntityKind::Node, id, properties)
    }

    pub fn add_label(&self, id: EntityId, label: &str) -> Result<bool> {
        self.0.add_label_internal(id, label)
    }

    pub fn remove_label(&self, id: EntityId, label: &str) -> Result<bool> {
        self.0.remove_label_internal(id, label)
    }

    /// Delete a node with its relationships; returns the relationship count removed
    pub fn delete(&self, id: EntityId) -> Result<usize> {
        self.0.delete_node_internal(id)
    }

    /// Member count of a label (O(1) via bitmap)
    pub fn count(&self, label: &str) -> u64 {
        self.0.store().members(EntityKind::Node).len(label)
    }
}

// ============ RELATIONSHIP STORE ============

/// ZST wrapper for relationship operations. Compiles to nothing.
pub struct RelationshipStore<'g>(&'g Graph);

impl<'g> RelationshipStore<'g> {
    pub(crate) fn new(graph: &'g Graph) -> Self {
        Self(graph)
    }

    /// Create a relationship between two existing nodes
    pub fn create(&self, rel_type: &str, src: EntityId, dst: EntityId, properties: Value) -> Result<EntityId> {
        self.0.create_relationship_internal(rel_type, src, dst, properties)
    }

    pub fn get(&self, id: EntityId) -> Option<Relationship> {
        self.0.relationship_internal(id)
    }

    pub fn set(&self, id: EntityId, field: &str, value: Value) -> Result<()> {
        self.0.set_property_internal(EntityKind::Relationship, id, field, value)
    }

    pub fn unset(&self, id: EntityId, field: &str) -> Result<Option<Value>> {
        self.0.remove_property_internal(EntityKind::Relationship, id, field)
    }

    pub fn replace(&self, id: EntityId, properties: Value) -> Result<()> {
        self.0.replace_properties_internal(EntityKind::Relationship, id, properties)
    }

    pub fn delete(&self, id: EntityId) -> Result<()> {
        self.0.delete_relationship_internal(id)
    }

    pub fn count(&self, rel_type: &str) -> u64 {
        self.0.store().members(EntityKind::Relationship).len(rel_type)
    }
}
