use crate::catalog::Catalog;
use crate::config::GraphConfig;
use crate::error::{IndexError, Result};
use crate::indexer::Indexer;
use crate::interceptor::Interceptor;
use crate::manager::IndexManager;
use crate::planner::Planner;
use crate::procedures;
use crate::store::{properties_from_json, EntityStore, Node, Relationship};
use crate::stores::{NodeStore, RelationshipStore};
use crate::types::{EntityId, EntityKind, Hit, Outcome, Plan, Query};
use parking_lot::{RwLock, RwLockReadGuard};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One property graph: entity store, index catalog and the indexer that
/// populates new indexes.
///
/// Mutations take the store's write lock and run index interception inside
/// it. Build batches and queries take the read lock.
pub struct Graph {
    name: String,
    config: GraphConfig,
    store: RwLock<EntityStore>,
    catalog: Catalog,
    indexer: Indexer,
    /// raised when the graph is deleted
    cancel: Arc<AtomicBool>,
}

impl Graph {
    pub fn new(name: &str, config: GraphConfig) -> Arc<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        Arc::new_cyclic(|weak| Self {
            name: name.to_string(),
            indexer: Indexer::new(config.indexer.clone(), cancel.clone(), weak.clone()),
            config,
            store: RwLock::new(EntityStore::new()),
            catalog: Catalog::new(),
            cancel,
        })
    }

    pub fn with_defaults(name: &str) -> Arc<Self> {
        Self::new(name, GraphConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn is_deleted(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_deleted() {
            return Err(IndexError::GraphNotFound(self.name.clone()));
        }
        Ok(())
    }

    // --- Resource Accessors (Public API) ---
    pub fn nodes(&self) -> NodeStore<'_> { NodeStore::new(self) }
    pub fn relationships(&self) -> RelationshipStore<'_> { RelationshipStore::new(self) }
    pub fn indexes(&self) -> IndexManager<'_> { IndexManager::new(self) }
    pub fn planner(&self) -> Planner<'_> { Planner::new(self) }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub(crate) fn store_lock(&self) -> &RwLock<EntityStore> {
        &self.store
    }

    /// Shared read access to the entity store
    pub fn store(&self) -> RwLockReadGuard<'_, EntityStore> {
        self.store.read()
    }

    // --- Build driving ---

    /// Run one build batch (Manual mode). False when nothing is pending.
    pub fn step(&self) -> bool {
        self.indexer.step(&self.store)
    }

    pub fn run_until_idle(&self) -> usize {
        self.indexer.run_until_idle(&self.store)
    }

    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.indexer.wait_until_idle(&self.store, timeout)
    }

    // --- Queries ---

    pub fn explain(&self, query: &Query) -> Plan {
        self.planner().explain(query)
    }

    pub fn execute(&self, query: &Query) -> Result<Outcome<Vec<Hit>>> {
        self.planner().execute(query)
    }

    /// JSON command surface (`{"call": ...}`)
    pub fn call_json(&self, json: &str) -> Result<Value> {
        procedures::call(self, json)
    }

    /// Tear down: cancel builds, drop every index and entity.
    ///
    /// Holds the catalog's DDL lock throughout, so a create or drop either
    /// completes before the teardown or observes the deleted graph.
    pub(crate) fn shutdown(&self) {
        let _ddl = self.catalog.ddl();
        if self.cancel.swap(true, Ordering::AcqRel) {
            return;
        }
        self.indexer.clear();
        self.catalog.clear();
        self.store.write().clear();
        tracing::info!(graph = %self.name, "graph deleted");
    }

    // --- Internal Methods (called by stores) ---

    pub(crate) fn create_node_internal(&self, labels: &[&str], properties: Value) -> Result<EntityId> {
        let properties = properties_from_json(properties)?;
        let mut store = self.store.write();
        self.ensure_live()?;
        let node = store.insert_node(labels, properties)?;
        Interceptor::new(&self.catalog).created(EntityKind::Node, node.id, &node.labels, &node.properties);
        Ok(node.id)
    }

    pub(crate) fn create_relationship_internal(
        &self,
        rel_type: &str,
        src: EntityId,
        dst: EntityId,
        properties: Value,
    ) -> Result<EntityId> {
        let properties = properties_from_json(properties)?;
        let mut store = self.store.write();
        self.ensure_live()?;
        let rel = store.insert_relationship(rel_type, src, dst, properties)?;
        let tags = [rel.rel_type.clone()];
        Interceptor::new(&self.catalog).created(EntityKind::Relationship, rel.id, &tags, &rel.properties);
        Ok(rel.id)
    }

    /// Set a property; `null` removes it.
    pub(crate) fn set_property_internal(&self, kind: EntityKind, id: EntityId, field: &str, value: Value) -> Result<()> {
        if value.is_null() {
            return self.remove_property_internal(kind, id, field).map(|_| ());
        }
        let mut store = self.store.write();
        self.ensure_live()?;
        store.set_property(kind, id, field, value)?;
        let tags = store.tags(kind, id).unwrap_or_default();
        let current = store.properties(kind, id).and_then(|p| p.get(field));
        Interceptor::new(&self.catalog).property_changed(kind, id, &tags, field, current);
        Ok(())
    }

    pub(crate) fn remove_property_internal(&self, kind: EntityKind, id: EntityId, field: &str) -> Result<Option<Value>> {
        let mut store = self.store.write();
        self.ensure_live()?;
        let old = store.remove_property(kind, id, field)?;
        if old.is_some() {
            let tags = store.tags(kind, id).unwrap_or_default();
            Interceptor::new(&self.catalog).property_changed(kind, id, &tags, field, None);
        }
        Ok(old)
    }

    pub(crate) fn replace_properties_internal(&self, kind: EntityKind, id: EntityId, properties: Value) -> Result<()> {
        let properties = properties_from_json(properties)?;
        let mut store = self.store.write();
        self.ensure_live()?;
        store.replace_properties(kind, id, properties)?;
        let tags = store.tags(kind, id).unwrap_or_default();
        if let Some(props) = store.properties(kind, id) {
            Interceptor::new(&self.catalog).properties_replaced(kind, id, &tags, props);
        }
        Ok(())
    }

    pub(crate) fn add_label_internal(&self, id: EntityId, label: &str) -> Result<bool> {
        let mut store = self.store.write();
        self.ensure_live()?;
        if !store.add_label(id, label)? {
            return Ok(false);
        }
        if let Some(props) = store.properties(EntityKind::Node, id) {
            Interceptor::new(&self.catalog).label_added(EntityKind::Node, id, label, props);
        }
        Ok(true)
    }

    pub(crate) fn remove_label_internal(&self, id: EntityId, label: &str) -> Result<bool> {
        let mut store = self.store.write();
        self.ensure_live()?;
        if !store.remove_label(id, label)? {
            return Ok(false);
        }
        Interceptor::new(&self.catalog).label_removed(EntityKind::Node, id, label);
        Ok(true)
    }

    /// Delete a node and its relationships; returns how many relationships went with it.
    pub(crate) fn delete_node_internal(&self, id: EntityId) -> Result<usize> {
        let mut store = self.store.write();
        self.ensure_live()?;
        let (node, detached) = store.remove_node(id)?;
        let interceptor = Interceptor::new(&self.catalog);
        for rel in &detached {
            interceptor.deleted(EntityKind::Relationship, rel.id, std::slice::from_ref(&rel.rel_type));
        }
        interceptor.deleted(EntityKind::Node, node.id, &node.labels);
        Ok(detached.len())
    }

    pub(crate) fn delete_relationship_internal(&self, id: EntityId) -> Result<()> {
        let mut store = self.store.write();
        self.ensure_live()?;
        let rel = store.remove_relationship(id)?;
        Interceptor::new(&self.catalog).deleted(EntityKind::Relationship, rel.id, std::slice::from_ref(&rel.rel_type));
        Ok(())
    }

    pub(crate) fn node_internal(&self, id: EntityId) -> Option<Node> {
        self.store.read().node(id).cloned()
    }

    pub(crate) fn relationship_internal(&self, id: EntityId) -> Option<Relationship> {
        self.store.read().relationship(id).cloned()
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        // the worker only holds a Weak; make sure it stops parking on us
        self.cancel.store(true, Ordering::Release);
        self.indexer.clear();
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("indexes", &self.catalog.len())
            .field("pending_builds", &self.indexer.pending())
            .field("deleted", &self.is_deleted())
            .finish()
    }
}
