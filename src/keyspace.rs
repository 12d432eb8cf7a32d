use crate::config::GraphConfig;
use crate::error::{IndexError, Result};
use crate::graph::Graph;
use crate::procedures;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Named graphs of one process.
///
/// Deleting a graph removes its name first, then raises its cancellation
/// token: in-flight builders stop at their next batch boundary and nothing is
/// reported back to the caller.
pub struct Keyspace {
    graphs: DashMap<String, Arc<Graph>>,
    config: GraphConfig,
}

impl Keyspace {
    pub fn new(config: GraphConfig) -> Self {
        Self { graphs: DashMap::new(), config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Create a graph; an existing graph of that name is returned as is.
    pub fn create(&self, name: &str) -> Arc<Graph> {
        self.get_or_create(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Graph>> {
        self.graphs
            .get(name)
            .map(|g| g.value().clone())
            .ok_or_else(|| IndexError::GraphNotFound(name.to_string()))
    }

    pub fn get_or_create(&self, name: &str) -> Arc<Graph> {
        self.graphs
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(graph = name, "graph created");
                Graph::new(name, self.config.clone())
            })
            .value()
            .clone()
    }

    /// Delete a graph and everything it indexes. False when it did not exist.
    pub fn delete(&self, name: &str) -> bool {
        match self.graphs.remove(name) {
            Some((_, graph)) => {
                graph.shutdown();
                true
            }
            None => false,
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.graphs.contains_key(name)
    }

    /// Graph names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.graphs.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Route a `{"call": ...}` command to a graph. Create-style calls bring
    /// the graph into existence; every other call needs it to exist.
    pub fn call_json(&self, graph: &str, json: &str) -> Result<Value> {
        let raw: Value = serde_json::from_str(json)?;
        let name = procedures::call_name(&raw)?;
        let target = if procedures::CREATE_CALLS.contains(&name) {
            self.get_or_create(graph)
        } else {
            self.get(graph)?
        };
        target.call_json(json)
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_get_delete() {
        let ks = Keyspace::new(GraphConfig::manual());
        let a = ks.create("a");
        assert!(Arc::ptr_eq(&a, &ks.get_or_create("a")));
        ks.create("b");
        assert_eq!(ks.names(), vec!["a", "b"]);

        assert!(ks.delete("a"));
        assert!(!ks.delete("a"));
        assert!(a.is_deleted());
        assert!(matches!(ks.get("a"), Err(IndexError::GraphNotFound(_))));
        assert_eq!(ks.len(), 1);
    }

    #[test]
    fn test_call_json_routing() {
        let ks = Keyspace::new(GraphConfig::manual());
        assert!(matches!(ks.call_json("g", r#"{"call": "indexes"}"#), Err(IndexError::GraphNotFound(_))));

        let out = ks.call_json("g", r#"{"call": "create_index", "label": "L", "fields": ["v"]}"#).unwrap();
        assert_eq!(out, json!({"indices_created": 1}));
        assert!(ks.exists("g"));
        assert!(matches!(ks.call_json("g", r#"{"call": "nope"}"#), Err(IndexError::UnknownCall(_))));
    }
}
