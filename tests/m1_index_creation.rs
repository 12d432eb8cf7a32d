//! Tests for M1: Index Creation and Drop
//! Covers TC-1.1 .. TC-1.5
//!
//! Run individual tests with:
//! cargo test tc_1_1 -- --nocapture
//! cargo test m1_index_creation -- --nocapture

use sekejap_index::{EntityKind, Graph, GraphConfig, IndexError, IndexKind};
use serde_json::json;
use std::sync::Arc;

fn setup_graph() -> Arc<Graph> {
    let graph = Graph::new("m1", GraphConfig::manual());
    for i in 0..20 {
        graph
            .nodes()
            .create(&["person"], json!({"name": format!("p{}", i), "age": 20 + i % 7, "height": 150 + i}))
            .unwrap();
    }
    graph
}

mod tc_1_1_idempotent_creation {
    use super::*;

    #[test]
    fn test_second_identical_request_creates_nothing() {
        let graph = setup_graph();
        let created = graph.indexes().create_exact(EntityKind::Node, "person", &["age", "name"]).unwrap();
        assert_eq!(created, 2);

        let again = graph.indexes().create_exact(EntityKind::Node, "person", &["age", "name"]).unwrap();
        assert_eq!(again, 0);
        assert_eq!(graph.catalog().len(), 2);
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let graph = setup_graph();
        graph.indexes().create_exact(EntityKind::Node, "person", &["name", "age"]).unwrap();
        assert_eq!(graph.indexes().create_exact(EntityKind::Node, "person", &["age", "name"]).unwrap(), 0);
    }

    #[test]
    fn test_repeat_while_building_and_after() {
        let graph = setup_graph();
        graph.indexes().create_exact(EntityKind::Node, "person", &["age"]).unwrap();
        assert_eq!(graph.indexes().create_exact(EntityKind::Node, "person", &["age"]).unwrap(), 0);
        graph.run_until_idle();
        assert_eq!(graph.indexes().create_exact(EntityKind::Node, "person", &["age"]).unwrap(), 0);
        assert!(graph.indexer().is_idle());
    }
}

mod tc_1_2_partial_overlap {
    use super::*;

    #[test]
    fn test_only_uncovered_fields_are_created() {
        let graph = setup_graph();
        assert_eq!(graph.indexes().create_exact(EntityKind::Node, "person", &["age", "name"]).unwrap(), 2);
        assert_eq!(
            graph
                .indexes()
                .create_exact(EntityKind::Node, "person", &["age", "name", "height"])
                .unwrap(),
            1
        );
        assert_eq!(graph.catalog().len(), 3);

        let rows = graph.indexes().list();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].properties, vec!["age", "height", "name"]);
    }

    #[test]
    fn test_duplicates_in_one_request_collapse() {
        let graph = setup_graph();
        graph.indexes().create_exact(EntityKind::Node, "person", &["age", "name"]).unwrap();
        let created = graph
            .indexes()
            .create_exact(EntityKind::Node, "person", &["age", "age", "name", "height"])
            .unwrap();
        assert_eq!(created, 1);
    }
}

mod tc_1_3_owner_kinds_are_separate {
    use super::*;

    #[test]
    fn test_node_label_and_relationship_type_with_same_name() {
        let graph = setup_graph();
        graph.relationships().create("person", 0, 1, json!({"age": 3})).unwrap();

        assert_eq!(graph.indexes().create_exact(EntityKind::Node, "person", &["age"]).unwrap(), 1);
        assert_eq!(graph.indexes().create_exact(EntityKind::Relationship, "person", &["age"]).unwrap(), 1);
        graph.run_until_idle();

        let rows = graph.indexes().list();
        assert_eq!(rows.len(), 2);
        let rel = rows.iter().find(|r| r.entity_type() == "RELATIONSHIP").unwrap();
        assert_eq!(rel.indexed, 1);
        let node = rows.iter().find(|r| r.entity_type() == "NODE").unwrap();
        assert_eq!(node.indexed, 20);
    }

    #[test]
    fn test_exact_and_fulltext_on_same_field() {
        let graph = setup_graph();
        assert_eq!(graph.indexes().create(EntityKind::Node, "person", &["name"], IndexKind::Exact).unwrap(), 1);
        assert_eq!(graph.indexes().create(EntityKind::Node, "person", &["name"], IndexKind::FullText).unwrap(), 1);
        graph.run_until_idle();
        assert!(graph.indexes().is_usable(EntityKind::Node, "person", "name", IndexKind::Exact));
        assert!(graph.indexes().is_usable(EntityKind::Node, "person", "name", IndexKind::FullText));
    }
}

mod tc_1_4_validation {
    use super::*;

    #[test]
    fn test_missing_label_and_fields() {
        let graph = setup_graph();
        let err = graph.call_json(r#"{"call": "create_index", "fields": ["age"]}"#).unwrap_err();
        assert!(matches!(err, IndexError::LabelMissing));
        assert_eq!(err.to_string(), "Label is missing");

        let err = graph.call_json(r#"{"call": "create_index", "label": "person", "fields": []}"#).unwrap_err();
        assert!(matches!(err, IndexError::FieldMissing));
        assert_eq!(err.to_string(), "Field is missing");

        let err = graph.call_json(r#"{"call": "create_index", "label": "person", "fields": [1]}"#).unwrap_err();
        assert!(matches!(err, IndexError::InvalidFieldType));

        assert!(graph.catalog().is_empty());
        assert!(graph.indexer().is_idle());
    }

    #[test]
    fn test_one_bad_field_rejects_the_whole_request() {
        let graph = setup_graph();
        let err = graph.indexes().create_exact(EntityKind::Node, "person", &["age", ""]).unwrap_err();
        assert!(matches!(err, IndexError::FieldMissing));
        assert!(graph.catalog().is_empty());
    }
}

mod tc_1_5_drop {
    use super::*;

    #[test]
    fn test_drop_counts_and_recreate() {
        let graph = setup_graph();
        graph.indexes().create_exact(EntityKind::Node, "person", &["age", "name"]).unwrap();
        graph.run_until_idle();

        assert_eq!(graph.indexes().drop_exact(EntityKind::Node, "person", &["name", "age"]).unwrap(), 2);
        assert_eq!(graph.indexes().drop_exact(EntityKind::Node, "person", &["age"]).unwrap(), 0);
        assert!(!graph.indexes().is_usable(EntityKind::Node, "person", "age", IndexKind::Exact));

        assert_eq!(graph.indexes().create_exact(EntityKind::Node, "person", &["age"]).unwrap(), 1);
        assert!(!graph.indexes().is_usable(EntityKind::Node, "person", "age", IndexKind::Exact));
        graph.run_until_idle();
        assert!(graph.indexes().is_usable(EntityKind::Node, "person", "age", IndexKind::Exact));
    }

    #[test]
    fn test_drop_via_json() {
        let graph = setup_graph();
        graph.call_json(r#"{"call": "create_index", "label": "person", "fields": ["age"]}"#).unwrap();
        let out = graph.call_json(r#"{"call": "drop_index", "label": "person", "fields": ["age"]}"#).unwrap();
        assert_eq!(out, json!({"indices_deleted": 1}));
        let out = graph.call_json(r#"{"call": "indexes"}"#).unwrap();
        assert_eq!(out, json!({"indexes": []}));
    }
}
