//! Tests for M3: Online Construction
//! Covers TC-3.1 .. TC-3.5
//!
//! Construction windows are made observable with `BuildMode::Manual` and a
//! small batch size; the last case runs the background worker.
//!
//! Run individual tests with:
//! cargo test tc_3_2 -- --nocapture
//! cargo test m3_async_construction -- --nocapture

use sekejap_index::{
    BuildMode, EntityKind, Graph, GraphConfig, IndexKind, IndexState, IndexerConfig, Predicate, Query,
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn manual_graph(batch_size: usize) -> Arc<Graph> {
    init_tracing();
    Graph::new("m3", GraphConfig::new(IndexerConfig::new(BuildMode::Manual).batch_size(batch_size)))
}

fn seed(graph: &Graph, n: u32) {
    for i in 0..n {
        graph.nodes().create(&["L"], json!({"v": i, "text": format!("item number {}", i)})).unwrap();
    }
}

/// Every label member carrying `field` is indexed under its current value,
/// and nothing else is.
fn assert_exact_matches_store(graph: &Graph, label: &str, field: &str) {
    let entry = graph.catalog().find(EntityKind::Node, label, field, IndexKind::Exact).unwrap();
    let index = entry.backing().as_exact().unwrap();
    let store = graph.store();

    let mut expected = 0;
    for id in store.members(EntityKind::Node).snapshot(label).iter() {
        let value = store.node(id).and_then(|n| n.properties.get(field)).cloned();
        assert_eq!(index.value_of(id), value, "entity {id}");
        if value.is_some() {
            expected += 1;
        }
    }
    assert_eq!(entry.indexed(), expected);
}

mod tc_3_1_no_index_scan_while_building {
    use super::*;

    #[test]
    fn test_plan_switches_only_when_operational() {
        let graph = manual_graph(4);
        seed(&graph, 10);
        graph.indexes().create_exact(EntityKind::Node, "L", &["v"]).unwrap();
        let query = Query::nodes("L", Predicate::Eq("v".into(), json!(7)));

        let mut steps = 0;
        while graph.indexes().state(EntityKind::Node, "L", "v", IndexKind::Exact) == Some(IndexState::Building) {
            let plan = graph.explain(&query);
            assert!(plan.locate("Node By Index Scan").is_none());
            assert!(plan.locate("Node By Label Scan").is_some());
            assert_eq!(graph.execute(&query).unwrap().data.len(), 1);
            assert_eq!(graph.indexes().list()[0].status(), "UNDER CONSTRUCTION");
            assert!(graph.step());
            steps += 1;
        }

        assert!(steps > 1);
        assert!(graph.explain(&query).locate("Node By Index Scan").is_some());
        assert_eq!(graph.execute(&query).unwrap().data[0].id, 7);
        assert_eq!(graph.indexes().list()[0].status(), "OPERATIONAL");
    }

    #[test]
    fn test_fulltext_falls_back_to_containment_filter() {
        let graph = manual_graph(2);
        seed(&graph, 6);
        graph.indexes().create(EntityKind::Node, "L", &["text"], IndexKind::FullText).unwrap();
        graph.step();

        let query = Query::nodes("L", Predicate::Matching("text".into(), "items".into()));
        let plan = graph.explain(&query);
        assert_eq!(plan.to_json(), json!(["Node By Label Scan", "Filter"]));
        assert_eq!(graph.execute(&query).unwrap().data.len(), 6);

        graph.run_until_idle();
        assert_eq!(graph.explain(&query).to_json(), json!(["Node By Index Scan"]));
        assert_eq!(graph.execute(&query).unwrap().data.len(), 6);
    }
}

mod tc_3_2_mutation_safety {
    use super::*;

    #[test]
    fn test_writes_on_both_sides_of_the_cursor() {
        let graph = manual_graph(3);
        seed(&graph, 10);
        graph.nodes().create(&["Other"], json!({"v": 99})).unwrap();
        graph.indexes().create_exact(EntityKind::Node, "L", &["v"]).unwrap();

        assert!(graph.step());
        let entry = graph.catalog().find(EntityKind::Node, "L", "v", IndexKind::Exact).unwrap();
        assert_eq!(entry.cursor().position(), 3);

        // visited side (ids 0..3)
        graph.nodes().set(1, "v", json!(100)).unwrap();
        graph.nodes().delete(0).unwrap();
        graph.nodes().remove_label(2, "L").unwrap();
        // unvisited side
        graph.nodes().set(7, "v", json!(700)).unwrap();
        graph.nodes().delete(8).unwrap();
        graph.nodes().unset(9, "v").unwrap();
        // joins the label after the cursor passed and before it
        graph.nodes().add_label(10, "L").unwrap();
        let fresh = graph.nodes().create(&["L"], json!({"v": -1})).unwrap();

        let index = entry.backing().as_exact().unwrap();
        assert_eq!(index.value_of(1), Some(json!(100)));
        assert!(index.value_of(7).is_none());
        assert_eq!(entry.indexed(), 1);

        graph.run_until_idle();
        assert!(entry.is_operational());
        assert_exact_matches_store(&graph, "L", "v");
        assert_eq!(entry.indexed(), 8);

        assert_eq!(index.value_of(1), Some(json!(100)));
        assert_eq!(index.value_of(7), Some(json!(700)));
        assert_eq!(index.value_of(10), Some(json!(99)));
        assert_eq!(index.value_of(fresh), Some(json!(-1)));
        assert!(index.lookup_eq(&json!(1)).is_empty());
        assert!(index.value_of(0).is_none() && index.value_of(2).is_none());
        assert!(index.value_of(8).is_none() && index.value_of(9).is_none());
    }

    #[test]
    fn test_query_results_agree_before_and_after_flip() {
        let graph = manual_graph(5);
        seed(&graph, 30);
        let query = Query::nodes("L", Predicate::Range("v".into(), Some(json!(10)), Some(json!(20))));
        graph.indexes().create_exact(EntityKind::Node, "L", &["v"]).unwrap();

        graph.step();
        graph.step();
        graph.nodes().set(12, "v", json!(500)).unwrap();
        graph.nodes().set(25, "v", json!(15)).unwrap();
        let scanned: Vec<_> = graph.execute(&query).unwrap().data.iter().map(|h| h.id).collect();

        graph.run_until_idle();
        assert!(graph.explain(&query).uses_index());
        let indexed: Vec<_> = graph.execute(&query).unwrap().data.iter().map(|h| h.id).collect();
        assert_eq!(scanned, indexed);
        assert!(indexed.contains(&25) && !indexed.contains(&12));
    }

    #[test]
    fn test_fulltext_updates_during_build() {
        let graph = manual_graph(2);
        seed(&graph, 6);
        graph.indexes().create(EntityKind::Node, "L", &["text"], IndexKind::FullText).unwrap();
        graph.step();

        graph.nodes().set(0, "text", json!("purple elephant")).unwrap();
        graph.nodes().set(5, "text", json!("purple giraffe")).unwrap();
        graph.nodes().replace(1, json!({"v": 1})).unwrap();
        graph.run_until_idle();

        let search = |text: &str| -> Vec<u32> {
            let out = graph.planner().search(EntityKind::Node, "L", "text", text, 100).unwrap();
            let mut ids: Vec<_> = out.data.iter().map(|h| h.id).collect();
            ids.sort_unstable();
            ids
        };
        assert_eq!(search("purple"), vec![0, 5]);
        assert_eq!(search("item"), vec![2, 3, 4]);
        assert_eq!(search("elephants"), vec![0]);
    }

    #[test]
    fn test_relationship_mutations_during_build() {
        let graph = manual_graph(2);
        let a = graph.nodes().create(&["P"], json!({})).unwrap();
        let b = graph.nodes().create(&["P"], json!({})).unwrap();
        for year in 2000..2006 {
            graph.relationships().create("KNOWS", a, b, json!({"since": year})).unwrap();
        }
        graph.indexes().create_exact(EntityKind::Relationship, "KNOWS", &["since"]).unwrap();
        graph.step();

        graph.relationships().set(0, "since", json!(1999)).unwrap();
        graph.relationships().delete(5).unwrap();
        graph.run_until_idle();

        let entry = graph.catalog().find(EntityKind::Relationship, "KNOWS", "since", IndexKind::Exact).unwrap();
        assert!(entry.is_operational());
        assert_eq!(entry.indexed(), 5);
        assert_eq!(entry.backing().as_exact().unwrap().value_of(0), Some(json!(1999)));

        // deleting a node detaches its relationships from the index too
        graph.nodes().delete(a).unwrap();
        assert_eq!(entry.indexed(), 0);
    }
}

mod tc_3_3_late_fields_share_the_pass {
    use super::*;

    #[test]
    fn test_second_request_joins_running_job() {
        let graph = manual_graph(4);
        seed(&graph, 12);
        graph.indexes().create_exact(EntityKind::Node, "L", &["v"]).unwrap();
        graph.step();
        graph.indexes().create_exact(EntityKind::Node, "L", &["text"]).unwrap();

        let jobs = graph.indexer().jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].member_count(), 2);

        graph.run_until_idle();
        assert!(graph.indexes().is_usable(EntityKind::Node, "L", "v", IndexKind::Exact));
        assert!(graph.indexes().is_usable(EntityKind::Node, "L", "text", IndexKind::Exact));
        assert_exact_matches_store(&graph, "L", "text");
    }
}

mod tc_3_4_drop_during_build {
    use super::*;

    #[test]
    fn test_drop_stops_population() {
        let graph = manual_graph(3);
        seed(&graph, 9);
        graph.indexes().create_exact(EntityKind::Node, "L", &["v"]).unwrap();
        graph.step();
        let entry = graph.catalog().find(EntityKind::Node, "L", "v", IndexKind::Exact).unwrap();

        assert_eq!(graph.indexes().drop_exact(EntityKind::Node, "L", &["v"]).unwrap(), 1);
        graph.run_until_idle();
        assert!(entry.is_dropped());
        assert_eq!(entry.state(), IndexState::Building);
        assert_eq!(entry.indexed(), 3);
        assert!(graph.indexer().is_idle());

        graph.nodes().set(0, "v", json!(42)).unwrap();
        assert_eq!(entry.backing().as_exact().unwrap().value_of(0), Some(json!(0)));

        assert_eq!(graph.indexes().create_exact(EntityKind::Node, "L", &["v"]).unwrap(), 1);
        graph.run_until_idle();
        assert_exact_matches_store(&graph, "L", "v");
    }
}

mod tc_3_5_background_worker {
    use super::*;

    #[test]
    fn test_background_build_becomes_operational() {
        init_tracing();
        let config = GraphConfig::new(IndexerConfig::new(BuildMode::Background).batch_size(64));
        let graph = Graph::new("m3-bg", config);
        seed(&graph, 2_000);

        assert_eq!(graph.indexes().create_exact(EntityKind::Node, "L", &["v"]).unwrap(), 1);
        // writes keep flowing while the worker builds
        for i in 0..50u32 {
            graph.nodes().set(i * 7, "v", json!(10_000 + i)).unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        while !graph.indexes().is_usable(EntityKind::Node, "L", "v", IndexKind::Exact) {
            assert!(Instant::now() < deadline, "index never became operational");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(graph.wait_until_idle(Duration::from_secs(5)));
        assert_exact_matches_store(&graph, "L", "v");

        let query = Query::nodes("L", Predicate::Eq("v".into(), json!(10_049)));
        let out = graph.execute(&query).unwrap();
        assert_eq!(out.data[0].id, 49 * 7);
        assert!(out.trace.steps[0].index_used.contains("exact-match"));
    }
}
