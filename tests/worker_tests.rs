use std::fs;

use graymatch::{
    AttributedGraph, EdgeAttrs, GrayMatchError, MatchConfig, Pattern, PatternBuilder,
    RwrConfig, VertexAttrs,
    worker::{Worker, WorkerSnapshot, run_initial_parallel, split_by_components},
};
use tempfile::tempdir;

fn two_triangles() -> AttributedGraph {
    let mut graph = AttributedGraph::undirected();
    for v in 1..=6 {
        graph.add_vertex(v, VertexAttrs::labeled("cyan"));
    }
    for base in [0, 3] {
        graph.add_edge(base + 1, base + 2, EdgeAttrs::default());
        graph.add_edge(base + 2, base + 3, EdgeAttrs::default());
        graph.add_edge(base + 3, base + 1, EdgeAttrs::default());
    }
    graph
}

fn triangle() -> Pattern {
    PatternBuilder::new(false)
        .vertex("a", Some("cyan"))
        .vertex("b", Some("cyan"))
        .vertex("c", Some("cyan"))
        .edge("a", "b", None)
        .edge("b", "c", None)
        .edge("c", "a", None)
        .build()
        .expect("pattern")
}

#[test]
fn test_components_go_to_lightest_worker() {
    let mut graph = AttributedGraph::undirected();
    for v in 1..5 {
        graph.add_edge(v, v + 1, EdgeAttrs::default());
    }
    graph.add_edge(10, 11, EdgeAttrs::default());
    graph.add_edge(11, 12, EdgeAttrs::default());
    graph.add_edge(20, 21, EdgeAttrs::default());
    let parts = split_by_components(&graph, 2);
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].len(), 5);
    let mut rest = parts[1].clone();
    rest.sort_unstable();
    assert_eq!(rest, vec![10, 11, 12, 20, 21]);
}

#[test]
fn test_parallel_initial_run_sums_counts() {
    let graph = two_triangles();
    let pattern = triangle();
    let config = MatchConfig::default();
    let worker = Worker {
        graph: &graph,
        pattern: &pattern,
        condition: None,
        config: &config,
        cache_dir: None,
    };
    let partitions = split_by_components(&graph, 2);
    let report = run_initial_parallel(worker, &partitions).expect("run");
    assert_eq!(report.workers.len(), 2);
    assert_eq!(report.total, 2);
    assert!(report.workers.iter().all(|w| w.matches == 1));
}

#[test]
fn test_worker_persists_and_reloads_snapshot() {
    let dir = tempdir().expect("tempdir");
    let graph = two_triangles();
    let pattern = triangle();
    let config = MatchConfig::default();
    let worker = Worker {
        graph: &graph,
        pattern: &pattern,
        condition: None,
        config: &config,
        cache_dir: Some(dir.path()),
    };
    let snapshot = WorkerSnapshot::new(dir.path(), 0);
    let (scores, trees) = snapshot.load().expect("load");
    assert!(scores.is_none() && trees.is_none());

    let first = worker.run_initial(0, graph.vertex_ids()).expect("run");
    assert!(snapshot.rwr_path().exists());
    assert!(snapshot.extract_path().exists());
    let (scores, trees) = snapshot.load().expect("load");
    let scores = scores.expect("scores");
    assert!(graph.vertex_ids().iter().all(|v| scores.has_source(*v)));
    assert_eq!(trees.expect("trees").max_hops, config.max_hops);

    let second = worker.run_initial(0, graph.vertex_ids()).expect("rerun");
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.signatures, second.signatures);
}

#[test]
fn test_corrupt_snapshot_is_cache_error() {
    let dir = tempdir().expect("tempdir");
    let snapshot = WorkerSnapshot::new(dir.path(), 1);
    fs::write(snapshot.rwr_path(), "{not json").expect("write");
    assert!(matches!(snapshot.load(), Err(GrayMatchError::Cache(_))));

    let graph = two_triangles();
    let pattern = triangle();
    let config = MatchConfig::default();
    let worker = Worker {
        graph: &graph,
        pattern: &pattern,
        condition: None,
        config: &config,
        cache_dir: Some(dir.path()),
    };
    assert!(matches!(
        worker.run_initial(1, graph.vertex_ids()),
        Err(GrayMatchError::Cache(_))
    ));
}

#[test]
fn test_snapshot_with_other_walk_settings_is_rescored() {
    let dir = tempdir().expect("tempdir");
    let graph = two_triangles();
    let pattern = triangle();
    let original = MatchConfig::default();
    let worker = Worker {
        graph: &graph,
        pattern: &pattern,
        condition: None,
        config: &original,
        cache_dir: Some(dir.path()),
    };
    let first = worker.run_initial(0, graph.vertex_ids()).expect("run");

    let changed = MatchConfig {
        rwr: RwrConfig {
            restart_probability: 0.3,
            continue_probability: 0.2,
            ..RwrConfig::default()
        },
        ..MatchConfig::default()
    };
    let worker = Worker {
        config: &changed,
        ..worker
    };
    let second = worker.run_initial(0, graph.vertex_ids()).expect("rerun");
    assert_eq!(first.matches, second.matches);

    let (scores, _) = WorkerSnapshot::new(dir.path(), 0).load().expect("load");
    let scores = scores.expect("scores");
    assert!(scores.config().same_walk(&changed.rwr));
    assert!(!scores.config().same_walk(&original.rwr));
    assert!(graph.vertex_ids().iter().all(|v| scores.has_source(*v)));
}
