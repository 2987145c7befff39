use graymatch::{
    AttributedGraph, EdgeAttrs, GrayMatchError, Pattern, PatternBuilder, VertexAttrs,
    incremental::{IncrementalRunner, group_by_step},
};
use tempfile::tempdir;

/// A triangle closing at step 1 and a detached edge arriving at step 2.
fn timeline() -> AttributedGraph {
    let mut graph = AttributedGraph::undirected();
    for v in 1..=5 {
        graph.add_vertex(v, VertexAttrs::labeled("cyan"));
    }
    graph.add_edge(1, 2, EdgeAttrs::default().added_at(0));
    graph.add_edge(2, 3, EdgeAttrs::default());
    graph.add_edge(3, 1, EdgeAttrs::default().added_at(1));
    graph.add_edge(4, 5, EdgeAttrs::default().added_at(2));
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
fn test_unstamped_edges_join_earliest_step() {
    let steps = group_by_step(&timeline());
    assert_eq!(steps.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(steps[&0].len(), 2);
    assert_eq!(steps[&1].len(), 1);
}

#[test]
fn test_replay_finds_match_when_triangle_closes() {
    let graph = timeline();
    let pattern = triangle();
    for workers in [1, 2] {
        let reports = IncrementalRunner::new(&graph, &pattern)
            .with_workers(workers)
            .run(0)
            .expect("replay");
        let matches: Vec<usize> = reports.iter().map(|r| r.matches).collect();
        assert_eq!(matches, vec![0, 1, 0]);
        assert_eq!(reports[1].added_edges, 1);
        assert_eq!(reports[1].scope_size, 3);
        assert_eq!(reports[2].scope_size, 2);
    }
}

#[test]
fn test_step_limit_stops_replay() {
    let graph = timeline();
    let pattern = triangle();
    let reports = IncrementalRunner::new(&graph, &pattern).run(2).expect("replay");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].step, 0);
    assert_eq!(reports[1].step, 1);
}

#[test]
fn test_replay_with_cache_dir_reuses_snapshots() {
    let dir = tempdir().expect("tempdir");
    let graph = timeline();
    let pattern = triangle();
    let runner = IncrementalRunner::new(&graph, &pattern).with_cache_dir(Some(dir.path()));
    let first = runner.run(0).expect("first");
    assert!(dir.path().join("0_rwr.json").exists());
    let second = runner.run(0).expect("second");
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!((a.step, a.matches), (b.step, b.matches));
    }
}

#[test]
fn test_graph_without_edges_is_rejected() {
    let mut graph = AttributedGraph::undirected();
    graph.add_vertex(1, VertexAttrs::labeled("cyan"));
    let pattern = triangle();
    assert!(matches!(
        IncrementalRunner::new(&graph, &pattern).run(0),
        Err(GrayMatchError::InvalidInput(_))
    ));
}
