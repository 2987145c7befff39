use std::collections::BTreeSet;

use graymatch::{
    AttributedGraph, EdgeAttrs, ExtractorCache, PathExtractor, RwrConfig, RwrScores, VertexId,
    bench_utils::{DatasetSpec, GraphShape, generate_graph},
};

fn line(len: i64) -> AttributedGraph {
    let mut graph = AttributedGraph::undirected();
    for v in 1..len {
        graph.add_edge(v - 1, v, EdgeAttrs::default());
    }
    graph
}

fn labeled_triangle() -> AttributedGraph {
    let mut graph = AttributedGraph::undirected();
    graph.add_edge(1, 2, EdgeAttrs::labeled("x"));
    graph.add_edge(2, 3, EdgeAttrs::labeled("y"));
    graph.add_edge(1, 3, EdgeAttrs::labeled("x"));
    graph
}

fn random_graph() -> AttributedGraph {
    generate_graph(&DatasetSpec {
        shape: GraphShape::RandomErdosRenyi { edges: 120 },
        nodes: 60,
        labels: &[],
        directed: false,
        steps: 0,
        seed: 0x5EED,
    })
}

#[test]
fn test_tree_is_self_rooted() {
    let graph = random_graph();
    let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
    let extractor = PathExtractor::new(None, 5);
    for &seed in graph.vertex_ids() {
        let tree = extractor.tree(&graph, &scores, seed);
        assert_eq!(tree.predecessor(seed), Some(seed));
        assert_eq!(tree.hops(seed), Some(1));
        assert!(extractor.get_path(&graph, &scores, seed, seed).is_empty());
    }
}

#[test]
fn test_paths_respect_hop_cap() {
    let graph = line(8);
    let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
    let extractor = PathExtractor::new(None, 5);
    assert_eq!(extractor.get_path(&graph, &scores, 0, 4), vec![1, 2, 3, 4]);
    assert!(extractor.get_path(&graph, &scores, 0, 5).is_empty());
    for (_, path) in extractor.get_paths(&graph, &scores, 0) {
        assert!(path.len() < extractor.max_hops());
    }

    let random = random_graph();
    let scores = RwrScores::compute(&random, RwrConfig::default()).expect("rwr");
    let extractor = PathExtractor::new(None, 3);
    for &seed in random.vertex_ids() {
        for (target, path) in extractor.get_paths(&random, &scores, seed) {
            assert!(path.len() < 3, "path to {target} too long: {path:?}");
            assert_eq!(path.last(), Some(&target));
        }
    }
}

#[test]
fn test_raising_hop_cap_only_adds_targets() {
    let graph = line(8);
    let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
    let short = PathExtractor::new(None, 3);
    let long = PathExtractor::new(None, 8);
    assert_eq!(short.get_path(&graph, &scores, 0, 2), vec![1, 2]);
    assert!(short.get_path(&graph, &scores, 0, 4).is_empty());
    assert_eq!(long.get_path(&graph, &scores, 0, 2), vec![1, 2]);
    assert_eq!(long.get_path(&graph, &scores, 0, 4), vec![1, 2, 3, 4]);
    assert_eq!(long.get_path(&graph, &scores, 0, 7), vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_raising_hop_cap_keeps_targets_on_random_graphs() {
    for seed in 0..6u64 {
        let graph = generate_graph(&DatasetSpec {
            shape: GraphShape::RandomErdosRenyi { edges: 120 },
            nodes: 60,
            labels: &[],
            directed: false,
            steps: 0,
            seed,
        });
        let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
        for (low, high) in [(3, 4), (3, 5), (4, 5), (5, 6)] {
            let short = PathExtractor::new(None, low);
            let long = PathExtractor::new(None, high);
            for &v in graph.vertex_ids() {
                let wide: BTreeSet<VertexId> = long
                    .get_paths(&graph, &scores, v)
                    .into_iter()
                    .map(|(target, _)| target)
                    .collect();
                for (target, path) in short.get_paths(&graph, &scores, v) {
                    assert!(path.len() < low);
                    assert!(
                        wide.contains(&target),
                        "seed {seed}: cap {high} lost {v}->{target}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_label_filter_changes_reachability() {
    let graph = labeled_triangle();
    let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
    let any = PathExtractor::new(None, 5);
    let only_x = PathExtractor::new(Some("x"), 5);
    let only_y = PathExtractor::new(Some("y"), 5);
    assert_eq!(any.get_path(&graph, &scores, 2, 3), vec![3]);
    assert_eq!(only_x.get_path(&graph, &scores, 2, 3), vec![1, 3]);
    assert!(only_y.get_paths(&graph, &scores, 1).is_empty());
    assert_eq!(only_y.get_path(&graph, &scores, 2, 3), vec![3]);
}

#[test]
fn test_unreachable_target_gives_empty_path() {
    let mut graph = line(3);
    graph.add_edge(10, 11, EdgeAttrs::default());
    let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
    let extractor = PathExtractor::new(None, 5);
    assert!(extractor.get_path(&graph, &scores, 0, 11).is_empty());
    assert!(extractor.get_path(&graph, &scores, 0, 99).is_empty());
}

#[test]
fn test_trees_are_deterministic() {
    let graph = random_graph();
    let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
    let first = PathExtractor::new(None, 5);
    let second = PathExtractor::new(None, 5);
    for &seed in graph.vertex_ids() {
        assert_eq!(
            *first.tree(&graph, &scores, seed),
            *second.tree(&graph, &scores, seed)
        );
    }
}

#[test]
fn test_zero_proximity_falls_back_to_uniform_value() {
    let graph = line(4);
    let scores = RwrScores::new(RwrConfig::default());
    let extractor = PathExtractor::new(None, 5);
    let tree = extractor.tree(&graph, &scores, 0);
    assert_eq!(tree.score(0), Some(0.25));
    assert_eq!(extractor.get_path(&graph, &scores, 0, 3), vec![1, 2, 3]);
}

#[test]
fn test_cache_invalidation_drops_scoped_trees() {
    let graph = line(5);
    let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
    let cache = ExtractorCache::new(5);
    let any = cache.get_or_create("");
    let labeled = cache.get_or_create("x");
    assert_eq!(cache.len(), 2);
    any.compute_all(&graph, &scores);
    labeled.tree(&graph, &scores, 1);
    assert_eq!(any.cached_trees(), 5);
    assert_eq!(cache.invalidate(&[1, 2]), 3);
    assert_eq!(any.cached_trees(), 3);
    assert_eq!(labeled.cached_trees(), 0);
    assert!(std::sync::Arc::ptr_eq(&any, &cache.get_or_create("")));
}
