use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use graymatch::{
    AttributedGraph, ExtractorCache, MatchConfig, Matcher, PatternBuilder, RwrConfig, RwrScores,
    ScopeConfig,
    bench_utils::{DatasetSpec, GraphShape, generate_graph},
    get_recompute_nodes,
};

const CLIQUE_SEED: u64 = 0xC11C;
const ER_SEED: u64 = 0x9E4A_77;
const SAMPLE_SIZE: usize = 10;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(800);
const LABELS: &[&str] = &["cyan", "magenta", "yellow"];

fn bench_scale() -> usize {
    #[cfg(feature = "bench-ci")]
    {
        200
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        1_000
    }
}

fn datasets() -> Vec<(&'static str, AttributedGraph)> {
    let nodes = bench_scale();
    let cliques = generate_graph(&DatasetSpec {
        shape: GraphShape::CliqueRing {
            cliques: nodes / 10,
            size: 10,
        },
        nodes,
        labels: LABELS,
        directed: false,
        steps: 0,
        seed: CLIQUE_SEED,
    });
    let random = generate_graph(&DatasetSpec {
        shape: GraphShape::RandomErdosRenyi { edges: nodes * 3 },
        nodes,
        labels: LABELS,
        directed: false,
        steps: 0,
        seed: ER_SEED,
    });
    vec![("cliques", cliques), ("er", random)]
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_tree");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for (label, graph) in datasets() {
        let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
        group.bench_with_input(BenchmarkId::from_parameter(label), &graph, |b, graph| {
            b.iter(|| {
                let extractors = ExtractorCache::default();
                extractors
                    .get_or_create("")
                    .get_paths(graph, &scores, graph.vertex_ids()[0])
            });
        });
    }
    group.finish();
}

fn bench_triangle(c: &mut Criterion) {
    let pattern = PatternBuilder::new(false)
        .vertex("a", Some("cyan"))
        .vertex("b", Some("cyan"))
        .vertex("c", Some("magenta"))
        .edge("a", "b", None)
        .edge("b", "c", None)
        .edge("c", "a", None)
        .build()
        .expect("pattern");
    let mut group = c.benchmark_group("match_triangle");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for (label, graph) in datasets() {
        let scores = RwrScores::compute(&graph, RwrConfig::default()).expect("rwr");
        group.bench_with_input(BenchmarkId::from_parameter(label), &graph, |b, graph| {
            b.iter(|| {
                let mut matcher = Matcher::new(graph, &pattern, &scores, MatchConfig::default());
                matcher.run()
            });
        });
    }
    group.finish();
}

fn bench_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute_scope");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    let config = ScopeConfig::default();
    for (label, graph) in datasets() {
        let affected: Vec<i64> = graph.vertex_ids().iter().step_by(50).copied().collect();
        group.bench_with_input(BenchmarkId::from_parameter(label), &graph, |b, graph| {
            b.iter(|| get_recompute_nodes(graph, &affected, &config));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_extract, bench_triangle, bench_scope);
criterion_main!(benches);
