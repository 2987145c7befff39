use ahash::AHashSet;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::graph::{AttributedGraph, EdgeAttrs, VertexAttrs, VertexId};

#[derive(Clone, Debug)]
pub enum GraphShape {
    Line,
    Ring,
    RandomErdosRenyi { edges: usize },
    /// `cliques` complete graphs of `size` vertices, consecutive cliques joined by one edge.
    CliqueRing { cliques: usize, size: usize },
}

#[derive(Clone, Debug)]
pub struct DatasetSpec<'a> {
    pub shape: GraphShape,
    pub nodes: usize,
    pub labels: &'a [&'a str],
    pub directed: bool,
    /// Spread edges over this many replay steps; zero leaves them unstamped.
    pub steps: usize,
    pub seed: u64,
}

/// Labeled data graph with vertex ids `0..nodes`. Labels are drawn uniformly.
pub fn generate_graph(spec: &DatasetSpec<'_>) -> AttributedGraph {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let nodes = match spec.shape {
        GraphShape::CliqueRing { cliques, size } => cliques * size,
        _ => spec.nodes,
    };
    let mut graph = AttributedGraph::new(spec.directed);
    for id in 0..nodes {
        let attrs = match spec.labels.len() {
            0 => VertexAttrs::default(),
            n => VertexAttrs::labeled(spec.labels[rng.gen_range(0..n)]),
        };
        graph.add_vertex(id as VertexId, attrs.prop("idx", &id.to_string()));
    }
    let pairs: Vec<(usize, usize)> = match spec.shape {
        GraphShape::Line => (1..nodes).map(|v| (v - 1, v)).collect(),
        GraphShape::Ring if nodes > 2 => (0..nodes).map(|v| (v, (v + 1) % nodes)).collect(),
        GraphShape::Ring => (1..nodes).map(|v| (v - 1, v)).collect(),
        GraphShape::RandomErdosRenyi { edges } => random_pairs(nodes, edges, &mut rng),
        GraphShape::CliqueRing { cliques, size } => clique_ring_pairs(cliques, size),
    };
    let total = pairs.len();
    for (idx, (src, dst)) in pairs.into_iter().enumerate() {
        let mut attrs = EdgeAttrs::default();
        if spec.steps > 0 {
            attrs = attrs.added_at((idx * spec.steps / total.max(1)) as i64);
        }
        graph.add_edge(src as VertexId, dst as VertexId, attrs);
    }
    graph
}

fn clique_ring_pairs(cliques: usize, size: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for c in 0..cliques {
        let base = c * size;
        for a in 0..size {
            for b in (a + 1)..size {
                pairs.push((base + a, base + b));
            }
        }
    }
    if cliques > 1 && size > 0 {
        for c in 0..cliques {
            let next = (c + 1) % cliques;
            if cliques == 2 && c == 1 {
                break;
            }
            pairs.push((c * size + size - 1, next * size));
        }
    }
    pairs
}

/// Distinct unordered pairs drawn by rejection; stops early once draws keep colliding.
fn random_pairs(node_count: usize, edge_count: usize, rng: &mut StdRng) -> Vec<(usize, usize)> {
    if node_count < 2 {
        return Vec::new();
    }
    let target = edge_count.min(node_count * (node_count - 1) / 2);
    let mut taken: AHashSet<(usize, usize)> = AHashSet::with_capacity(target);
    let mut pairs = Vec::with_capacity(target);
    let mut budget = target.saturating_mul(16).max(64);
    while pairs.len() < target && budget > 0 {
        budget -= 1;
        let a = rng.gen_range(0..node_count);
        let b = rng.gen_range(0..node_count);
        if a == b {
            continue;
        }
        let pair = (a.min(b), a.max(b));
        if taken.insert(pair) {
            pairs.push(pair);
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_seeded() {
        let spec = DatasetSpec {
            shape: GraphShape::RandomErdosRenyi { edges: 40 },
            nodes: 30,
            labels: &["cyan", "magenta"],
            directed: false,
            steps: 4,
            seed: 7,
        };
        let a = generate_graph(&spec);
        let b = generate_graph(&spec);
        assert_eq!(a.edge_count(), b.edge_count());
        assert!(a.edge_count() <= 40);
        for v in a.vertex_ids() {
            assert_eq!(a.vertex(v), b.vertex(v));
        }
    }

    #[test]
    fn clique_ring_shape() {
        let spec = DatasetSpec {
            shape: GraphShape::CliqueRing { cliques: 3, size: 4 },
            nodes: 0,
            labels: &[],
            directed: false,
            steps: 0,
            seed: 1,
        };
        let g = generate_graph(&spec);
        assert_eq!(g.vertex_count(), 12);
        assert_eq!(g.edge_count(), 3 * 6 + 3);
    }
}
