use std::collections::BTreeSet;

use ahash::AHashMap;
use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{
    config::ScopeConfig,
    graph::{AttributedGraph, VertexId},
};

/// Leaf clusters of the recursive decomposition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterPartition {
    membership: AHashMap<VertexId, usize>,
    members: Vec<Vec<VertexId>>,
}

impl ClusterPartition {
    pub fn from_clusters(clusters: Vec<Vec<VertexId>>) -> Self {
        let mut membership = AHashMap::new();
        for (id, cluster) in clusters.iter().enumerate() {
            for &v in cluster {
                membership.insert(v, id);
            }
        }
        Self {
            membership,
            members: clusters,
        }
    }

    pub fn cluster_of(&self, v: VertexId) -> Option<usize> {
        self.membership.get(&v).copied()
    }

    pub fn members_of(&self, cluster: usize) -> &[VertexId] {
        self.members.get(cluster).map_or(&[], Vec::as_slice)
    }

    pub fn clusters(&self) -> &[Vec<VertexId>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Union of the clusters of `affected`. Vertices outside the partition are ignored.
    pub fn recompute_nodes(&self, affected: &[VertexId]) -> BTreeSet<VertexId> {
        let mut scope = BTreeSet::new();
        for &v in affected {
            match self.cluster_of(v) {
                Some(cluster) => scope.extend(self.members_of(cluster).iter().copied()),
                None => debug!("vertex {v} is not clustered, skipping"),
            }
        }
        scope
    }
}

pub fn get_recompute_nodes(
    graph: &AttributedGraph,
    affected: &[VertexId],
    config: &ScopeConfig,
) -> BTreeSet<VertexId> {
    let partition = recursive_clusters(graph, config);
    let scope = partition.recompute_nodes(affected);
    info!(
        "recompute scope: {} vertices from {} affected over {} clusters",
        scope.len(),
        affected.len(),
        partition.len()
    );
    scope
}

pub fn recursive_clusters(graph: &AttributedGraph, config: &ScopeConfig) -> ClusterPartition {
    let mut leaves = Vec::new();
    split(graph, config, &mut leaves);
    ClusterPartition::from_clusters(leaves)
}

fn split(graph: &AttributedGraph, config: &ScopeConfig, leaves: &mut Vec<Vec<VertexId>>) {
    let mut communities = louvain(graph, config);
    if communities.len() <= 1 {
        leaves.append(&mut communities);
        return;
    }
    for community in communities {
        if community.len() >= config.min_cluster_size {
            let sub = graph.induced_subgraph(&community);
            split(&sub, config, leaves);
        } else {
            leaves.push(community);
        }
    }
}

/// Multi-level Louvain on the undirected view of `graph`; parallel edges add
/// weight. Communities are listed in first-vertex order.
pub fn louvain(graph: &AttributedGraph, config: &ScopeConfig) -> Vec<Vec<VertexId>> {
    let ids = graph.vertex_ids();
    if ids.is_empty() {
        return Vec::new();
    }
    let index: AHashMap<VertexId, usize> = ids.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    let mut adjacency: Vec<AHashMap<usize, f64>> = vec![AHashMap::new(); ids.len()];
    let mut strength = vec![0.0f64; ids.len()];
    let mut total = 0.0f64;
    for (src, dst, _) in graph.edges() {
        let (s, d) = (index[src], index[dst]);
        strength[s] += 1.0;
        strength[d] += 1.0;
        total += 1.0;
        if s != d {
            *adjacency[s].entry(d).or_default() += 1.0;
            *adjacency[d].entry(s).or_default() += 1.0;
        }
    }
    if total == 0.0 {
        return ids.iter().map(|&v| vec![v]).collect();
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    // membership[i]: node of the current level that vertex i belongs to
    let mut membership: Vec<usize> = (0..ids.len()).collect();
    loop {
        let assignment = one_level(&adjacency, &strength, total, config.resolution, &mut rng);
        let count = assignment.iter().max().map_or(0, |&c| c + 1);
        if count == adjacency.len() {
            break;
        }
        for node in membership.iter_mut() {
            *node = assignment[*node];
        }
        let mut next_adjacency: Vec<AHashMap<usize, f64>> = vec![AHashMap::new(); count];
        let mut next_strength = vec![0.0f64; count];
        for (u, neighbors) in adjacency.iter().enumerate() {
            let cu = assignment[u];
            next_strength[cu] += strength[u];
            for (&v, &w) in neighbors {
                let cv = assignment[v];
                if cu != cv {
                    *next_adjacency[cu].entry(cv).or_default() += w;
                }
            }
        }
        adjacency = next_adjacency;
        strength = next_strength;
        if count == 1 {
            break;
        }
    }

    let mut order: AHashMap<usize, usize> = AHashMap::new();
    let mut communities: Vec<Vec<VertexId>> = Vec::new();
    for (i, &node) in membership.iter().enumerate() {
        let slot = *order.entry(node).or_insert_with(|| {
            communities.push(Vec::new());
            communities.len() - 1
        });
        communities[slot].push(ids[i]);
    }
    debug!(
        "louvain: {} vertices in {} communities",
        ids.len(),
        communities.len()
    );
    communities
}

/// Local moving phase. Returns a dense community id per node.
fn one_level(
    adjacency: &[AHashMap<usize, f64>],
    strength: &[f64],
    total: f64,
    resolution: f64,
    rng: &mut StdRng,
) -> Vec<usize> {
    let n = adjacency.len();
    let two_m = 2.0 * total;
    let mut community: Vec<usize> = (0..n).collect();
    let mut tot: Vec<f64> = strength.to_vec();
    let mut visit: Vec<usize> = (0..n).collect();
    visit.shuffle(rng);

    let mut moved = true;
    let mut passes = 0;
    while moved && passes < 100 {
        moved = false;
        passes += 1;
        for &node in &visit {
            let current = community[node];
            let k = strength[node];
            let mut links: Vec<(usize, f64)> = Vec::new();
            for (&neighbor, &w) in &adjacency[node] {
                let c = community[neighbor];
                match links.iter_mut().find(|(id, _)| *id == c) {
                    Some(entry) => entry.1 += w,
                    None => links.push((c, w)),
                }
            }
            links.sort_by_key(|(c, _)| *c);

            tot[current] -= k;
            let gain = |c: usize, w: f64| w - resolution * tot[c] * k / two_m;
            let own = links
                .iter()
                .find(|(c, _)| *c == current)
                .map_or(0.0, |(_, w)| *w);
            let mut best = current;
            let mut best_gain = gain(current, own);
            for &(c, w) in &links {
                let g = gain(c, w);
                if g > best_gain {
                    best = c;
                    best_gain = g;
                }
            }
            tot[best] += k;
            if best != current {
                community[node] = best;
                moved = true;
            }
        }
    }

    let mut renumber: AHashMap<usize, usize> = AHashMap::new();
    community
        .into_iter()
        .map(|c| {
            let next = renumber.len();
            *renumber.entry(c).or_insert(next)
        })
        .collect()
}
