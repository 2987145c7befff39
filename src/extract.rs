use std::{
    cmp::Ordering,
    collections::{BTreeMap, BinaryHeap},
    sync::Arc,
};

use ahash::{AHashMap, AHashSet};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    cache::TreeCache,
    graph::{AttributedGraph, VertexId},
    rwr::ProximityOracle,
};

pub const DEFAULT_MAX_HOPS: usize = 5;

/// Best-path tree rooted at one seed. `pre[seed] == seed` always holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractTree {
    seed: VertexId,
    pre: BTreeMap<VertexId, VertexId>,
    score: BTreeMap<VertexId, f64>,
    hops: BTreeMap<VertexId, usize>,
}

impl ExtractTree {
    pub fn seed(&self) -> VertexId {
        self.seed
    }

    pub fn predecessor(&self, v: VertexId) -> Option<VertexId> {
        self.pre.get(&v).copied()
    }

    pub fn score(&self, v: VertexId) -> Option<f64> {
        self.score.get(&v).copied()
    }

    /// Number of vertices on the best path including the seed (the seed itself is 1).
    pub fn hops(&self, v: VertexId) -> Option<usize> {
        self.hops.get(&v).copied()
    }

    pub fn reached(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.pre.keys().copied()
    }

    /// Vertices after the seed up to and including `target`; empty when unreachable.
    pub fn path_to(&self, target: VertexId) -> Vec<VertexId> {
        if !self.pre.contains_key(&target) {
            return Vec::new();
        }
        let mut path = Vec::new();
        let mut v = target;
        while v != self.seed {
            path.push(v);
            if path.len() > self.pre.len() {
                return Vec::new();
            }
            match self.pre.get(&v) {
                Some(&p) => v = p,
                None => return Vec::new(),
            }
        }
        path.reverse();
        path
    }
}

#[derive(Clone, Copy, Debug)]
struct FrontierEntry {
    score: f64,
    vertex: VertexId,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    // highest score first, lowest vertex id on ties
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Lazily built best-path trees for one edge-label filter.
pub struct PathExtractor {
    label: Option<String>,
    max_hops: usize,
    trees: TreeCache,
}

impl PathExtractor {
    pub fn new(label: Option<&str>, max_hops: usize) -> Self {
        Self {
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
            max_hops,
            trees: TreeCache::new(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    pub fn cached_trees(&self) -> usize {
        self.trees.len()
    }

    /// The tree rooted at `seed`, built on first request.
    pub fn tree(
        &self,
        graph: &AttributedGraph,
        oracle: &dyn ProximityOracle,
        seed: VertexId,
    ) -> Arc<ExtractTree> {
        if let Some(tree) = self.trees.get(seed) {
            return tree;
        }
        let tree = Arc::new(self.build(graph, oracle, seed));
        self.trees.insert(seed, Arc::clone(&tree));
        tree
    }

    pub fn compute_all(&self, graph: &AttributedGraph, oracle: &dyn ProximityOracle) {
        for &seed in graph.vertex_ids() {
            self.tree(graph, oracle, seed);
        }
    }

    pub fn get_path(
        &self,
        graph: &AttributedGraph,
        oracle: &dyn ProximityOracle,
        i: VertexId,
        j: VertexId,
    ) -> Vec<VertexId> {
        self.tree(graph, oracle, i).path_to(j)
    }

    /// Best path to every reachable target, ordered by target id.
    pub fn get_paths(
        &self,
        graph: &AttributedGraph,
        oracle: &dyn ProximityOracle,
        i: VertexId,
    ) -> Vec<(VertexId, Vec<VertexId>)> {
        let tree = self.tree(graph, oracle, i);
        tree.reached()
            .filter_map(|j| {
                let path = tree.path_to(j);
                (!path.is_empty()).then_some((j, path))
            })
            .collect()
    }

    /// Drops trees rooted inside the recompute scope.
    pub fn invalidate(&self, scope: &[VertexId]) -> usize {
        self.trees.invalidate(scope)
    }

    pub fn trees(&self) -> Vec<Arc<ExtractTree>> {
        self.trees.snapshot()
    }

    pub fn restore(&self, trees: impl IntoIterator<Item = ExtractTree>) {
        for tree in trees {
            self.trees.insert(tree.seed, Arc::new(tree));
        }
    }

    fn build(
        &self,
        graph: &AttributedGraph,
        oracle: &dyn ProximityOracle,
        seed: VertexId,
    ) -> ExtractTree {
        let default_value = match graph.vertex_count() {
            0 => 1.0,
            n => 1.0 / n as f64,
        };
        let goodness = |v: VertexId| {
            let value = oracle.proximity(seed, v);
            if value == 0.0 { default_value } else { value }
        };

        let mut pre = BTreeMap::new();
        let mut score: AHashMap<VertexId, f64> = AHashMap::new();
        let mut hops: AHashMap<VertexId, usize> = AHashMap::new();
        let mut finished = AHashSet::new();
        let mut frontier = BinaryHeap::new();

        pre.insert(seed, seed);
        score.insert(seed, goodness(seed));
        hops.insert(seed, 1);
        frontier.push(FrontierEntry {
            score: score[&seed],
            vertex: seed,
        });

        while let Some(FrontierEntry { score: d, vertex: u }) = frontier.pop() {
            if finished.contains(&u) || score.get(&u) != Some(&d) {
                continue;
            }
            finished.insert(u);
            let lu = hops[&u];
            if lu >= self.max_hops {
                continue;
            }
            for v in graph.neighbors(&u) {
                if finished.contains(&v) {
                    continue;
                }
                if !graph.has_edge_label(&u, &v, self.label.as_deref()) {
                    continue;
                }
                let dist = (goodness(v) + d * lu as f64) / (lu as f64 + 1.0);
                let improves = score.get(&v).is_none_or(|&current| current < dist);
                if improves {
                    score.insert(v, dist);
                    hops.insert(v, lu + 1);
                    pre.insert(v, u);
                    frontier.push(FrontierEntry {
                        score: dist,
                        vertex: v,
                    });
                }
            }
        }
        debug!(
            "extract tree for seed {seed} label {:?}: {} vertices",
            self.label,
            pre.len()
        );
        ExtractTree {
            seed,
            pre,
            score: score.into_iter().collect(),
            hops: hops.into_iter().collect(),
        }
    }
}

/// One [`PathExtractor`] per required edge label, created on first use.
pub struct ExtractorCache {
    max_hops: usize,
    extractors: RwLock<AHashMap<String, Arc<PathExtractor>>>,
}

impl ExtractorCache {
    pub fn new(max_hops: usize) -> Self {
        Self {
            max_hops,
            extractors: RwLock::new(AHashMap::new()),
        }
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// `""` selects the unfiltered extractor.
    pub fn get_or_create(&self, label: &str) -> Arc<PathExtractor> {
        if let Some(extractor) = self.extractors.read().get(label) {
            return Arc::clone(extractor);
        }
        let max_hops = self.max_hops;
        let mut guard = self.extractors.write();
        let extractor = guard
            .entry(label.to_string())
            .or_insert_with(|| Arc::new(PathExtractor::new(Some(label), max_hops)));
        Arc::clone(extractor)
    }

    pub fn get(&self, label: &str) -> Option<Arc<PathExtractor>> {
        self.extractors.read().get(label).cloned()
    }

    pub fn insert(&self, extractor: PathExtractor) {
        let key = extractor.label().unwrap_or("").to_string();
        self.extractors.write().insert(key, Arc::new(extractor));
    }

    pub fn len(&self) -> usize {
        self.extractors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.read().is_empty()
    }

    pub fn invalidate(&self, scope: &[VertexId]) -> usize {
        self.extractors
            .read()
            .values()
            .map(|e| e.invalidate(scope))
            .sum()
    }
}

impl Default for ExtractorCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HOPS)
    }
}

/// Serialized extraction trees of one extractor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractSnapshot {
    pub label: Option<String>,
    pub max_hops: usize,
    pub trees: Vec<ExtractTree>,
}

impl From<&PathExtractor> for ExtractSnapshot {
    fn from(extractor: &PathExtractor) -> Self {
        Self {
            label: extractor.label.clone(),
            max_hops: extractor.max_hops,
            trees: extractor.trees().iter().map(|t| (**t).clone()).collect(),
        }
    }
}

impl From<ExtractSnapshot> for PathExtractor {
    fn from(snapshot: ExtractSnapshot) -> Self {
        let extractor = PathExtractor::new(snapshot.label.as_deref(), snapshot.max_hops);
        extractor.restore(snapshot.trees);
        extractor
    }
}
