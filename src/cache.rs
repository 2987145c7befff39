use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::{extract::ExtractTree, graph::VertexId};

/// Per-seed extraction trees, shared between readers.
#[derive(Default)]
pub struct TreeCache {
    inner: RwLock<AHashMap<VertexId, Arc<ExtractTree>>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AHashMap::new()),
        }
    }

    pub fn get(&self, seed: VertexId) -> Option<Arc<ExtractTree>> {
        self.inner.read().get(&seed).cloned()
    }

    pub fn insert(&self, seed: VertexId, tree: Arc<ExtractTree>) {
        self.inner.write().insert(seed, tree);
    }

    /// Drops the trees rooted at any of `seeds`; returns how many were cached.
    pub fn invalidate(&self, seeds: &[VertexId]) -> usize {
        let mut guard = self.inner.write();
        seeds.iter().filter(|s| guard.remove(s).is_some()).count()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<ExtractTree>> {
        let mut trees: Vec<Arc<ExtractTree>> = self.inner.read().values().cloned().collect();
        trees.sort_by_key(|t| t.seed());
        trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extract::PathExtractor, graph::AttributedGraph, rwr::RwrScores};

    #[test]
    fn invalidate_and_clear() {
        let mut g = AttributedGraph::undirected();
        g.add_edge(1, 2, Default::default());
        let scores = RwrScores::new(Default::default());
        let extractor = PathExtractor::new(None, 3);
        let cache = TreeCache::new();
        for seed in [2, 1] {
            cache.insert(seed, extractor.tree(&g, &scores, seed));
        }
        let seeds: Vec<_> = cache.snapshot().iter().map(|t| t.seed()).collect();
        assert_eq!(seeds, vec![1, 2]);
        assert_eq!(cache.invalidate(&[2, 7]), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
