use std::collections::BTreeMap;

use ahash::AHashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    errors::GrayMatchError,
    graph::{AttributedGraph, VertexId},
};

/// Relatedness of every vertex to a source vertex.
pub trait ProximityOracle {
    /// Score of `target` seen from `source`; 0.0 means "unknown".
    fn proximity(&self, source: VertexId, target: VertexId) -> f64;
    fn vertex_count(&self) -> usize;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RwrConfig {
    pub restart_probability: f64,
    /// Probability that the walker stays in place for one step.
    pub continue_probability: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for RwrConfig {
    fn default() -> Self {
        Self {
            restart_probability: 0.7,
            continue_probability: 0.1,
            max_iterations: 100,
            tolerance: 1e-9,
        }
    }
}

impl RwrConfig {
    /// Same walk up to float noise picked up by a JSON round trip.
    pub fn same_walk(&self, other: &RwrConfig) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= 1e-12;
        close(self.restart_probability, other.restart_probability)
            && close(self.continue_probability, other.continue_probability)
            && close(self.tolerance, other.tolerance)
            && self.max_iterations == other.max_iterations
    }

    pub fn validate(&self) -> Result<(), GrayMatchError> {
        let r = self.restart_probability;
        let c = self.continue_probability;
        if !(0.0..=1.0).contains(&r) || !(0.0..=1.0).contains(&c) || r + c > 1.0 {
            return Err(GrayMatchError::invalid_input(format!(
                "invalid walk probabilities restart={r} continue={c}"
            )));
        }
        if self.max_iterations == 0 {
            return Err(GrayMatchError::invalid_input("max_iterations must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "RwrSnapshot", from = "RwrSnapshot")]
pub struct RwrScores {
    config: RwrConfig,
    vertex_count: usize,
    rows: AHashMap<VertexId, AHashMap<VertexId, f64>>,
}

impl RwrScores {
    pub fn new(config: RwrConfig) -> Self {
        Self {
            config,
            vertex_count: 0,
            rows: AHashMap::new(),
        }
    }

    /// Scores for every source vertex of `graph`.
    pub fn compute(graph: &AttributedGraph, config: RwrConfig) -> Result<Self, GrayMatchError> {
        let mut scores = Self::new(config);
        let sources = graph.vertex_ids().to_vec();
        scores.recompute(graph, &sources)?;
        Ok(scores)
    }

    /// Recomputes the rows of `sources`; every other row is left untouched.
    pub fn recompute(
        &mut self,
        graph: &AttributedGraph,
        sources: &[VertexId],
    ) -> Result<(), GrayMatchError> {
        self.config.validate()?;
        self.vertex_count = graph.vertex_count();
        if sources.is_empty() {
            return Ok(());
        }
        info!("computing RWR for {} sources", sources.len());
        let walk = Transition::new(graph);
        for &source in sources {
            match walk.index.get(&source) {
                Some(&start) => {
                    let row = walk.run(start, &self.config);
                    self.rows.insert(source, row);
                }
                None => {
                    debug!("RWR source {source} not in graph, dropping row");
                    self.rows.remove(&source);
                }
            }
        }
        Ok(())
    }

    /// Recomputes the rows already held for vertices of `scope`. Rows for
    /// sources never computed stay absent.
    pub fn refresh(
        &mut self,
        graph: &AttributedGraph,
        scope: &[VertexId],
    ) -> Result<(), GrayMatchError> {
        let held: Vec<VertexId> = scope
            .iter()
            .copied()
            .filter(|v| self.rows.contains_key(v))
            .collect();
        debug!("refreshing {} of {} scope rows", held.len(), scope.len());
        self.recompute(graph, &held)
    }

    pub fn has_source(&self, source: VertexId) -> bool {
        self.rows.contains_key(&source)
    }

    pub fn source_count(&self) -> usize {
        self.rows.len()
    }

    pub fn config(&self) -> &RwrConfig {
        &self.config
    }
}

impl ProximityOracle for RwrScores {
    fn proximity(&self, source: VertexId, target: VertexId) -> f64 {
        self.rows
            .get(&source)
            .and_then(|row| row.get(&target))
            .copied()
            .unwrap_or(0.0)
    }

    fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

struct Transition {
    ids: Vec<VertexId>,
    index: AHashMap<VertexId, usize>,
    successors: Vec<Vec<usize>>,
}

impl Transition {
    fn new(graph: &AttributedGraph) -> Self {
        let ids = graph.vertex_ids().to_vec();
        let index: AHashMap<VertexId, usize> =
            ids.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        let mut successors = vec![Vec::new(); ids.len()];
        for (src, dst, _) in graph.edges() {
            let (s, d) = (index[src], index[dst]);
            successors[s].push(d);
            if !graph.is_directed() && s != d {
                successors[d].push(s);
            }
        }
        Self {
            ids,
            index,
            successors,
        }
    }

    fn run(&self, start: usize, config: &RwrConfig) -> AHashMap<VertexId, f64> {
        let n = self.ids.len();
        let restart = config.restart_probability;
        let stay = config.continue_probability;
        let walk = 1.0 - restart - stay;
        let mut current = vec![0.0f64; n];
        current[start] = 1.0;
        let mut next = vec![0.0f64; n];
        for _ in 0..config.max_iterations {
            for (i, value) in next.iter_mut().enumerate() {
                *value = stay * current[i];
            }
            next[start] += restart;
            for (u, &mass) in current.iter().enumerate() {
                if mass == 0.0 {
                    continue;
                }
                let out = &self.successors[u];
                if out.is_empty() {
                    next[start] += walk * mass;
                    continue;
                }
                let share = walk * mass / out.len() as f64;
                for &v in out {
                    next[v] += share;
                }
            }
            let diff: f64 = current
                .iter()
                .zip(next.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            std::mem::swap(&mut current, &mut next);
            if diff < config.tolerance {
                break;
            }
        }
        current
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .map(|(i, score)| (self.ids[i], score))
            .collect()
    }
}

/// Serialized form of [`RwrScores`] with deterministic ordering.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RwrSnapshot {
    config: RwrConfig,
    vertex_count: usize,
    rows: BTreeMap<VertexId, Vec<(VertexId, f64)>>,
}

impl From<RwrScores> for RwrSnapshot {
    fn from(scores: RwrScores) -> Self {
        let rows = scores
            .rows
            .into_iter()
            .map(|(source, row)| {
                let mut entries: Vec<(VertexId, f64)> = row.into_iter().collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                (source, entries)
            })
            .collect();
        Self {
            config: scores.config,
            vertex_count: scores.vertex_count,
            rows,
        }
    }
}

impl From<RwrSnapshot> for RwrScores {
    fn from(snapshot: RwrSnapshot) -> Self {
        Self {
            config: snapshot.config,
            vertex_count: snapshot.vertex_count,
            rows: snapshot
                .rows
                .into_iter()
                .map(|(source, entries)| (source, entries.into_iter().collect()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeAttrs;

    fn line() -> AttributedGraph {
        let mut g = AttributedGraph::undirected();
        g.add_edge(1, 2, EdgeAttrs::default());
        g.add_edge(2, 3, EdgeAttrs::default());
        g.add_edge(3, 4, EdgeAttrs::default());
        g
    }

    #[test]
    fn mass_is_conserved_and_decays_with_distance() {
        let scores = RwrScores::compute(&line(), RwrConfig::default()).unwrap();
        let total: f64 = (1..=4).map(|t| scores.proximity(1, t)).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(scores.proximity(1, 1) > scores.proximity(1, 2));
        assert!(scores.proximity(1, 2) > scores.proximity(1, 3));
        assert!(scores.proximity(1, 3) > scores.proximity(1, 4));
    }

    #[test]
    fn recompute_only_touches_given_sources() {
        let mut g = line();
        let mut scores = RwrScores::compute(&g, RwrConfig::default()).unwrap();
        let before = scores.proximity(4, 3);
        g.add_edge(1, 3, EdgeAttrs::default());
        scores.recompute(&g, &[1]).unwrap();
        assert_eq!(scores.proximity(4, 3), before);
        assert!(scores.proximity(1, 3) > 0.0);
    }

    #[test]
    fn refresh_skips_rows_never_computed() {
        let mut g = line();
        let mut scores = RwrScores::new(RwrConfig::default());
        scores.recompute(&g, &[1]).unwrap();
        let stale = scores.proximity(1, 3);
        g.add_edge(1, 3, EdgeAttrs::default());
        scores.refresh(&g, &[1, 2]).unwrap();
        assert!(scores.proximity(1, 3) > stale);
        assert!(!scores.has_source(2));
        assert_eq!(scores.source_count(), 1);
    }

    #[test]
    fn rejects_probabilities_above_one() {
        let config = RwrConfig {
            restart_probability: 0.8,
            continue_probability: 0.5,
            ..RwrConfig::default()
        };
        assert!(RwrScores::compute(&line(), config).is_err());
    }
}
