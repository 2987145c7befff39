use std::{collections::BTreeMap, rc::Rc, time::Instant};

use ahash::AHashSet;
use log::{debug, info, trace};

use crate::{
    condition::Condition,
    config::MatchConfig,
    expand::{ExpandContext, NeighborExpander, ProximityExpander},
    extract::ExtractorCache,
    graph::{AttributedGraph, EdgeKind, VertexAttrs, VertexId},
    pattern::Pattern,
    rwr::ProximityOracle,
    subgraph::{MatchedSubgraph, StructureKey},
};

/// Query vertex name to data vertex.
pub type NodeMap = BTreeMap<String, VertexId>;

#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub subgraph: MatchedSubgraph,
    pub nodemap: NodeMap,
}

#[derive(Clone, Copy, Debug)]
enum Delta {
    Vertex(VertexId),
    Edge(VertexId, VertexId),
    Evict(VertexId),
}

#[derive(Debug)]
struct Trail {
    delta: Delta,
    parent: Option<Rc<Trail>>,
}

/// One branch of the search. The subgraph so far is a trail of deltas shared
/// between forks and replayed only when the branch completes.
#[derive(Clone, Debug)]
struct SearchState {
    nodemap: Vec<Option<VertexId>>,
    touched: Vec<usize>,
    unprocessed: Vec<bool>,
    remaining: usize,
    trail: Option<Rc<Trail>>,
}

impl SearchState {
    fn seed(pattern: &Pattern, query_vertex: usize, data_vertex: VertexId) -> Self {
        let mut state = Self {
            nodemap: vec![None; pattern.vertex_count()],
            touched: vec![query_vertex],
            unprocessed: vec![true; pattern.edge_count()],
            remaining: pattern.edge_count(),
            trail: None,
        };
        state.nodemap[query_vertex] = Some(data_vertex);
        state.push(Delta::Vertex(data_vertex));
        state
    }

    fn push(&mut self, delta: Delta) {
        let parent = self.trail.take();
        self.trail = Some(Rc::new(Trail { delta, parent }));
    }

    fn touch(&mut self, query_vertex: usize) {
        if !self.touched.contains(&query_vertex) {
            self.touched.push(query_vertex);
        }
    }

    fn consume(&mut self, edge: usize) {
        self.unprocessed[edge] = false;
        self.remaining -= 1;
    }

    /// Binds a query vertex, evicting the data vertex it was bound to before.
    fn bind(&mut self, query_vertex: usize, data_vertex: VertexId) {
        if let Some(previous) = self.nodemap[query_vertex] {
            if previous != data_vertex {
                self.push(Delta::Evict(previous));
            }
        }
        self.nodemap[query_vertex] = Some(data_vertex);
        self.push(Delta::Vertex(data_vertex));
    }

    fn add_path(&mut self, start: VertexId, path: &[VertexId]) {
        let mut prev = start;
        for &next in path {
            self.push(Delta::Edge(prev, next));
            prev = next;
        }
    }

    fn materialize(&self, graph: &AttributedGraph) -> MatchedSubgraph {
        let mut deltas = Vec::new();
        let mut cursor = self.trail.as_deref();
        while let Some(node) = cursor {
            deltas.push(node.delta);
            cursor = node.parent.as_deref();
        }
        let mut subgraph = MatchedSubgraph::new(graph.is_directed());
        for delta in deltas.into_iter().rev() {
            match delta {
                Delta::Vertex(v) => subgraph.add_vertex(v, VertexAttrs::default()),
                Delta::Edge(s, d) => subgraph.add_edge(s, d),
                Delta::Evict(v) => subgraph.remove_vertex(v),
            }
        }
        for (v, attrs) in subgraph.vertices_mut() {
            if let Some(data) = graph.vertex(v) {
                *attrs = data.clone();
            }
        }
        subgraph
    }

    fn named_map(&self, pattern: &Pattern) -> NodeMap {
        self.nodemap
            .iter()
            .enumerate()
            .filter_map(|(q, v)| v.map(|v| (pattern.vertex(q).name.clone(), v)))
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
struct Step {
    anchor: usize,
    next: usize,
    edge: usize,
    reversed: bool,
}

pub struct Matcher<'g> {
    graph: &'g AttributedGraph,
    pattern: &'g Pattern,
    oracle: &'g dyn ProximityOracle,
    config: MatchConfig,
    condition: Option<Box<dyn Condition + 'g>>,
    expander: Box<dyn NeighborExpander + 'g>,
    extractors: ExtractorCache,
    results: Vec<MatchResult>,
    seen: AHashSet<StructureKey>,
    timed_out: bool,
}

impl<'g> Matcher<'g> {
    pub fn new(
        graph: &'g AttributedGraph,
        pattern: &'g Pattern,
        oracle: &'g dyn ProximityOracle,
        config: MatchConfig,
    ) -> Self {
        let expander = ProximityExpander::new().with_max_candidates(config.max_candidates);
        Self {
            graph,
            pattern,
            oracle,
            extractors: ExtractorCache::new(config.max_hops),
            config,
            condition: None,
            expander: Box::new(expander),
            results: Vec::new(),
            seen: AHashSet::new(),
            timed_out: false,
        }
    }

    pub fn with_condition(mut self, condition: Box<dyn Condition + 'g>) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_expander(mut self, expander: Box<dyn NeighborExpander + 'g>) -> Self {
        self.expander = expander;
        self
    }

    /// Resumes with previously built extraction trees.
    pub fn with_extractors(mut self, extractors: ExtractorCache) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn extractors(&self) -> &ExtractorCache {
        &self.extractors
    }

    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    pub fn count(&self) -> usize {
        self.results.len()
    }

    pub fn into_results(self) -> Vec<MatchResult> {
        self.results
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Data vertices satisfying the seed vertex's label and properties.
    pub fn candidate_seeds(&self) -> Vec<VertexId> {
        let constraint = &self.pattern.vertex(self.pattern.seed_vertex()).constraint;
        self.graph
            .filter_vertices(constraint.label(), &constraint.props)
    }

    /// Runs from every candidate seed; returns the number of new results.
    pub fn run(&mut self) -> usize {
        let seeds = self.candidate_seeds();
        self.run_seeds(&seeds)
    }

    /// Runs from the given seeds. Seeds missing from the graph or failing the
    /// seed vertex constraint are skipped.
    pub fn run_seeds(&mut self, seeds: &[VertexId]) -> usize {
        let pattern = self.pattern;
        let graph = self.graph;
        let k = pattern.seed_vertex();
        let constraint = &pattern.vertex(k).constraint;
        let seeds: Vec<VertexId> = seeds
            .iter()
            .copied()
            .filter(|s| graph.satisfies(s, constraint.label(), &constraint.props))
            .collect();
        if seeds.is_empty() {
            info!("no seed vertices to match from");
            return 0;
        }
        info!("matching from {} seeds", seeds.len());
        let started = Instant::now();
        let before = self.results.len();
        for seed in seeds {
            debug!("seed {seed}");
            let state = SearchState::seed(pattern, k, seed);
            self.process(state);
            if let Some(limit) = self.config.time_limit {
                if started.elapsed() > limit {
                    info!("time limit of {limit:?} reached, skipping remaining seeds");
                    self.timed_out = true;
                    break;
                }
            }
        }
        let found = self.results.len() - before;
        info!("found {found} matches in {:?}", started.elapsed());
        found
    }

    fn context(&self) -> ExpandContext<'_> {
        ExpandContext {
            graph: self.graph,
            oracle: self.oracle,
            extractors: &self.extractors,
        }
    }

    fn process(&mut self, mut state: SearchState) {
        if state.remaining == 0 {
            self.finish(&state);
            return;
        }
        let Some(step) = self.next_step(&state) else {
            trace!("no reachable unprocessed edge, dropping branch");
            return;
        };
        let Some(anchor) = state.nodemap[step.anchor] else {
            return;
        };
        state.consume(step.edge);
        state.touch(step.next);
        let kind = self.pattern.edges()[step.edge].kind;
        match kind {
            EdgeKind::Path => self.expand_path(state, step, anchor),
            EdgeKind::Direct => self.expand_direct(state, step, anchor),
        }
    }

    /// First unprocessed edge leaving a touched vertex, forward edges before
    /// reverse ones.
    fn next_step(&self, state: &SearchState) -> Option<Step> {
        for &k in &state.touched {
            for &l in self.pattern.successors(k) {
                if let Some(edge) = self.pick_edge(state, k, l) {
                    return Some(Step {
                        anchor: k,
                        next: l,
                        edge,
                        reversed: false,
                    });
                }
            }
            if self.pattern.is_directed() {
                for &l in self.pattern.predecessors(k) {
                    if let Some(edge) = self.pick_edge(state, l, k) {
                        return Some(Step {
                            anchor: k,
                            next: l,
                            edge,
                            reversed: true,
                        });
                    }
                }
            }
        }
        None
    }

    /// Among unprocessed parallel edges a labeled one wins.
    fn pick_edge(&self, state: &SearchState, src: usize, dst: usize) -> Option<usize> {
        let mut fallback = None;
        for edge in self.pattern.edges_between(src, dst) {
            if !state.unprocessed[edge.index] {
                continue;
            }
            if edge.label.is_some() {
                return Some(edge.index);
            }
            fallback.get_or_insert(edge.index);
        }
        fallback
    }

    /// Forks once per reachable target satisfying the far vertex's constraint.
    fn expand_path(&mut self, state: SearchState, step: Step, anchor: VertexId) {
        let pattern = self.pattern;
        let graph = self.graph;
        let label = pattern.edges()[step.edge].extractor_label();
        let constraint = &pattern.vertex(step.next).constraint;
        let paths: Vec<(VertexId, Vec<VertexId>)> = self
            .extractors
            .get_or_create(label)
            .get_paths(graph, self.oracle, anchor)
            .into_iter()
            .filter(|(target, _)| graph.satisfies(target, constraint.label(), &constraint.props))
            .collect();
        if paths.is_empty() {
            trace!("no path from {anchor} with label {label:?}");
            return;
        }
        for (target, path) in paths {
            let mut fork = state.clone();
            fork.bind(step.next, target);
            fork.add_path(anchor, &path);
            self.process(fork);
        }
    }

    fn expand_direct(&mut self, state: SearchState, step: Step, anchor: VertexId) {
        let pattern = self.pattern;
        let candidates = match state.nodemap[step.next] {
            Some(existing) => vec![existing],
            None => {
                let constraint = &pattern.vertex(step.next).constraint;
                let ctx = self.context();
                self.expander
                    .expand_neighbors(&ctx, anchor, constraint, step.reversed)
            }
        };
        let label = pattern.edges()[step.edge].label.as_deref();
        for candidate in candidates {
            let (src, dst) = if step.reversed {
                (candidate, anchor)
            } else {
                (anchor, candidate)
            };
            if src == dst {
                continue;
            }
            let bridge = {
                let ctx = self.context();
                self.expander.bridge(&ctx, src, dst)
            };
            let Some(path) = bridge.filter(|p| !p.is_empty()) else {
                continue;
            };
            if !self.path_has_label(src, &path, label) {
                continue;
            }
            let mut fork = state.clone();
            fork.bind(step.next, candidate);
            fork.add_path(src, &path);
            self.process(fork);
        }
    }

    fn path_has_label(&self, start: VertexId, path: &[VertexId], label: Option<&str>) -> bool {
        let mut prev = start;
        for &next in path {
            if !self.graph.has_edge_label(&prev, &next, label) {
                return false;
            }
            prev = next;
        }
        true
    }

    fn finish(&mut self, state: &SearchState) {
        let subgraph = state.materialize(self.graph);
        if !self.is_valid(state, &subgraph) {
            return;
        }
        let nodemap = state.named_map(self.pattern);
        if let Some(condition) = &self.condition {
            if !condition.evaluate(&subgraph, &nodemap) {
                trace!("condition rejected {}", subgraph.structural_signature());
                return;
            }
        }
        if !self.seen.insert(subgraph.structure_key()) {
            return;
        }
        debug!(
            "match {}: {}",
            self.results.len() + 1,
            subgraph.structural_signature()
        );
        self.results.push(MatchResult { subgraph, nodemap });
    }

    fn is_valid(&self, state: &SearchState, subgraph: &MatchedSubgraph) -> bool {
        if !self.pattern.has_path_edges()
            && (subgraph.vertex_count() != self.pattern.vertex_count()
                || subgraph.edge_count() != self.pattern.edge_count())
        {
            return false;
        }
        let degrees_match = state.nodemap.iter().enumerate().all(|(q, mapped)| {
            mapped.is_none_or(|v| subgraph.degree(v) == self.pattern.degree(q))
        });
        if !degrees_match {
            return false;
        }
        if self.config.require_injective {
            let mapped: Vec<VertexId> = state.nodemap.iter().flatten().copied().collect();
            let distinct: AHashSet<VertexId> = mapped.iter().copied().collect();
            if distinct.len() != mapped.len() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{EdgeAttrs, VertexAttrs},
        pattern::PatternBuilder,
        rwr::{RwrConfig, RwrScores},
    };

    #[test]
    fn forks_share_trail() {
        let pattern = PatternBuilder::new(false)
            .vertex("a", None)
            .vertex("b", None)
            .edge("a", "b", None)
            .build()
            .unwrap();
        let mut state = SearchState::seed(&pattern, 0, 1);
        let mut left = state.clone();
        left.bind(1, 2);
        state.bind(1, 3);
        let root = state.trail.as_ref().unwrap().parent.as_ref().unwrap();
        assert_eq!(Rc::strong_count(root), 2);
        assert_eq!(left.nodemap, vec![Some(1), Some(2)]);
        assert_eq!(state.nodemap, vec![Some(1), Some(3)]);
    }

    #[test]
    fn eviction_replaces_previous_binding() {
        let mut g = AttributedGraph::undirected();
        for v in 1..=3 {
            g.add_vertex(v, VertexAttrs::labeled("x"));
        }
        g.add_edge(1, 2, EdgeAttrs::default());
        g.add_edge(1, 3, EdgeAttrs::default());
        let pattern = PatternBuilder::new(false)
            .vertex("a", None)
            .vertex("b", None)
            .edge("a", "b", None)
            .build()
            .unwrap();
        let mut state = SearchState::seed(&pattern, 0, 1);
        state.bind(1, 2);
        state.add_path(1, &[2]);
        state.bind(1, 3);
        state.add_path(1, &[3]);
        let sg = state.materialize(&g);
        assert_eq!(sg.node_set().into_iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(sg.edges(), &[(1, 3)]);
        assert_eq!(sg.vertex(3).unwrap().label_str(), "x");
    }

    #[test]
    fn single_vertex_pattern_matches_each_seed() {
        let mut g = AttributedGraph::undirected();
        g.add_vertex(1, VertexAttrs::labeled("x"));
        g.add_vertex(2, VertexAttrs::labeled("y"));
        g.add_vertex(3, VertexAttrs::labeled("x"));
        let scores = RwrScores::compute(&g, RwrConfig::default()).unwrap();
        let pattern = PatternBuilder::new(false)
            .vertex("a", Some("x"))
            .build()
            .unwrap();
        let mut matcher = Matcher::new(&g, &pattern, &scores, MatchConfig::default());
        assert_eq!(matcher.run(), 2);
        assert_eq!(matcher.results()[0].nodemap["a"], 1);
    }
}
