use std::{
    collections::BTreeMap,
    path::Path,
    time::{Duration, Instant},
};

use log::info;

use crate::{
    condition::ConditionExpr,
    config::{MatchConfig, ScopeConfig},
    errors::GrayMatchError,
    graph::{AttributedGraph, EdgeAttrs, VertexId},
    pattern::Pattern,
    scope::get_recompute_nodes,
    worker::{Worker, WorkerTask, run_initial_parallel, run_parallel, split_by_components, split_evenly},
};

pub type EdgeRecord = (VertexId, VertexId, EdgeAttrs);

#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    pub step: i64,
    pub added_edges: usize,
    pub scope_size: usize,
    pub matches: usize,
    pub elapsed: Duration,
}

/// Edges grouped by replay step, steps ascending.
pub fn group_by_step(graph: &AttributedGraph) -> BTreeMap<i64, Vec<EdgeRecord>> {
    let mut steps: BTreeMap<i64, Vec<EdgeRecord>> = BTreeMap::new();
    let earliest = graph
        .edges()
        .iter()
        .filter_map(|(_, _, attrs)| attrs.added_at)
        .min()
        .unwrap_or(0);
    for (&src, &dst, attrs) in graph.edges() {
        let step = attrs.added_at.unwrap_or(earliest);
        steps.entry(step).or_default().push((src, dst, attrs.clone()));
    }
    steps
}

/// Replays edges by `added_at`; unstamped edges belong to the earliest step.
pub struct IncrementalRunner<'a> {
    full: &'a AttributedGraph,
    pattern: &'a Pattern,
    condition: Option<&'a ConditionExpr>,
    match_config: MatchConfig,
    scope_config: ScopeConfig,
    workers: usize,
    cache_dir: Option<&'a Path>,
}

impl<'a> IncrementalRunner<'a> {
    pub fn new(full: &'a AttributedGraph, pattern: &'a Pattern) -> Self {
        Self {
            full,
            pattern,
            condition: None,
            match_config: MatchConfig::default(),
            scope_config: ScopeConfig::default(),
            workers: 1,
            cache_dir: None,
        }
    }

    pub fn with_condition(mut self, condition: Option<&'a ConditionExpr>) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    pub fn with_scope_config(mut self, config: ScopeConfig) -> Self {
        self.scope_config = config;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_cache_dir(mut self, dir: Option<&'a Path>) -> Self {
        self.cache_dir = dir;
        self
    }

    /// Replays at most `max_steps` steps (all of them when zero), the base step
    /// included.
    pub fn run(&self, max_steps: usize) -> Result<Vec<StepReport>, GrayMatchError> {
        self.match_config.validate()?;
        let steps = group_by_step(self.full);
        let limit = if max_steps == 0 { steps.len() } else { max_steps };
        let mut steps = steps.into_iter().take(limit);
        let Some((base_step, base_edges)) = steps.next() else {
            return Err(GrayMatchError::invalid_input("graph has no edges to replay"));
        };

        let mut current = AttributedGraph::new(self.full.is_directed());
        self.insert_edges(&mut current, &base_edges);
        info!(
            "base step {base_step}: {} vertices, {} edges",
            current.vertex_count(),
            current.edge_count()
        );

        let started = Instant::now();
        let partitions = split_by_components(&current, self.workers);
        let report = run_initial_parallel(self.worker(&current), &partitions)?;
        let mut reports = vec![StepReport {
            step: base_step,
            added_edges: base_edges.len(),
            scope_size: current.vertex_count(),
            matches: report.total,
            elapsed: started.elapsed(),
        }];

        for (step, edges) in steps {
            let started = Instant::now();
            self.insert_edges(&mut current, &edges);
            let mut affected: Vec<VertexId> =
                edges.iter().flat_map(|(s, d, _)| [*s, *d]).collect();
            affected.sort_unstable();
            affected.dedup();
            let scope: Vec<VertexId> =
                get_recompute_nodes(&current, &affected, &self.scope_config)
                    .into_iter()
                    .collect();

            let tasks: Vec<WorkerTask> = split_evenly(&edges, self.workers)
                .into_iter()
                .map(|batch| {
                    let mut seeds: Vec<VertexId> =
                        batch.iter().flat_map(|(s, d, _)| [*s, *d]).collect();
                    seeds.sort_unstable();
                    seeds.dedup();
                    WorkerTask {
                        seeds,
                        refresh: scope.clone(),
                    }
                })
                .collect();
            let report = run_parallel(self.worker(&current), &tasks)?;
            info!(
                "step {step}: {} edges, scope {}, {} matches",
                edges.len(),
                scope.len(),
                report.total
            );
            reports.push(StepReport {
                step,
                added_edges: edges.len(),
                scope_size: scope.len(),
                matches: report.total,
                elapsed: started.elapsed(),
            });
        }
        Ok(reports)
    }

    fn worker<'w>(&'w self, graph: &'w AttributedGraph) -> Worker<'w> {
        Worker {
            graph,
            pattern: self.pattern,
            condition: self.condition,
            config: &self.match_config,
            cache_dir: self.cache_dir,
        }
    }

    /// Adds the edges with their endpoints' attributes from the full graph.
    fn insert_edges(&self, graph: &mut AttributedGraph, edges: &[EdgeRecord]) {
        for (src, dst, attrs) in edges {
            for v in [src, dst] {
                if !graph.contains_vertex(v) {
                    graph.add_vertex(*v, self.full.vertex(v).cloned().unwrap_or_default());
                }
            }
            graph.add_edge(*src, *dst, attrs.clone());
        }
    }
}
