use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use ahash::AHashSet;
use log::{info, warn};
use rayon::prelude::*;

use crate::{
    algo::weakly_connected_components,
    condition::{Condition, ConditionExpr},
    config::MatchConfig,
    errors::GrayMatchError,
    extract::{ExtractSnapshot, ExtractorCache, PathExtractor},
    graph::{AttributedGraph, VertexId},
    matcher::{Matcher, NodeMap},
    pattern::Pattern,
    rwr::RwrScores,
    subgraph::MatchedSubgraph,
};

/// Greedily hands the largest remaining component to the worker holding the
/// fewest vertices (lowest worker id on ties).
pub fn split_by_components(graph: &AttributedGraph, workers: usize) -> Vec<Vec<VertexId>> {
    let workers = workers.max(1);
    let mut parts: Vec<Vec<VertexId>> = vec![Vec::new(); workers];
    for component in weakly_connected_components(graph) {
        let lightest = (0..workers).min_by_key(|&w| (parts[w].len(), w)).unwrap_or(0);
        parts[lightest].extend(component);
    }
    parts
}

/// Contiguous chunks of `len / workers` items; the last worker takes the rest.
pub fn split_evenly<T: Clone>(items: &[T], workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let chunk = items.len() / workers;
    (0..workers)
        .map(|w| {
            let start = w * chunk;
            let end = if w + 1 == workers {
                items.len()
            } else {
                start + chunk
            };
            items[start..end].to_vec()
        })
        .collect()
}

/// Persisted state of one worker.
#[derive(Clone, Debug)]
pub struct WorkerSnapshot {
    pid: usize,
    dir: PathBuf,
}

impl WorkerSnapshot {
    pub fn new(dir: &Path, pid: usize) -> Self {
        Self {
            pid,
            dir: dir.to_path_buf(),
        }
    }

    pub fn rwr_path(&self) -> PathBuf {
        self.dir.join(format!("{}_rwr.json", self.pid))
    }

    pub fn extract_path(&self) -> PathBuf {
        self.dir.join(format!("{}_ext.json", self.pid))
    }

    /// Missing files are `None`; unreadable or corrupt ones are errors.
    pub fn load(&self) -> Result<(Option<RwrScores>, Option<ExtractSnapshot>), GrayMatchError> {
        Ok((read_json(&self.rwr_path())?, read_json(&self.extract_path())?))
    }

    pub fn store(
        &self,
        scores: &RwrScores,
        extract: &ExtractSnapshot,
    ) -> Result<(), GrayMatchError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| GrayMatchError::cache(format!("{}: {e}", self.dir.display())))?;
        write_json(&self.rwr_path(), scores)?;
        write_json(&self.extract_path(), extract)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, GrayMatchError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .map_err(|e| GrayMatchError::cache(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| GrayMatchError::cache(format!("corrupt snapshot {}: {e}", path.display())))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), GrayMatchError> {
    let text = serde_json::to_string(value)
        .map_err(|e| GrayMatchError::serialization(e.to_string()))?;
    fs::write(path, text).map_err(|e| GrayMatchError::cache(format!("{}: {e}", path.display())))
}

/// One worker's share of a step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkerTask {
    /// Seed vertices to match from.
    pub seeds: Vec<VertexId>,
    /// Vertices whose proximity rows and extraction trees are stale.
    pub refresh: Vec<VertexId>,
}

#[derive(Clone, Debug)]
pub struct WorkerReport {
    pub pid: usize,
    pub seeds: usize,
    pub matches: usize,
    pub timed_out: bool,
    pub elapsed: Duration,
    pub signatures: Vec<String>,
}

/// Inputs shared by every worker of a run.
#[derive(Clone, Copy)]
pub struct Worker<'a> {
    pub graph: &'a AttributedGraph,
    pub pattern: &'a Pattern,
    pub condition: Option<&'a ConditionExpr>,
    pub config: &'a MatchConfig,
    pub cache_dir: Option<&'a Path>,
}

impl<'a> Worker<'a> {
    /// First run: proximity rows for every vertex of the partition.
    pub fn run_initial(&self, pid: usize, partition: &[VertexId]) -> Result<WorkerReport, GrayMatchError> {
        let task = WorkerTask {
            seeds: partition.to_vec(),
            refresh: Vec::new(),
        };
        self.run_task(pid, &task, partition)
    }

    /// Later steps: refresh the stale scope, then match from the new seeds.
    pub fn run_incremental(&self, pid: usize, task: &WorkerTask) -> Result<WorkerReport, GrayMatchError> {
        self.run_task(pid, task, &[])
    }

    fn run_task(
        &self,
        pid: usize,
        task: &WorkerTask,
        warm: &[VertexId],
    ) -> Result<WorkerReport, GrayMatchError> {
        let started = Instant::now();
        let snapshot = self.cache_dir.map(|dir| WorkerSnapshot::new(dir, pid));
        let (scores, trees) = match &snapshot {
            Some(snapshot) => snapshot.load()?,
            None => (None, None),
        };
        let (scores, trees) = match scores {
            Some(scores) if !scores.config().same_walk(&self.config.rwr) => {
                warn!("worker {pid}: snapshot scored with other walk settings, discarding it");
                (None, None)
            }
            scores => (scores, trees),
        };
        let mut scores = scores.unwrap_or_else(|| RwrScores::new(self.config.rwr.clone()));
        let extractors = ExtractorCache::new(self.config.max_hops);
        if let Some(trees) = trees {
            if trees.max_hops == self.config.max_hops && trees.label.is_none() {
                extractors.insert(PathExtractor::from(trees));
            } else {
                warn!("worker {pid}: snapshot built with other settings, discarding trees");
            }
        }

        let stale: Vec<VertexId> = task
            .refresh
            .iter()
            .copied()
            .filter(|v| self.graph.contains_vertex(v))
            .collect();
        extractors.invalidate(&stale);
        scores.refresh(self.graph, &stale)?;
        let missing: AHashSet<VertexId> = task
            .seeds
            .iter()
            .chain(warm)
            .copied()
            .filter(|v| !scores.has_source(*v))
            .collect();
        let mut missing: Vec<VertexId> = missing.into_iter().collect();
        missing.sort_unstable();
        scores.recompute(self.graph, &missing)?;

        let mut matcher =
            Matcher::new(self.graph, self.pattern, &scores, self.config.clone()).with_extractors(extractors);
        if let Some(condition) = self.condition {
            matcher = matcher.with_condition(Box::new(
                move |subgraph: &MatchedSubgraph, nodemap: &NodeMap| {
                    condition.evaluate(subgraph, nodemap)
                },
            ));
        }
        matcher.run_seeds(&task.seeds);

        if let Some(snapshot) = &snapshot {
            let unfiltered = matcher.extractors().get_or_create("");
            snapshot.store(&scores, &ExtractSnapshot::from(&*unfiltered))?;
        }
        let report = WorkerReport {
            pid,
            seeds: task.seeds.len(),
            matches: matcher.count(),
            timed_out: matcher.timed_out(),
            elapsed: started.elapsed(),
            signatures: matcher
                .results()
                .iter()
                .map(|r| r.subgraph.structural_signature())
                .collect(),
        };
        info!(
            "worker {pid}: {} matches from {} seeds in {:?}",
            report.matches, report.seeds, report.elapsed
        );
        Ok(report)
    }
}

#[derive(Clone, Debug)]
pub struct ParallelReport {
    pub workers: Vec<WorkerReport>,
    pub total: usize,
}

impl ParallelReport {
    fn from_workers(workers: Vec<WorkerReport>) -> Self {
        let total = workers.iter().map(|w| w.matches).sum();
        Self { workers, total }
    }
}

/// Initial run over seed partitions, one worker per partition.
pub fn run_initial_parallel(
    worker: Worker<'_>,
    partitions: &[Vec<VertexId>],
) -> Result<ParallelReport, GrayMatchError> {
    let reports = partitions
        .par_iter()
        .enumerate()
        .map(|(pid, partition)| worker.run_initial(pid, partition))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParallelReport::from_workers(reports))
}

/// Incremental run, one worker per task.
pub fn run_parallel(
    worker: Worker<'_>,
    tasks: &[WorkerTask],
) -> Result<ParallelReport, GrayMatchError> {
    let reports = tasks
        .par_iter()
        .enumerate()
        .map(|(pid, task)| worker.run_incremental(pid, task))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParallelReport::from_workers(reports))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split_gives_remainder_to_last() {
        let parts = split_evenly(&[1, 2, 3, 4, 5], 2);
        assert_eq!(parts, vec![vec![1, 2], vec![3, 4, 5]]);
        let parts = split_evenly(&[1, 2], 3);
        assert_eq!(parts, vec![vec![], vec![], vec![1, 2]]);
    }
}
