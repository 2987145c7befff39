use log::trace;

use crate::{
    extract::ExtractorCache,
    graph::{AttributedGraph, VertexId},
    pattern::VertexConstraint,
    rwr::ProximityOracle,
};

/// Read-only inputs an expander may consult.
pub struct ExpandContext<'a> {
    pub graph: &'a AttributedGraph,
    pub oracle: &'a dyn ProximityOracle,
    pub extractors: &'a ExtractorCache,
}

pub trait NeighborExpander {
    /// Data vertices adjacent to `mapped` that satisfy `constraint`, most promising
    /// first. `reversed` follows incoming instead of outgoing edges.
    fn expand_neighbors(
        &self,
        ctx: &ExpandContext<'_>,
        mapped: VertexId,
        constraint: &VertexConstraint,
        reversed: bool,
    ) -> Vec<VertexId>;

    /// Vertices after `src` leading to `dst`, ending with `dst`; `None` when they
    /// cannot be connected.
    fn bridge(&self, ctx: &ExpandContext<'_>, src: VertexId, dst: VertexId)
    -> Option<Vec<VertexId>>;
}

/// Ranks adjacent candidates by proximity to the anchor and bridges through the
/// unfiltered extractor when no direct edge exists.
#[derive(Clone, Debug, Default)]
pub struct ProximityExpander {
    max_candidates: Option<usize>,
}

impl ProximityExpander {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_candidates(mut self, max_candidates: Option<usize>) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn max_candidates(&self) -> Option<usize> {
        self.max_candidates
    }
}

impl NeighborExpander for ProximityExpander {
    fn expand_neighbors(
        &self,
        ctx: &ExpandContext<'_>,
        mapped: VertexId,
        constraint: &VertexConstraint,
        reversed: bool,
    ) -> Vec<VertexId> {
        let adjacent = if reversed {
            ctx.graph.predecessors(&mapped)
        } else {
            ctx.graph.neighbors(&mapped)
        };
        let mut ranked: Vec<(f64, VertexId)> = adjacent
            .into_iter()
            .filter(|v| ctx.graph.satisfies(v, constraint.label(), &constraint.props))
            .map(|v| (ctx.oracle.proximity(mapped, v), v))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        if let Some(limit) = self.max_candidates {
            ranked.truncate(limit);
        }
        trace!("{} candidates around {mapped}", ranked.len());
        ranked.into_iter().map(|(_, v)| v).collect()
    }

    fn bridge(
        &self,
        ctx: &ExpandContext<'_>,
        src: VertexId,
        dst: VertexId,
    ) -> Option<Vec<VertexId>> {
        if ctx.graph.has_edge(&src, &dst) {
            return Some(vec![dst]);
        }
        let path = ctx
            .extractors
            .get_or_create("")
            .get_path(ctx.graph, ctx.oracle, src, dst);
        (!path.is_empty()).then_some(path)
    }
}
