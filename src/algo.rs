use std::cmp::Reverse;

use ahash::AHashSet;

use crate::graph::{AttributedGraph, VertexId};

/// Components ignoring edge direction, largest first; equal sizes are ordered by
/// their smallest member. Members are sorted.
pub fn weakly_connected_components(graph: &AttributedGraph) -> Vec<Vec<VertexId>> {
    let mut seen: AHashSet<VertexId> = AHashSet::with_capacity(graph.vertex_count());
    let mut components: Vec<Vec<VertexId>> = graph
        .vertex_ids()
        .iter()
        .filter_map(|&root| {
            if !seen.insert(root) {
                return None;
            }
            let mut stack = vec![root];
            let mut members = Vec::new();
            while let Some(v) = stack.pop() {
                members.push(v);
                stack.extend(graph.adjacent(&v).into_iter().filter(|n| seen.insert(*n)));
            }
            members.sort_unstable();
            Some(members)
        })
        .collect();
    components.sort_by_key(|c| (Reverse(c.len()), c.first().copied()));
    components
}

/// Vertices paired with their degree; ties keep ascending id in either direction.
pub fn nodes_by_degree(graph: &AttributedGraph, descending: bool) -> Vec<(VertexId, usize)> {
    let mut degrees: Vec<(VertexId, usize)> = graph
        .vertex_ids()
        .iter()
        .map(|&id| (id, graph.degree(&id)))
        .collect();
    if descending {
        degrees.sort_by_key(|&(id, degree)| (Reverse(degree), id));
    } else {
        degrees.sort_by_key(|&(id, degree)| (degree, id));
    }
    degrees
}
