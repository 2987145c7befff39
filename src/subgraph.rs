use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::graph::{VertexAttrs, VertexId};

/// Vertex and edge sets identifying a match regardless of discovery order.
pub type StructureKey = (Vec<VertexId>, Vec<(VertexId, VertexId)>);

/// The part of the data graph a match covers. Parallel edges are kept.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchedSubgraph {
    directed: bool,
    vertices: BTreeMap<VertexId, VertexAttrs>,
    edges: Vec<(VertexId, VertexId)>,
}

impl MatchedSubgraph {
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            vertices: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn add_vertex(&mut self, id: VertexId, attrs: VertexAttrs) {
        self.vertices.insert(id, attrs);
    }

    pub fn add_edge(&mut self, src: VertexId, dst: VertexId) {
        self.vertices.entry(src).or_default();
        self.vertices.entry(dst).or_default();
        self.edges.push((src, dst));
    }

    /// Removes a vertex and every edge touching it.
    pub fn remove_vertex(&mut self, id: VertexId) {
        self.vertices.remove(&id);
        self.edges.retain(|&(s, d)| s != id && d != id);
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&VertexAttrs> {
        self.vertices.get(&id)
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys().copied()
    }

    pub fn vertices_mut(&mut self) -> impl Iterator<Item = (&VertexId, &mut VertexAttrs)> {
        self.vertices.iter_mut()
    }

    pub fn edges(&self) -> &[(VertexId, VertexId)] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge endpoints equal to `id`; a self loop contributes two.
    pub fn degree(&self, id: VertexId) -> usize {
        self.edges
            .iter()
            .map(|&(s, d)| usize::from(s == id) + usize::from(d == id))
            .sum()
    }

    pub fn node_set(&self) -> BTreeSet<VertexId> {
        self.vertices.keys().copied().collect()
    }

    /// Distinct edges; undirected edges are normalised to `(min, max)`.
    pub fn edge_set(&self) -> BTreeSet<(VertexId, VertexId)> {
        self.edges
            .iter()
            .map(|&(s, d)| {
                if self.directed || s <= d {
                    (s, d)
                } else {
                    (d, s)
                }
            })
            .collect()
    }

    pub fn structure_key(&self) -> StructureKey {
        (
            self.node_set().into_iter().collect(),
            self.edge_set().into_iter().collect(),
        )
    }

    pub fn same_structure(&self, other: &Self) -> bool {
        self.node_set() == other.node_set() && self.edge_set() == other.edge_set()
    }

    pub fn structural_signature(&self) -> String {
        let node_str = self
            .vertices
            .keys()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let arrow = if self.directed { "->" } else { "-" };
        let edge_str = self
            .edge_set()
            .iter()
            .map(|(s, d)| format!("{s}{arrow}{d}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("N[{node_str}]|E[{edge_str}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undirected_edges_compare_without_orientation() {
        let mut a = MatchedSubgraph::new(false);
        a.add_edge(1, 2);
        a.add_edge(2, 3);
        let mut b = MatchedSubgraph::new(false);
        b.add_edge(3, 2);
        b.add_edge(2, 1);
        assert!(a.same_structure(&b));
        assert_eq!(a.structural_signature(), "N[1,2,3]|E[1-2,2-3]");
    }

    #[test]
    fn remove_vertex_drops_incident_edges() {
        let mut g = MatchedSubgraph::new(true);
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        g.remove_vertex(2);
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.degree(1), 0);
    }
}
