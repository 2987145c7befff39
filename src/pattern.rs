use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::{
    errors::GrayMatchError,
    graph::{AttributedGraph, EdgeAttrs, EdgeKind, VertexAttrs},
};

/// Label and property requirements a data vertex must satisfy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexConstraint {
    pub label: Option<String>,
    pub props: BTreeMap<String, String>,
}

impl VertexConstraint {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryVertex {
    pub name: String,
    pub constraint: VertexConstraint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryEdge {
    pub index: usize,
    pub source: usize,
    pub target: usize,
    pub key: u32,
    pub label: Option<String>,
    pub kind: EdgeKind,
}

impl QueryEdge {
    /// Label filter handed to the path extractor; the empty string means unfiltered.
    pub fn extractor_label(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

/// Indexed, read-only view of a query graph.
#[derive(Clone, Debug)]
pub struct Pattern {
    directed: bool,
    vertices: Vec<QueryVertex>,
    edges: Vec<QueryEdge>,
    by_name: AHashMap<String, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    degrees: Vec<usize>,
}

impl Pattern {
    pub fn new(graph: &AttributedGraph<String>) -> Result<Self, GrayMatchError> {
        if graph.vertex_count() == 0 {
            return Err(GrayMatchError::invalid_input("pattern has no vertices"));
        }
        let mut by_name = AHashMap::new();
        let mut vertices = Vec::with_capacity(graph.vertex_count());
        for (idx, name) in graph.vertex_ids().iter().enumerate() {
            let attrs = graph.vertex(name).cloned().unwrap_or_default();
            by_name.insert(name.clone(), idx);
            vertices.push(QueryVertex {
                name: name.clone(),
                constraint: VertexConstraint {
                    label: attrs.label.filter(|l| !l.is_empty()),
                    props: attrs.props,
                },
            });
        }
        let edges = graph
            .edges()
            .into_iter()
            .enumerate()
            .map(|(index, (src, dst, attrs))| QueryEdge {
                index,
                source: by_name[src],
                target: by_name[dst],
                key: attrs.key,
                label: attrs.label.clone().filter(|l| !l.is_empty()),
                kind: attrs.kind,
            })
            .collect();
        let successors = graph
            .vertex_ids()
            .iter()
            .map(|v| graph.neighbors(v).iter().map(|n| by_name[n]).collect())
            .collect();
        let predecessors = graph
            .vertex_ids()
            .iter()
            .map(|v| graph.predecessors(v).iter().map(|n| by_name[n]).collect())
            .collect();
        let degrees = graph.vertex_ids().iter().map(|v| graph.degree(v)).collect();
        Ok(Self {
            directed: graph.is_directed(),
            vertices,
            edges,
            by_name,
            successors,
            predecessors,
            degrees,
        })
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self) -> &[QueryVertex] {
        &self.vertices
    }

    pub fn vertex(&self, idx: usize) -> &QueryVertex {
        &self.vertices[idx]
    }

    pub fn edges(&self) -> &[QueryEdge] {
        &self.edges
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// The query vertex every search is anchored on.
    pub fn seed_vertex(&self) -> usize {
        0
    }

    pub fn successors(&self, idx: usize) -> &[usize] {
        &self.successors[idx]
    }

    pub fn predecessors(&self, idx: usize) -> &[usize] {
        &self.predecessors[idx]
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.degrees[idx]
    }

    pub fn has_path_edges(&self) -> bool {
        self.edges.iter().any(|e| e.kind == EdgeKind::Path)
    }

    /// Edge indices joining `src` to `dst`, either orientation when undirected.
    pub fn edges_between(&self, src: usize, dst: usize) -> impl Iterator<Item = &QueryEdge> {
        let directed = self.directed;
        self.edges.iter().filter(move |e| {
            (e.source == src && e.target == dst)
                || (!directed && e.source == dst && e.target == src)
        })
    }
}

/// Fluent construction of query patterns.
#[derive(Clone, Debug)]
pub struct PatternBuilder {
    graph: AttributedGraph<String>,
}

impl PatternBuilder {
    pub fn new(directed: bool) -> Self {
        Self {
            graph: AttributedGraph::new(directed),
        }
    }

    pub fn vertex(mut self, name: &str, label: Option<&str>) -> Self {
        let attrs = match label {
            Some(label) => VertexAttrs::labeled(label),
            None => VertexAttrs::default(),
        };
        self.graph.add_vertex(name.to_string(), attrs);
        self
    }

    pub fn vertex_prop(mut self, name: &str, key: &str, value: &str) -> Self {
        self.graph
            .add_vertex(name.to_string(), VertexAttrs::default().prop(key, value));
        self
    }

    pub fn edge(mut self, src: &str, dst: &str, label: Option<&str>) -> Self {
        let mut attrs = EdgeAttrs::default();
        if let Some(label) = label {
            attrs = attrs.with_label(label);
        }
        self.graph.add_edge(src.to_string(), dst.to_string(), attrs);
        self
    }

    pub fn path(mut self, src: &str, dst: &str, label: Option<&str>) -> Self {
        let mut attrs = EdgeAttrs::path();
        if let Some(label) = label {
            attrs = attrs.with_label(label);
        }
        self.graph.add_edge(src.to_string(), dst.to_string(), attrs);
        self
    }

    pub fn graph(&self) -> &AttributedGraph<String> {
        &self.graph
    }

    pub fn build(self) -> Result<Pattern, GrayMatchError> {
        Pattern::new(&self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_pattern_indexes() {
        let pattern = PatternBuilder::new(false)
            .vertex("a", Some("cyan"))
            .vertex("b", Some("cyan"))
            .vertex("c", Some("cyan"))
            .edge("a", "b", None)
            .edge("b", "c", None)
            .edge("c", "a", None)
            .build()
            .unwrap();
        assert_eq!(pattern.vertex_count(), 3);
        assert_eq!(pattern.edge_count(), 3);
        assert_eq!(pattern.degree(0), 2);
        assert_eq!(pattern.successors(0), &[1, 2]);
        assert_eq!(pattern.edges_between(2, 0).count(), 1);
        assert!(!pattern.has_path_edges());
    }

    #[test]
    fn empty_pattern_rejected() {
        assert!(PatternBuilder::new(true).build().is_err());
    }
}
