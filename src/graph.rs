mod types;

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};

pub use types::{EdgeAttrs, EdgeKind, VertexAttrs, VertexId, VertexKey};

/// Attributed multigraph shared by data graphs (`V = VertexId`) and query patterns (`V = String`).
///
/// Vertices keep insertion order. Undirected edges are stored under both endpoints,
/// self loops once.
#[derive(Clone, Debug)]
pub struct AttributedGraph<V: VertexKey = VertexId> {
    directed: bool,
    order: Vec<V>,
    vertices: AHashMap<V, VertexAttrs>,
    outgoing: AHashMap<V, Vec<(V, EdgeAttrs)>>,
    incoming: AHashMap<V, Vec<(V, EdgeAttrs)>>,
    edge_count: usize,
}

impl<V: VertexKey> AttributedGraph<V> {
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            order: Vec::new(),
            vertices: AHashMap::new(),
            outgoing: AHashMap::new(),
            incoming: AHashMap::new(),
            edge_count: 0,
        }
    }

    pub fn directed() -> Self {
        Self::new(true)
    }

    pub fn undirected() -> Self {
        Self::new(false)
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn vertex_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn vertex_ids(&self) -> &[V] {
        &self.order
    }

    pub fn contains_vertex(&self, v: &V) -> bool {
        self.vertices.contains_key(v)
    }

    pub fn vertex(&self, v: &V) -> Option<&VertexAttrs> {
        self.vertices.get(v)
    }

    /// Inserts a vertex, merging label and properties into an existing one.
    pub fn add_vertex(&mut self, v: V, attrs: VertexAttrs) {
        match self.vertices.get_mut(&v) {
            Some(existing) => {
                if attrs.label.is_some() {
                    existing.label = attrs.label;
                }
                existing.props.extend(attrs.props);
            }
            None => {
                self.order.push(v.clone());
                self.vertices.insert(v, attrs);
            }
        }
    }

    fn ensure_vertex(&mut self, v: &V) {
        if !self.vertices.contains_key(v) {
            self.add_vertex(v.clone(), VertexAttrs::default());
        }
    }

    /// Adds a parallel edge and returns its key. A key already used between the
    /// endpoints is replaced by the next free one.
    pub fn add_edge(&mut self, src: V, dst: V, mut attrs: EdgeAttrs) -> u32 {
        self.ensure_vertex(&src);
        self.ensure_vertex(&dst);
        let used: AHashSet<u32> = self.edges_between(&src, &dst).iter().map(|e| e.key).collect();
        if used.contains(&attrs.key) {
            attrs.key = used.iter().copied().max().map_or(0, |k| k + 1);
        }
        let key = attrs.key;
        self.outgoing
            .entry(src.clone())
            .or_default()
            .push((dst.clone(), attrs.clone()));
        if self.directed {
            self.incoming.entry(dst).or_default().push((src, attrs));
        } else if src != dst {
            self.outgoing.entry(dst).or_default().push((src, attrs));
        }
        self.edge_count += 1;
        key
    }

    pub fn remove_edge(&mut self, src: &V, dst: &V, key: u32) -> bool {
        let removed = remove_entry(&mut self.outgoing, src, dst, key);
        if !removed {
            return false;
        }
        if self.directed {
            remove_entry(&mut self.incoming, dst, src, key);
        } else if src != dst {
            remove_entry(&mut self.outgoing, dst, src, key);
        }
        self.edge_count -= 1;
        true
    }

    /// Removes a vertex together with every incident edge.
    pub fn remove_vertex(&mut self, v: &V) -> bool {
        if self.vertices.remove(v).is_none() {
            return false;
        }
        self.order.retain(|u| u != v);
        let mut dropped = 0usize;
        if let Some(out) = self.outgoing.remove(v) {
            dropped += out.len();
            for (target, attrs) in out {
                if &target == v {
                    continue;
                }
                if self.directed {
                    remove_entry(&mut self.incoming, &target, v, attrs.key);
                } else {
                    remove_entry(&mut self.outgoing, &target, v, attrs.key);
                }
            }
        }
        if self.directed {
            if let Some(inc) = self.incoming.remove(v) {
                for (source, attrs) in inc {
                    if &source == v {
                        continue;
                    }
                    dropped += 1;
                    remove_entry(&mut self.outgoing, &source, v, attrs.key);
                }
            }
        }
        self.edge_count -= dropped;
        true
    }

    pub fn has_edge(&self, src: &V, dst: &V) -> bool {
        self.outgoing
            .get(src)
            .is_some_and(|out| out.iter().any(|(t, _)| t == dst))
    }

    pub fn edges_between(&self, src: &V, dst: &V) -> Vec<&EdgeAttrs> {
        self.outgoing
            .get(src)
            .map(|out| out.iter().filter(|(t, _)| t == dst).map(|(_, e)| e).collect())
            .unwrap_or_default()
    }

    pub fn edge_labels(&self, src: &V, dst: &V) -> Vec<&str> {
        self.edges_between(src, dst)
            .into_iter()
            .filter_map(|e| e.label.as_deref())
            .collect()
    }

    /// An absent or empty label accepts any connection.
    pub fn has_edge_label(&self, src: &V, dst: &V, label: Option<&str>) -> bool {
        match label {
            None | Some("") => true,
            Some(label) => self.edge_labels(src, dst).contains(&label),
        }
    }

    /// Successors in first-seen order; every neighbor when undirected.
    pub fn neighbors(&self, v: &V) -> Vec<V> {
        distinct_endpoints(self.outgoing.get(v))
    }

    pub fn predecessors(&self, v: &V) -> Vec<V> {
        if self.directed {
            distinct_endpoints(self.incoming.get(v))
        } else {
            self.neighbors(v)
        }
    }

    /// Neighbors ignoring direction.
    pub fn adjacent(&self, v: &V) -> Vec<V> {
        let mut result = self.neighbors(v);
        if self.directed {
            for p in self.predecessors(v) {
                if !result.contains(&p) {
                    result.push(p);
                }
            }
        }
        result
    }

    /// Parallel edges count individually; an undirected self loop counts twice.
    pub fn degree(&self, v: &V) -> usize {
        let out = self.outgoing.get(v).map_or(0, Vec::len);
        if self.directed {
            out + self.incoming.get(v).map_or(0, Vec::len)
        } else {
            let loops = self
                .outgoing
                .get(v)
                .map_or(0, |o| o.iter().filter(|(t, _)| t == v).count());
            out + loops
        }
    }

    /// Every edge once, as `(source, target, attrs)`.
    pub fn edges(&self) -> Vec<(&V, &V, &EdgeAttrs)> {
        let mut result = Vec::with_capacity(self.edge_count);
        for v in &self.order {
            if let Some(out) = self.outgoing.get(v) {
                for (t, attrs) in out {
                    if self.directed || v <= t {
                        result.push((v, t, attrs));
                    }
                }
            }
        }
        result
    }

    pub fn satisfies(&self, v: &V, label: Option<&str>, props: &BTreeMap<String, String>) -> bool {
        let Some(attrs) = self.vertices.get(v) else {
            return false;
        };
        if let Some(label) = label.filter(|l| !l.is_empty()) {
            if attrs.label_str() != label {
                return false;
            }
        }
        props
            .iter()
            .filter(|(k, _)| k.as_str() != "label")
            .all(|(k, value)| attrs.get(k) == value)
    }

    pub fn filter_vertices(&self, label: Option<&str>, props: &BTreeMap<String, String>) -> Vec<V> {
        self.order
            .iter()
            .filter(|v| self.satisfies(v, label, props))
            .cloned()
            .collect()
    }

    pub fn induced_subgraph(&self, members: &[V]) -> Self {
        let keep: AHashSet<&V> = members.iter().collect();
        let mut sub = Self::new(self.directed);
        for v in self.order.iter().filter(|v| keep.contains(v)) {
            sub.add_vertex(v.clone(), self.vertices[v].clone());
        }
        for (src, dst, attrs) in self.edges() {
            if keep.contains(src) && keep.contains(dst) {
                sub.add_edge(src.clone(), dst.clone(), attrs.clone());
            }
        }
        sub
    }
}

fn remove_entry<V: VertexKey>(
    lists: &mut AHashMap<V, Vec<(V, EdgeAttrs)>>,
    owner: &V,
    other: &V,
    key: u32,
) -> bool {
    let Some(list) = lists.get_mut(owner) else {
        return false;
    };
    match list.iter().position(|(t, e)| t == other && e.key == key) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}

fn distinct_endpoints<V: VertexKey>(list: Option<&Vec<(V, EdgeAttrs)>>) -> Vec<V> {
    let mut seen = AHashSet::new();
    let mut result = Vec::new();
    if let Some(list) = list {
        for (t, _) in list {
            if seen.insert(t) {
                result.push(t.clone());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_edges_get_distinct_keys() {
        let mut g: AttributedGraph = AttributedGraph::undirected();
        let k0 = g.add_edge(1, 2, EdgeAttrs::labeled("a"));
        let k1 = g.add_edge(2, 1, EdgeAttrs::labeled("b"));
        assert_eq!((k0, k1), (0, 1));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.degree(&1), 2);
        assert_eq!(g.neighbors(&1), vec![2]);
        let mut labels = g.edge_labels(&1, &2);
        labels.sort();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn remove_vertex_drops_incident_edges() {
        let mut g: AttributedGraph = AttributedGraph::directed();
        g.add_edge(1, 2, EdgeAttrs::default());
        g.add_edge(2, 3, EdgeAttrs::default());
        g.add_edge(3, 1, EdgeAttrs::default());
        assert!(g.remove_vertex(&2));
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.neighbors(&1).is_empty());
        assert_eq!(g.predecessors(&1), vec![3]);
    }

    #[test]
    fn undirected_self_loop_counts_twice() {
        let mut g: AttributedGraph = AttributedGraph::undirected();
        g.add_edge(7, 7, EdgeAttrs::default());
        assert_eq!(g.degree(&7), 2);
        assert_eq!(g.edges().len(), 1);
        assert!(g.remove_edge(&7, &7, 0));
        assert_eq!(g.edge_count(), 0);
    }
}
