//! Node-link JSON graphs.
//!
//! ```json
//! {"directed": false, "multigraph": true,
//!  "nodes": [{"id": 1, "label": "cyan", "color": "red"}],
//!  "links": [{"source": 1, "target": 2, "label": "knows", "_type": "_path", "add": 3}]}
//! ```
//!
//! Node fields other than `id` and `label` become string properties. `_type:
//! "_path"` marks a path edge and `add` is the replay step of the edge.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::GrayMatchError,
    graph::{AttributedGraph, EdgeAttrs, EdgeKind, VertexAttrs, VertexId},
};

const PATH_TYPE: &str = "_path";

#[derive(Debug, Serialize, Deserialize)]
struct NodeLinkGraph {
    #[serde(default)]
    directed: bool,
    #[serde(default = "default_multigraph")]
    multigraph: bool,
    #[serde(default)]
    nodes: Vec<NodeRecord>,
    #[serde(default, alias = "edges")]
    links: Vec<LinkRecord>,
}

fn default_multigraph() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    id: VertexId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(flatten)]
    props: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkRecord {
    source: VertexId,
    target: VertexId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    add: Option<i64>,
}

fn prop_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

pub fn parse_graph(json: &str) -> Result<AttributedGraph, GrayMatchError> {
    let doc: NodeLinkGraph = serde_json::from_str(json)
        .map_err(|e| GrayMatchError::serialization(format!("node-link graph: {e}")))?;
    let mut graph = AttributedGraph::new(doc.directed);
    for node in doc.nodes {
        let attrs = VertexAttrs {
            label: node.label,
            props: node
                .props
                .into_iter()
                .map(|(k, v)| (k, prop_text(v)))
                .collect(),
        };
        graph.add_vertex(node.id, attrs);
    }
    for link in doc.links {
        let kind = match link.kind.as_deref() {
            Some(PATH_TYPE) => EdgeKind::Path,
            _ => EdgeKind::Direct,
        };
        let attrs = EdgeAttrs {
            key: link.key.unwrap_or(0),
            label: link.label,
            kind,
            added_at: link.add,
        };
        graph.add_edge(link.source, link.target, attrs);
    }
    Ok(graph)
}

pub fn load_graph(path: &Path) -> Result<AttributedGraph, GrayMatchError> {
    let text = fs::read_to_string(path)
        .map_err(|e| GrayMatchError::io(format!("{}: {e}", path.display())))?;
    parse_graph(&text)
}

pub fn to_node_link(graph: &AttributedGraph) -> Result<Value, GrayMatchError> {
    let nodes = graph
        .vertex_ids()
        .iter()
        .map(|&id| {
            let attrs = graph.vertex(&id).cloned().unwrap_or_default();
            NodeRecord {
                id,
                label: attrs.label,
                props: attrs
                    .props
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            }
        })
        .collect();
    let links = graph
        .edges()
        .into_iter()
        .map(|(&source, &target, attrs)| LinkRecord {
            source,
            target,
            key: Some(attrs.key),
            label: attrs.label.clone(),
            kind: attrs.is_path().then(|| PATH_TYPE.to_string()),
            add: attrs.added_at,
        })
        .collect();
    let doc = NodeLinkGraph {
        directed: graph.is_directed(),
        multigraph: true,
        nodes,
        links,
    };
    serde_json::to_value(doc).map_err(|e| GrayMatchError::serialization(e.to_string()))
}

pub fn save_graph(graph: &AttributedGraph, path: &Path) -> Result<(), GrayMatchError> {
    let doc = to_node_link(graph)?;
    let text = serde_json::to_string_pretty(&doc)
        .map_err(|e| GrayMatchError::serialization(e.to_string()))?;
    fs::write(path, text).map_err(|e| GrayMatchError::io(format!("{}: {e}", path.display())))
}
