use std::{collections::BTreeMap, fmt::Debug, hash::Hash};

use serde::{Deserialize, Serialize};

/// Identity of a data-graph vertex.
pub type VertexId = i64;

/// Keys usable as vertex identities: numeric ids in data graphs, symbols in patterns.
pub trait VertexKey: Clone + Eq + Hash + Ord + Debug {}

impl<T: Clone + Eq + Hash + Ord + Debug> VertexKey for T {}

/// Whether an edge must be realised by a single data edge or by a multi-hop path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    #[default]
    Direct,
    Path,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttrs {
    pub label: Option<String>,
    pub props: BTreeMap<String, String>,
}

impl VertexAttrs {
    pub fn labeled(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            props: BTreeMap::new(),
        }
    }

    pub fn prop(mut self, key: &str, value: &str) -> Self {
        self.props.insert(key.to_string(), value.to_string());
        self
    }

    pub fn label_str(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }

    /// Property lookup; `label` resolves to the vertex label and missing keys read as empty.
    pub fn get(&self, key: &str) -> &str {
        if key == "label" {
            return self.label_str();
        }
        self.props.get(key).map(String::as_str).unwrap_or("")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAttrs {
    pub key: u32,
    pub label: Option<String>,
    pub kind: EdgeKind,
    pub added_at: Option<i64>,
}

impl EdgeAttrs {
    pub fn labeled(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::default()
        }
    }

    pub fn path() -> Self {
        Self {
            kind: EdgeKind::Path,
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: u32) -> Self {
        self.key = key;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn as_path(mut self) -> Self {
        self.kind = EdgeKind::Path;
        self
    }

    pub fn added_at(mut self, step: i64) -> Self {
        self.added_at = Some(step);
        self
    }

    pub fn is_path(&self) -> bool {
        self.kind == EdgeKind::Path
    }

    pub fn label_str(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}
