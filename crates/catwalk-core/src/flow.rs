use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Complete flow definition: the declarative node/edge document that the
/// graph layer compiles and the runtime executes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlowDocument {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

impl FlowDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut NodeSpec> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn add_node(&mut self, node: NodeSpec) {
        self.nodes.push(node);
    }

    /// Remove a node by id. With `cascade`, edges touching the node go too.
    /// Returns whether the node existed and how many edges were removed.
    pub fn remove_node(&mut self, id: &str, cascade: bool) -> (bool, usize) {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return (false, 0);
        }

        let mut removed_edges = 0;
        if cascade {
            let edge_count = self.edges.len();
            self.edges.retain(|e| {
                e.source_id() != Some(id) && e.target_id() != Some(id)
            });
            removed_edges = edge_count - self.edges.len();
        }
        (true, removed_edges)
    }

    pub fn add_edge(&mut self, edge: EdgeSpec) {
        self.edges.push(edge);
    }

    /// Remove edges carrying the given edge id. Returns how many were removed.
    pub fn remove_edge_by_id(&mut self, edge_id: &str) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| e.id.as_deref() != Some(edge_id));
        before - self.edges.len()
    }

    /// Remove every edge connecting `source` to `target`, under either
    /// endpoint naming convention. Returns how many were removed.
    pub fn remove_edges_between(&mut self, source: &str, target: &str) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| {
            !(e.source_id() == Some(source) && e.target_id() == Some(target))
        });
        before - self.edges.len()
    }
}

/// Node specification in a flow document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: String,

    pub name: String,

    /// Function reference: inline `|ctx| ...` expression, bare registered
    /// name, or dotted module path. Absent means the node is a no-op.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl NodeSpec {
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            name: name.into(),
            func: None,
            position: None,
            data: None,
        }
    }

    pub fn with_func(mut self, func: impl Into<String>) -> Self {
        self.func = Some(func.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Directed precedence constraint between two nodes. Both the
/// `source`/`target` and `from`/`to` spellings are accepted and preserved
/// as written, so editing a document never rewrites its convention.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

impl EdgeSpec {
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Resolved source endpoint, preferring `source` over `from`.
    pub fn source_id(&self) -> Option<&str> {
        self.source.as_deref().or(self.from.as_deref())
    }

    /// Resolved target endpoint, preferring `target` over `to`.
    pub fn target_id(&self) -> Option<&str> {
        self.target.as_deref().or(self.to.as_deref())
    }

    pub fn endpoints(&self) -> Option<(&str, &str)> {
        Some((self.source_id()?, self.target_id()?))
    }

    /// Human-readable form used in error messages.
    pub fn descriptor(&self) -> String {
        format!(
            "{} -> {}",
            self.source_id().unwrap_or("?"),
            self.target_id().unwrap_or("?")
        )
    }
}

/// Node position in a visual editor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}
