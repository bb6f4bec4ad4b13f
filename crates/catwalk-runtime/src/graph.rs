use catwalk_core::{EdgeSpec, GraphError, NodeSpec};
use std::collections::{HashMap, HashSet};

/// Workflow graph: node set plus forward adjacency, built once from a
/// validated document and read-only afterwards.
#[derive(Debug)]
pub struct Graph {
    nodes: HashMap<String, NodeSpec>,
    /// Node ids in declaration order. Duplicate ids keep their first
    /// position with the later value winning, mirroring keyed-overwrite
    /// map semantics; uniqueness itself is the validator's concern.
    declaration_order: Vec<String>,
    adjacency: HashMap<String, Vec<String>>,
    edge_targets: HashSet<String>,
}

impl Graph {
    /// Build the graph, resolving edge endpoint aliases and rejecting any
    /// edge that names a node absent from the node set.
    pub fn new(nodes: Vec<NodeSpec>, edges: &[EdgeSpec]) -> Result<Self, GraphError> {
        let mut node_map: HashMap<String, NodeSpec> = HashMap::new();
        let mut declaration_order = Vec::new();
        for node in nodes {
            if node_map.insert(node.id.clone(), node.clone()).is_none() {
                declaration_order.push(node.id);
            }
        }

        let mut adjacency: HashMap<String, Vec<String>> = node_map
            .keys()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        let mut edge_targets = HashSet::new();

        for edge in edges {
            let (source, target) = edge.endpoints().ok_or_else(|| {
                GraphError::UnknownNodeReference {
                    descriptor: edge.descriptor(),
                }
            })?;
            if !node_map.contains_key(source) || !node_map.contains_key(target) {
                return Err(GraphError::UnknownNodeReference {
                    descriptor: edge.descriptor(),
                });
            }
            adjacency
                .get_mut(source)
                .expect("adjacency seeded for every node")
                .push(target.to_string());
            edge_targets.insert(target.to_string());
        }

        Ok(Self {
            nodes: node_map,
            declaration_order,
            adjacency,
            edge_targets,
        })
    }

    pub fn nodes_by_id(&self) -> &HashMap<String, NodeSpec> {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.get(id)
    }

    /// Node ids in declaration order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.declaration_order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.declaration_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declaration_order.is_empty()
    }

    /// Successors of a node, in edge declaration order.
    pub fn successors(&self, id: &str) -> &[String] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes with no incoming edges, in declaration order. An isolated
    /// node with no edges at all is a start node.
    pub fn start_nodes(&self) -> Vec<&str> {
        self.declaration_order
            .iter()
            .filter(|id| !self.edge_targets.contains(*id))
            .map(String::as_str)
            .collect()
    }
}
