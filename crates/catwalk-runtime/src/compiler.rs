//! Topological compilation of a graph into a linear execution order.

use crate::Graph;
use catwalk_core::GraphError;
use serde::Serialize;
use std::collections::HashSet;

/// Linear node-id sequence in which the runtime invokes nodes. A derived,
/// immutable artifact of one `Graph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionOrder {
    ids: Vec<String>,
}

impl ExecutionOrder {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|n| n == id)
    }
}

/// Compile a graph into an execution order.
///
/// Depth-first postorder from each start node, sharing one visited set
/// across all traversals, then a single reversal of the whole working list.
/// A successor shared between two start branches is claimed by whichever
/// branch reaches it first; the later branch skips it, which can place
/// sibling branches out of declaration order. Nodes unreachable from any
/// start node (cyclic subgraphs with no outside entry) are silently
/// omitted. Pure: identical input yields identical output.
pub fn compile(graph: &Graph) -> ExecutionOrder {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut postorder: Vec<String> = Vec::new();

    for start in graph.start_nodes() {
        visit(graph, start, &mut visited, &mut postorder);
    }

    postorder.reverse();
    ExecutionOrder { ids: postorder }
}

fn visit<'g>(
    graph: &'g Graph,
    id: &'g str,
    visited: &mut HashSet<&'g str>,
    postorder: &mut Vec<String>,
) {
    if !visited.insert(id) {
        return;
    }
    for next in graph.successors(id) {
        visit(graph, next, visited, postorder);
    }
    postorder.push(id.to_string());
}

/// Compile with an opt-in completeness check: fails if any declared node
/// is missing from the order instead of silently dropping it.
pub fn compile_strict(graph: &Graph) -> Result<ExecutionOrder, GraphError> {
    let order = compile(graph);
    if order.len() == graph.len() {
        return Ok(order);
    }
    let ids = graph
        .node_ids()
        .filter(|id| !order.contains(id))
        .map(str::to_string)
        .collect();
    Err(GraphError::Unreachable { ids })
}
