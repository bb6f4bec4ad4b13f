use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatwalkError {
    #[error("invalid flow: {0}")]
    Validation(#[from] ValidationError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("node '{node_id}' failed: {source}")]
    Execution {
        node_id: String,
        source: FunctionError,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Structural failures detected before a document reaches the graph layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("flow must be a JSON object")]
    NotAnObject,

    #[error("missing required key: {0}")]
    MissingKey(&'static str),

    #[error("'{0}' must be an array")]
    NotAnArray(&'static str),

    #[error("node at index {index} must be an object")]
    NodeNotAnObject { index: usize },

    #[error("node at index {index} missing required field: {field}")]
    NodeMissingField { index: usize, field: &'static str },

    #[error("node field '{field}' at index {index} must be a string")]
    NodeFieldNotAString { index: usize, field: &'static str },

    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),

    #[error("edge at index {index} must be an object")]
    EdgeNotAnObject { index: usize },

    #[error(
        "edge at index {index} missing required connection fields \
         (either 'source'/'target' or 'from'/'to')"
    )]
    EdgeMissingEndpoints { index: usize },

    #[error("edge references unknown node: {source_id} -> {target_id}")]
    EdgeUnknownNode { source_id: String, target_id: String },
}

/// Failures raised while turning node/edge declarations into a graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge references unknown node: {descriptor}")]
    UnknownNodeReference { descriptor: String },

    /// Only raised by the opt-in strict compile; the default compile
    /// silently drops nodes no start node can reach.
    #[error("nodes unreachable from any start node: {ids:?}")]
    Unreachable { ids: Vec<String> },
}

/// Failures from resolving or invoking a node function.
#[derive(Error, Debug, Clone)]
pub enum FunctionError {
    #[error("cannot resolve function reference '{reference}': {reason}")]
    Resolution { reference: String, reason: String },

    #[error("{0}")]
    Failed(String),
}
