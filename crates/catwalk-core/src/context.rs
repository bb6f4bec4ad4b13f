use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Shared result context threaded through a run.
///
/// Maps node id to the result value that node's function produced. It grows
/// monotonically while the run proceeds and is handed in full to every
/// function invoked, so downstream nodes may reach arbitrarily far back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ExecutionContext {
    values: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node_id: &str) -> Option<&Value> {
        self.values.get(node_id)
    }

    /// Store a node result. Re-storing under the same id overwrites, which
    /// keeps reruns idempotent per node slot.
    pub fn insert(&mut self, node_id: impl Into<String>, value: Value) {
        self.values.insert(node_id.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Snapshot of the whole context as a JSON object value, for handing
    /// to inline expressions that reference the context wholesale.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for ExecutionContext {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
