//! Structural validation of raw flow documents.
//!
//! Runs on the parsed JSON before typed deserialization, so a malformed
//! document fails with an error naming the offending field rather than a
//! generic decode error. The graph layer re-checks only edge endpoints,
//! as defense in depth.

use crate::ValidationError;
use serde_json::Value;
use std::collections::HashSet;

const NODE_REQUIRED_FIELDS: [&str; 3] = ["id", "type", "name"];

/// Validate a raw flow document. Returns `Ok(())` when the document is
/// structurally sound enough to deserialize into a `FlowDocument`.
pub fn validate_flow(doc: &Value) -> Result<(), ValidationError> {
    let object = doc.as_object().ok_or(ValidationError::NotAnObject)?;

    for key in ["nodes", "edges"] {
        if !object.contains_key(key) {
            return Err(ValidationError::MissingKey(key));
        }
    }

    let nodes = object["nodes"]
        .as_array()
        .ok_or(ValidationError::NotAnArray("nodes"))?;
    let edges = object["edges"]
        .as_array()
        .ok_or(ValidationError::NotAnArray("edges"))?;

    let mut node_ids: HashSet<&str> = HashSet::new();
    for (index, node) in nodes.iter().enumerate() {
        let node = node
            .as_object()
            .ok_or(ValidationError::NodeNotAnObject { index })?;

        for field in NODE_REQUIRED_FIELDS {
            match node.get(field) {
                None => return Err(ValidationError::NodeMissingField { index, field }),
                Some(value) if !value.is_string() => {
                    return Err(ValidationError::NodeFieldNotAString { index, field })
                }
                Some(_) => {}
            }
        }
        // func is optional (a node without one is a no-op), but when
        // present it must be a string reference.
        if let Some(func) = node.get("func") {
            if !func.is_string() && !func.is_null() {
                return Err(ValidationError::NodeFieldNotAString {
                    index,
                    field: "func",
                });
            }
        }

        let id = node["id"].as_str().unwrap();
        if !node_ids.insert(id) {
            return Err(ValidationError::DuplicateNodeId(id.to_string()));
        }
    }

    for (index, edge) in edges.iter().enumerate() {
        let edge = edge
            .as_object()
            .ok_or(ValidationError::EdgeNotAnObject { index })?;

        let endpoint = |primary: &str, alias: &str| {
            edge.get(primary)
                .or_else(|| edge.get(alias))
                .and_then(Value::as_str)
        };
        let source = endpoint("source", "from");
        let target = endpoint("target", "to");

        let (source, target) = match (source, target) {
            (Some(s), Some(t)) => (s, t),
            _ => return Err(ValidationError::EdgeMissingEndpoints { index }),
        };

        if !node_ids.contains(source) || !node_ids.contains(target) {
            return Err(ValidationError::EdgeUnknownNode {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_both_endpoint_conventions() {
        let doc = json!({
            "nodes": [
                {"id": "a", "type": "trigger", "name": "A", "func": "|ctx| 1"},
                {"id": "b", "type": "execution", "name": "B"}
            ],
            "edges": [
                {"source": "a", "target": "b"},
                {"from": "a", "to": "b", "id": "e2"}
            ]
        });
        assert!(validate_flow(&doc).is_ok());
    }

    #[test]
    fn rejects_non_object_document() {
        assert_eq!(
            validate_flow(&json!([1, 2])),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn rejects_missing_top_level_keys() {
        assert_eq!(
            validate_flow(&json!({"nodes": []})),
            Err(ValidationError::MissingKey("edges"))
        );
    }

    #[test]
    fn rejects_node_missing_required_field() {
        let doc = json!({
            "nodes": [{"id": "a", "type": "trigger"}],
            "edges": []
        });
        assert_eq!(
            validate_flow(&doc),
            Err(ValidationError::NodeMissingField { index: 0, field: "name" })
        );
    }

    #[test]
    fn rejects_duplicate_node_id() {
        let doc = json!({
            "nodes": [
                {"id": "a", "type": "trigger", "name": "A"},
                {"id": "a", "type": "execution", "name": "A again"}
            ],
            "edges": []
        });
        assert_eq!(
            validate_flow(&doc),
            Err(ValidationError::DuplicateNodeId("a".into()))
        );
    }

    #[test]
    fn rejects_edge_without_endpoint_pair() {
        let doc = json!({
            "nodes": [{"id": "a", "type": "trigger", "name": "A"}],
            "edges": [{"source": "a"}]
        });
        assert_eq!(
            validate_flow(&doc),
            Err(ValidationError::EdgeMissingEndpoints { index: 0 })
        );
    }

    #[test]
    fn rejects_edge_referencing_unknown_node() {
        let doc = json!({
            "nodes": [{"id": "a", "type": "trigger", "name": "A"}],
            "edges": [{"source": "a", "target": "ghost"}]
        });
        assert_eq!(
            validate_flow(&doc),
            Err(ValidationError::EdgeUnknownNode {
                source_id: "a".into(),
                target_id: "ghost".into()
            })
        );
    }

    #[test]
    fn func_is_optional_but_must_be_a_string() {
        let doc = json!({
            "nodes": [{"id": "a", "type": "trigger", "name": "A", "func": 42}],
            "edges": []
        });
        assert_eq!(
            validate_flow(&doc),
            Err(ValidationError::NodeFieldNotAString { index: 0, field: "func" })
        );
    }
}
