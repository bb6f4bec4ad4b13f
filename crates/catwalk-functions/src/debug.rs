use async_trait::async_trait;
use catwalk_core::{ExecutionContext, FunctionError};
use catwalk_runtime::NodeFunction;
use serde_json::Value;

/// Logs the accumulated context and returns nothing
pub struct LogFunction;

#[async_trait]
impl NodeFunction for LogFunction {
    async fn invoke(&self, ctx: &ExecutionContext) -> Result<Value, FunctionError> {
        tracing::info!("DEBUG: context has {} entries", ctx.len());
        for (node_id, value) in ctx.iter() {
            tracing::info!("  {}: {}", node_id, value);
        }
        Ok(Value::Null)
    }
}

/// Returns the whole context so far as the node's own result
pub struct SnapshotFunction;

#[async_trait]
impl NodeFunction for SnapshotFunction {
    async fn invoke(&self, ctx: &ExecutionContext) -> Result<Value, FunctionError> {
        Ok(ctx.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn log_returns_null() {
        let ctx: ExecutionContext =
            [("a".to_string(), json!(1))].into_iter().collect();
        assert_eq!(LogFunction.invoke(&ctx).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn snapshot_returns_the_context_object() {
        let ctx: ExecutionContext =
            [("a".to_string(), json!(1))].into_iter().collect();
        assert_eq!(
            SnapshotFunction.invoke(&ctx).await.unwrap(),
            json!({"a": 1})
        );
    }
}
