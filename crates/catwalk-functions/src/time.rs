use async_trait::async_trait;
use catwalk_core::{ExecutionContext, FunctionError};
use catwalk_runtime::NodeFunction;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

/// Current UTC timestamp as an RFC 3339 string
pub struct NowFunction;

#[async_trait]
impl NodeFunction for NowFunction {
    async fn invoke(&self, _ctx: &ExecutionContext) -> Result<Value, FunctionError> {
        Ok(Value::String(Utc::now().to_rfc3339()))
    }
}

/// Delay execution, reading the duration from `ctx["delay_ms"]`
pub struct DelayFunction;

#[async_trait]
impl NodeFunction for DelayFunction {
    async fn invoke(&self, ctx: &ExecutionContext) -> Result<Value, FunctionError> {
        let delay_ms = ctx
            .get("delay_ms")
            .and_then(Value::as_u64)
            .unwrap_or(1000);

        tracing::info!("delaying for {}ms", delay_ms);
        sleep(Duration::from_millis(delay_ms)).await;

        Ok(json!(delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn now_produces_a_parseable_timestamp() {
        let ctx = ExecutionContext::new();
        let value = NowFunction.invoke(&ctx).await.unwrap();
        let text = value.as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(text).is_ok());
    }

    #[tokio::test]
    async fn delay_reads_duration_from_context() {
        let ctx: ExecutionContext =
            [("delay_ms".to_string(), json!(1))].into_iter().collect();
        assert_eq!(DelayFunction.invoke(&ctx).await.unwrap(), json!(1));
    }
}
