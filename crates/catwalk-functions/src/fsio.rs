use catwalk_core::{ExecutionContext, FunctionError};
use catwalk_runtime::BlockingFunction;
use serde_json::Value;

/// Reads the file named by `ctx["path"]` into a string.
///
/// Deliberately synchronous: the runtime offloads it to the bounded
/// worker pool rather than blocking the scheduler.
pub struct ReadTextFunction;

impl BlockingFunction for ReadTextFunction {
    fn call(&self, ctx: &ExecutionContext) -> Result<Value, FunctionError> {
        let path = ctx
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FunctionError::Failed("fs.read_text needs a string under 'path'".into())
            })?;

        std::fs::read_to_string(path)
            .map(Value::String)
            .map_err(|e| FunctionError::Failed(format!("cannot read '{path}': {e}")))
    }
}
