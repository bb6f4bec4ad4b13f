use crate::{ExecutionOrder, FunctionRegistry, ResolvedFunction, WorkerPool};
use catwalk_core::{
    CatwalkError, EventBus, ExecutionContext, ExecutionEvent, ExecutionId,
    FunctionError, NodeSpec,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Walks a compiled execution order, invoking each node's function with
/// the shared context and accumulating results.
pub struct Runtime {
    registry: Arc<FunctionRegistry>,
    pool: WorkerPool,
    event_bus: Arc<EventBus>,
}

impl Runtime {
    /// Runtime with an empty registry and default configuration.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(FunctionRegistry::new()), RuntimeConfig::default())
    }

    pub fn with_registry(registry: Arc<FunctionRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            pool: WorkerPool::new(config.max_blocking_workers),
            event_bus: Arc::new(EventBus::new(config.event_capacity)),
        }
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Execute a compiled order over the given node set.
    ///
    /// Strictly sequential: node N always observes the results of every
    /// node preceding it in the order and nothing else. The first
    /// resolution or invocation failure halts the run; the partially
    /// accumulated context is dropped with it.
    pub async fn run(
        &self,
        order: &ExecutionOrder,
        nodes: &HashMap<String, NodeSpec>,
        options: RunOptions,
    ) -> Result<ExecutionContext, CatwalkError> {
        let execution_id = Uuid::new_v4();
        let run_start = Instant::now();
        self.event_bus.emit(ExecutionEvent::RunStarted {
            execution_id,
            node_count: order.len(),
            timestamp: Utc::now(),
        });
        tracing::info!("starting run {} over {} nodes", execution_id, order.len());

        let mut ctx = options.seed.unwrap_or_default();
        for node_id in order.iter() {
            // Cancellation stops before the next node starts; a node
            // already in flight runs to completion.
            if options.cancellation.is_cancelled() {
                tracing::warn!("run {} cancelled before node '{}'", execution_id, node_id);
                self.finish(execution_id, false, run_start);
                return Err(CatwalkError::Cancelled);
            }

            let node = match nodes.get(node_id) {
                Some(node) => node,
                None => {
                    let error = FunctionError::Resolution {
                        reference: node_id.to_string(),
                        reason: "node is not part of the node set".into(),
                    };
                    return Err(self.fail(execution_id, run_start, node_id, error));
                }
            };

            self.event_bus.emit(ExecutionEvent::NodeStarted {
                execution_id,
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
                timestamp: Utc::now(),
            });

            let node_start = Instant::now();
            let result = self.invoke(node, &ctx).await;
            let duration_ms = node_start.elapsed().as_millis() as u64;

            match result {
                Ok(value) => {
                    tracing::info!("node '{}' completed in {}ms", node.id, duration_ms);
                    self.event_bus.emit(ExecutionEvent::NodeCompleted {
                        execution_id,
                        node_id: node.id.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    ctx.insert(node.id.clone(), value);
                }
                Err(error) => {
                    tracing::error!("node '{}' failed: {}", node.id, error);
                    return Err(self.fail(execution_id, run_start, &node.id, error));
                }
            }
        }

        self.finish(execution_id, true, run_start);
        Ok(ctx)
    }

    /// Resolve the node's function reference (lazily, at execution time)
    /// and invoke it with the current context.
    async fn invoke(
        &self,
        node: &NodeSpec,
        ctx: &ExecutionContext,
    ) -> Result<Value, FunctionError> {
        let reference = node.func.as_deref().unwrap_or("");
        match self.registry.resolve(reference)? {
            ResolvedFunction::Noop => Ok(Value::Null),
            ResolvedFunction::Inline(expr) => expr
                .eval(ctx)
                .map_err(|e| FunctionError::Failed(format!("inline expression: {e}"))),
            ResolvedFunction::Async(function) => function.invoke(ctx).await,
            ResolvedFunction::Blocking(function) => {
                let snapshot = ctx.clone();
                self.pool
                    .run_blocking(move || function.call(&snapshot))
                    .await?
            }
        }
    }

    fn fail(
        &self,
        execution_id: ExecutionId,
        run_start: Instant,
        node_id: &str,
        error: FunctionError,
    ) -> CatwalkError {
        self.event_bus.emit(ExecutionEvent::NodeFailed {
            execution_id,
            node_id: node_id.to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        self.finish(execution_id, false, run_start);
        CatwalkError::Execution {
            node_id: node_id.to_string(),
            source: error,
        }
    }

    fn finish(&self, execution_id: ExecutionId, success: bool, run_start: Instant) {
        self.event_bus.emit(ExecutionEvent::RunCompleted {
            execution_id,
            success,
            duration_ms: run_start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Upper bound on concurrently executing blocking functions.
    pub max_blocking_workers: usize,
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_blocking_workers: 4,
            event_capacity: 256,
        }
    }
}

/// Per-run options: an optional seed context and a cancellation token.
#[derive(Default)]
pub struct RunOptions {
    pub seed: Option<ExecutionContext>,
    pub cancellation: CancellationToken,
}

impl RunOptions {
    pub fn with_seed(seed: ExecutionContext) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            seed: None,
            cancellation,
        }
    }
}
