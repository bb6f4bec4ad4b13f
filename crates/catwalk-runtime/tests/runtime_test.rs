use async_trait::async_trait;
use catwalk_core::{
    CatwalkError, EdgeSpec, ExecutionContext, ExecutionEvent, FunctionError, NodeSpec,
};
use catwalk_runtime::{
    compile, BlockingFunction, FunctionRegistry, Graph, NodeFunction, RunOptions,
    Runtime, RuntimeConfig,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn node(id: &str, func: &str) -> NodeSpec {
    let spec = NodeSpec::new(id, "execution", id.to_uppercase());
    if func.is_empty() {
        spec
    } else {
        spec.with_func(func)
    }
}

fn chain_edges(ids: &[&str]) -> Vec<EdgeSpec> {
    ids.windows(2)
        .map(|pair| EdgeSpec::between(pair[0], pair[1]))
        .collect()
}

/// Counts invocations; used to prove fail-fast never reaches later nodes.
struct Counter(Arc<AtomicUsize>);

#[async_trait]
impl NodeFunction for Counter {
    async fn invoke(&self, _ctx: &ExecutionContext) -> Result<Value, FunctionError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(json!("counted"))
    }
}

struct Doubler;

impl BlockingFunction for Doubler {
    fn call(&self, ctx: &ExecutionContext) -> Result<Value, FunctionError> {
        let x = ctx
            .get("x")
            .and_then(Value::as_i64)
            .ok_or_else(|| FunctionError::Failed("missing 'x'".into()))?;
        Ok(json!(x * 2))
    }
}

struct AlwaysFails;

#[async_trait]
impl NodeFunction for AlwaysFails {
    async fn invoke(&self, _ctx: &ExecutionContext) -> Result<Value, FunctionError> {
        Err(FunctionError::Failed("deliberate fault".into()))
    }
}

#[tokio::test]
async fn context_accumulates_across_nodes() {
    let nodes = vec![node("A", "|ctx| 1"), node("B", "|ctx| ctx[\"A\"] + 1")];
    let graph = Graph::new(nodes, &chain_edges(&["A", "B"])).unwrap();
    let order = compile(&graph);

    let runtime = Runtime::new();
    let ctx = runtime
        .run(&order, graph.nodes_by_id(), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(ctx.get("A"), Some(&json!(1)));
    assert_eq!(ctx.get("B"), Some(&json!(2)));
    assert_eq!(ctx.len(), 2);
}

#[tokio::test]
async fn fail_fast_halts_and_names_the_failing_node() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let mut registry = FunctionRegistry::new();
    registry.register("fails", Arc::new(AlwaysFails));
    registry.register("count", Arc::new(Counter(invoked.clone())));

    let nodes = vec![
        node("A", "|ctx| 1"),
        node("B", "fails"),
        node("C", "count"),
    ];
    let graph = Graph::new(nodes, &chain_edges(&["A", "B", "C"])).unwrap();
    let order = compile(&graph);

    let runtime = Runtime::with_registry(Arc::new(registry), RuntimeConfig::default());
    let err = runtime
        .run(&order, graph.nodes_by_id(), RunOptions::default())
        .await
        .unwrap_err();

    match err {
        CatwalkError::Execution { node_id, .. } => assert_eq!(node_id, "B"),
        other => panic!("expected execution error, got {other}"),
    }
    // C comes after B in the order and must never have been invoked.
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resolution_failure_is_wrapped_with_the_node_id() {
    let nodes = vec![node("A", "no.such.function")];
    let graph = Graph::new(nodes, &[]).unwrap();
    let order = compile(&graph);

    let runtime = Runtime::new();
    let err = runtime
        .run(&order, graph.nodes_by_id(), RunOptions::default())
        .await
        .unwrap_err();

    match err {
        CatwalkError::Execution { node_id, source } => {
            assert_eq!(node_id, "A");
            assert!(matches!(source, FunctionError::Resolution { .. }));
        }
        other => panic!("expected execution error, got {other}"),
    }
}

#[tokio::test]
async fn missing_function_reference_is_a_noop() {
    let nodes = vec![node("A", "")];
    let graph = Graph::new(nodes, &[]).unwrap();
    let order = compile(&graph);

    let runtime = Runtime::new();
    let ctx = runtime
        .run(&order, graph.nodes_by_id(), RunOptions::default())
        .await
        .unwrap();
    assert_eq!(ctx.get("A"), Some(&Value::Null));
}

#[tokio::test]
async fn seed_context_is_visible_to_every_node() {
    let nodes = vec![node("A", "|ctx| ctx[\"seed\"] * 2")];
    let graph = Graph::new(nodes, &[]).unwrap();
    let order = compile(&graph);

    let seed: ExecutionContext =
        [("seed".to_string(), json!(21))].into_iter().collect();
    let runtime = Runtime::new();
    let ctx = runtime
        .run(&order, graph.nodes_by_id(), RunOptions::with_seed(seed))
        .await
        .unwrap();
    assert_eq!(ctx.get("A"), Some(&json!(42)));
}

#[tokio::test]
async fn blocking_function_runs_through_the_worker_pool() {
    let mut registry = FunctionRegistry::new();
    registry.register_blocking("math.double", Arc::new(Doubler));

    let nodes = vec![node("x", "|ctx| 4"), node("y", "math.double")];
    let graph = Graph::new(nodes, &chain_edges(&["x", "y"])).unwrap();
    let order = compile(&graph);

    let runtime = Runtime::with_registry(
        Arc::new(registry),
        RuntimeConfig {
            max_blocking_workers: 1,
            ..RuntimeConfig::default()
        },
    );
    let ctx = runtime
        .run(&order, graph.nodes_by_id(), RunOptions::default())
        .await
        .unwrap();
    assert_eq!(ctx.get("y"), Some(&json!(8)));
}

#[tokio::test]
async fn cancelled_run_discards_the_context() {
    let nodes = vec![node("A", "|ctx| 1"), node("B", "|ctx| 2")];
    let graph = Graph::new(nodes, &chain_edges(&["A", "B"])).unwrap();
    let order = compile(&graph);

    let token = CancellationToken::new();
    token.cancel();

    let runtime = Runtime::new();
    let err = runtime
        .run(
            &order,
            graph.nodes_by_id(),
            RunOptions::with_cancellation(token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatwalkError::Cancelled));
}

#[tokio::test]
async fn rerunning_over_a_seed_overwrites_node_slots() {
    let nodes = vec![node("A", "|ctx| 7")];
    let graph = Graph::new(nodes, &[]).unwrap();
    let order = compile(&graph);

    let seed: ExecutionContext =
        [("A".to_string(), json!("stale"))].into_iter().collect();
    let runtime = Runtime::new();
    let ctx = runtime
        .run(&order, graph.nodes_by_id(), RunOptions::with_seed(seed))
        .await
        .unwrap();
    assert_eq!(ctx.get("A"), Some(&json!(7)));
}

#[tokio::test]
async fn events_trace_the_run_in_order() {
    let nodes = vec![node("A", "|ctx| 1"), node("B", "|ctx| 2")];
    let graph = Graph::new(nodes, &chain_edges(&["A", "B"])).unwrap();
    let order = compile(&graph);

    let runtime = Runtime::new();
    let mut events = runtime.subscribe_events();
    runtime
        .run(&order, graph.nodes_by_id(), RunOptions::default())
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(match event {
            ExecutionEvent::RunStarted { .. } => "run_started".to_string(),
            ExecutionEvent::NodeStarted { node_id, .. } => format!("start:{node_id}"),
            ExecutionEvent::NodeCompleted { node_id, .. } => format!("done:{node_id}"),
            ExecutionEvent::NodeFailed { node_id, .. } => format!("fail:{node_id}"),
            ExecutionEvent::RunCompleted { success, .. } => {
                format!("run_completed:{success}")
            }
        });
    }
    assert_eq!(
        seen,
        [
            "run_started",
            "start:A",
            "done:A",
            "start:B",
            "done:B",
            "run_completed:true"
        ]
    );
}
