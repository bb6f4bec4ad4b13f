//! Graph compilation and execution runtime
//!
//! This crate turns a validated flow document into a deterministic
//! execution order and runs each node's function in that order, threading
//! the shared result context through the run.

mod compiler;
mod expr;
mod graph;
mod pool;
mod resolver;
mod runtime;

pub use compiler::{compile, compile_strict, ExecutionOrder};
pub use expr::CompiledExpr;
pub use graph::Graph;
pub use pool::WorkerPool;
pub use resolver::{
    BlockingFunction, FunctionRegistry, NodeFunction, ResolvedFunction,
};
pub use runtime::{RunOptions, Runtime, RuntimeConfig};
