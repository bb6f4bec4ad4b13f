//! Core abstractions for the CatWalk workflow framework
//!
//! This crate provides the flow document model, structural validation,
//! the execution context, the error taxonomy, and the execution event
//! bus that all other components depend on.

mod context;
mod error;
mod events;
mod flow;
pub mod schema;

pub use context::ExecutionContext;
pub use error::{CatwalkError, FunctionError, GraphError, ValidationError};
pub use events::{EventBus, ExecutionEvent, ExecutionId};
pub use flow::{EdgeSpec, FlowDocument, NodeSpec, Position};

/// Result type for catwalk operations
pub type Result<T> = std::result::Result<T, CatwalkError>;
