//! Function resolution: mapping a node's function reference to an
//! invocable unit.
//!
//! References come in three shapes, decided at resolve time into a closed
//! set of variants: an inline `|ctx| ...` expression compiled on the spot,
//! a bare name looked up in the flat registry, or a dotted path where
//! everything before the last segment names a registered module and the
//! last segment the symbol. An absent or empty reference is a no-op.
//! Resolution is lazy: the runtime resolves each node at its first
//! invocation, never at compile time.

use crate::expr::CompiledExpr;
use async_trait::async_trait;
use catwalk_core::{ExecutionContext, FunctionError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// An asynchronous node function. Invoked with the full accumulated
/// context and returns the value stored under the node's id.
#[async_trait]
pub trait NodeFunction: Send + Sync {
    async fn invoke(&self, ctx: &ExecutionContext) -> Result<Value, FunctionError>;
}

/// A synchronous, potentially blocking node function. The runtime offloads
/// these to its bounded worker pool so the cooperative scheduler is never
/// stalled.
pub trait BlockingFunction: Send + Sync {
    fn call(&self, ctx: &ExecutionContext) -> Result<Value, FunctionError>;
}

/// Outcome of resolving one function reference.
pub enum ResolvedFunction {
    /// Missing or empty reference; invokes to `Value::Null`.
    Noop,
    Inline(CompiledExpr),
    Async(Arc<dyn NodeFunction>),
    Blocking(Arc<dyn BlockingFunction>),
}

impl std::fmt::Debug for ResolvedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Noop => f.write_str("Noop"),
            Self::Inline(expr) => f.debug_tuple("Inline").field(expr).finish(),
            Self::Async(_) => f.write_str("Async(..)"),
            Self::Blocking(_) => f.write_str("Blocking(..)"),
        }
    }
}

#[derive(Clone)]
enum Registered {
    Async(Arc<dyn NodeFunction>),
    Blocking(Arc<dyn BlockingFunction>),
}

impl From<Registered> for ResolvedFunction {
    fn from(entry: Registered) -> Self {
        match entry {
            Registered::Async(f) => ResolvedFunction::Async(f),
            Registered::Blocking(f) => ResolvedFunction::Blocking(f),
        }
    }
}

/// Registry of invocable functions, keyed by bare name or dotted path.
///
/// Explicit and caller-owned: there is no process-wide table. The runtime
/// holds one behind an `Arc`.
#[derive(Default)]
pub struct FunctionRegistry {
    names: HashMap<String, Registered>,
    modules: HashMap<String, HashMap<String, Registered>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async function under a bare name or dotted path.
    pub fn register(&mut self, path: &str, function: Arc<dyn NodeFunction>) {
        self.insert(path, Registered::Async(function));
    }

    /// Register a blocking function under a bare name or dotted path.
    pub fn register_blocking(&mut self, path: &str, function: Arc<dyn BlockingFunction>) {
        self.insert(path, Registered::Blocking(function));
    }

    fn insert(&mut self, path: &str, entry: Registered) {
        tracing::info!("registering function: {}", path);
        match path.rsplit_once('.') {
            None => {
                self.names.insert(path.to_string(), entry);
            }
            Some((module, symbol)) => {
                self.modules
                    .entry(module.to_string())
                    .or_default()
                    .insert(symbol.to_string(), entry);
            }
        }
    }

    /// All registered function paths, sorted.
    pub fn list_functions(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.names.keys().cloned().collect();
        for (module, symbols) in &self.modules {
            paths.extend(symbols.keys().map(|s| format!("{module}.{s}")));
        }
        paths.sort();
        paths
    }

    /// Resolve a function reference to an invocable unit.
    pub fn resolve(&self, reference: &str) -> Result<ResolvedFunction, FunctionError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(ResolvedFunction::Noop);
        }

        if reference.starts_with('|') {
            let compiled = CompiledExpr::parse(reference).map_err(|e| {
                FunctionError::Resolution {
                    reference: reference.to_string(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(ResolvedFunction::Inline(compiled));
        }

        let resolution_error = |reason: String| FunctionError::Resolution {
            reference: reference.to_string(),
            reason,
        };

        match reference.rsplit_once('.') {
            None => self
                .names
                .get(reference)
                .cloned()
                .map(ResolvedFunction::from)
                .ok_or_else(|| {
                    resolution_error("no function registered under this name".into())
                }),
            Some((module, symbol)) => {
                let symbols = self.modules.get(module).ok_or_else(|| {
                    resolution_error(format!("module '{module}' is not registered"))
                })?;
                symbols
                    .get(symbol)
                    .cloned()
                    .map(ResolvedFunction::from)
                    .ok_or_else(|| {
                        resolution_error(format!(
                            "module '{module}' has no function '{symbol}'"
                        ))
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct One;

    #[async_trait]
    impl NodeFunction for One {
        async fn invoke(&self, _ctx: &ExecutionContext) -> Result<Value, FunctionError> {
            Ok(json!(1))
        }
    }

    struct Two;

    impl BlockingFunction for Two {
        fn call(&self, _ctx: &ExecutionContext) -> Result<Value, FunctionError> {
            Ok(json!(2))
        }
    }

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register("one", Arc::new(One));
        registry.register_blocking("math.two", Arc::new(Two));
        registry
    }

    #[test]
    fn empty_reference_resolves_to_noop() {
        assert!(matches!(
            registry().resolve("").unwrap(),
            ResolvedFunction::Noop
        ));
        assert!(matches!(
            registry().resolve("   ").unwrap(),
            ResolvedFunction::Noop
        ));
    }

    #[test]
    fn inline_marker_compiles_expression() {
        assert!(matches!(
            registry().resolve("|ctx| 1 + 1").unwrap(),
            ResolvedFunction::Inline(_)
        ));
    }

    #[test]
    fn invalid_inline_expression_is_a_resolution_error() {
        let err = registry().resolve("|ctx| 1 +").unwrap_err();
        assert!(matches!(err, FunctionError::Resolution { .. }));
    }

    #[test]
    fn bare_name_and_dotted_path_lookups() {
        assert!(matches!(
            registry().resolve("one").unwrap(),
            ResolvedFunction::Async(_)
        ));
        assert!(matches!(
            registry().resolve("math.two").unwrap(),
            ResolvedFunction::Blocking(_)
        ));
    }

    #[test]
    fn unknown_module_and_unknown_symbol_are_distinct() {
        let module_err = registry().resolve("nope.two").unwrap_err();
        let symbol_err = registry().resolve("math.three").unwrap_err();
        match (module_err, symbol_err) {
            (
                FunctionError::Resolution { reason: a, .. },
                FunctionError::Resolution { reason: b, .. },
            ) => {
                assert!(a.contains("module 'nope'"));
                assert!(b.contains("no function 'three'"));
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[test]
    fn list_functions_is_sorted() {
        assert_eq!(registry().list_functions(), ["math.two", "one"]);
    }
}
