//! Standard function library
//!
//! Built-in node functions that flows can reference by dotted path
//! instead of writing inline expressions.

mod debug;
mod fsio;
mod time;

pub use debug::{LogFunction, SnapshotFunction};
pub use fsio::ReadTextFunction;
pub use time::{DelayFunction, NowFunction};

use catwalk_runtime::FunctionRegistry;
use std::sync::Arc;

/// Register all standard functions with a registry
pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register("debug.log", Arc::new(debug::LogFunction));
    registry.register("debug.snapshot", Arc::new(debug::SnapshotFunction));
    registry.register("time.now", Arc::new(time::NowFunction));
    registry.register("time.delay", Arc::new(time::DelayFunction));
    registry.register_blocking("fs.read_text", Arc::new(fsio::ReadTextFunction));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_standard_function() {
        let mut registry = FunctionRegistry::new();
        register_all(&mut registry);
        assert_eq!(
            registry.list_functions(),
            [
                "debug.log",
                "debug.snapshot",
                "fs.read_text",
                "time.delay",
                "time.now"
            ]
        );
    }
}
