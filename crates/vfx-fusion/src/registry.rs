//! Operation lookup by name.
//!
//! The registry maps operation names to shared [`Operation`]
//! implementations. A process-wide instance with the built-in operations
//! is available through [`OperationRegistry::global()`]; engines may also be
//! given their own registry with extra operations.
//!
//! # Thread Safety
//!
//! Lookups take a read lock and may run concurrently with each other and
//! with builds on other threads.
//!
//! # Example
//!
//! ```rust
//! use vfx_fusion::OperationRegistry;
//!
//! let registry = OperationRegistry::global();
//! assert!(registry.contains("resize"));
//! assert!(registry.lookup("no_such_op").is_err());
//! ```

use crate::builtin;
use crate::error::{FusionError, FusionResult};
use crate::operation::Operation;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

/// Thread-safe name -> operation map.
#[derive(Default)]
pub struct OperationRegistry {
    ops: RwLock<HashMap<String, Arc<dyn Operation>>>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in operations.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for op in builtin::all() {
            registry.register(op);
        }
        registry
    }

    /// Returns the shared registry with built-in operations.
    pub fn global() -> Arc<OperationRegistry> {
        static INSTANCE: OnceLock<Arc<OperationRegistry>> = OnceLock::new();
        Arc::clone(INSTANCE.get_or_init(|| Arc::new(Self::with_builtins())))
    }

    /// Adds an operation, returning the one it replaced.
    pub fn register(&self, op: Arc<dyn Operation>) -> Option<Arc<dyn Operation>> {
        let name = op.name().to_string();
        debug!(operation = %name, "register operation");
        self.ops
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, op)
    }

    /// Finds an operation by name.
    pub fn lookup(&self, name: &str) -> FusionResult<Arc<dyn Operation>> {
        self.ops
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| FusionError::UnknownOperation(name.to_string()))
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.ops.read().unwrap_or_else(PoisonError::into_inner).contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .ops
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.ops.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = OperationRegistry::with_builtins();
        for name in ["resize", "sharpen", "gaussblur", "linear", "invert", "flip", "extract_area", "copy", "add", "subtract", "abs", "avg"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.len(), 12);
        assert_eq!(registry.names().first().map(String::as_str), Some("abs"));
    }

    #[test]
    fn test_unknown_operation() {
        let registry = OperationRegistry::new();
        assert!(registry.is_empty());
        let err = registry.lookup("resize").unwrap_err();
        assert!(err.is_unknown_operation());
    }

    #[test]
    fn test_register_replaces() {
        let registry = OperationRegistry::with_builtins();
        let copy = registry.lookup("copy").unwrap();
        let previous = registry.register(copy);
        assert!(previous.is_some());
        assert_eq!(registry.len(), 12);
    }

    #[test]
    fn test_global_is_shared() {
        let a = OperationRegistry::global();
        let b = OperationRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
