//! Built operations and output extraction.

use crate::error::{FusionError, FusionResult};
use crate::operation::Outputs;
use crate::value::{Value, ValueKind};
use std::fmt;
use vfx_core::{Image, Lease};

/// Result of a successful build.
///
/// Distinct from the descriptor it came from: it owns the computed outputs
/// and is released on drop. Images read from it are new strong references
/// that stay valid after it is gone.
pub struct BuiltOperation {
    operation: String,
    outputs: Outputs,
    _lease: Lease,
}

impl BuiltOperation {
    pub(crate) fn new(operation: impl Into<String>, outputs: Outputs, lease: Lease) -> Self {
        Self {
            operation: operation.into(),
            outputs,
            _lease: lease,
        }
    }

    /// Operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Concrete output value.
    pub fn get(&self, name: &str) -> FusionResult<Value> {
        self.outputs
            .get(name)
            .cloned()
            .ok_or_else(|| FusionError::invalid_property(&self.operation, name))
    }

    /// Image output, as a new owned handle.
    pub fn image(&self, name: &str) -> FusionResult<Image> {
        let value = self.get(name)?;
        match value.as_image() {
            Some(img) => Ok(img.clone()),
            None => Err(FusionError::TypeMismatch {
                operation: self.operation.clone(),
                property: name.to_string(),
                expected: ValueKind::Image,
                found: value.kind(),
            }),
        }
    }

    /// Output names.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.names().collect()
    }
}

impl fmt::Debug for BuiltOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltOperation")
            .field("operation", &self.operation)
            .field("outputs", &self.output_names())
            .finish()
    }
}

/// Reads the `out` image of a built operation.
///
/// The returned handle is acquired before `built` can be released, and
/// does not depend on it afterwards.
pub fn extract_output(built: &BuiltOperation) -> FusionResult<Image> {
    built.image("out")
}
