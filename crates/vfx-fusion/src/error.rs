//! Error types for graph assembly and execution.
//!
//! Every failure surfaces immediately as a single [`FusionError`]. Objects
//! created before the failure are released by their `Drop` impls while the
//! error propagates, so cleanup and error handling share one path.

use crate::value::ValueKind;
use thiserror::Error;

/// Result type for graph operations.
pub type FusionResult<T> = Result<T, FusionError>;

/// Errors raised while assembling, building or extracting a graph.
#[derive(Debug, Error)]
pub enum FusionError {
    /// No operation with this name is registered.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// The operation has no property with this name (or it cannot be set).
    #[error("{operation}: invalid property '{property}'")]
    InvalidProperty {
        /// Operation name.
        operation: String,
        /// Property name.
        property: String,
    },

    /// Value kind differs from the property's declared kind.
    #[error("{operation}.{property}: expected {expected}, got {found}")]
    TypeMismatch {
        /// Operation name.
        operation: String,
        /// Property name.
        property: String,
        /// Declared kind.
        expected: ValueKind,
        /// Kind that was supplied.
        found: ValueKind,
    },

    /// Evaluation failed.
    #[error("{operation}: build failed: {message}")]
    BuildError {
        /// Operation that failed.
        operation: String,
        /// Engine message, verbatim.
        message: String,
    },

    /// Input property was never set and has no default.
    #[error("{operation}.{property} is not set")]
    Unset {
        /// Operation name.
        operation: String,
        /// Property name.
        property: String,
    },

    /// Non-image output read before the operation was built.
    #[error("{operation}.{property} is only available after build")]
    NotBuilt {
        /// Operation name.
        operation: String,
        /// Property name.
        property: String,
    },

    /// Descriptor was already built and no longer accepts properties.
    #[error("{operation} is already built")]
    Sealed {
        /// Operation name.
        operation: String,
    },

    /// Link would make the graph cyclic.
    #[error("{operation}.{property}: link would create a cycle")]
    Cycle {
        /// Downstream operation name.
        operation: String,
        /// Input property name.
        property: String,
    },

    /// Pipeline has no stages.
    #[error("pipeline has no stages")]
    EmptyPipeline,

    /// Invalid engine configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Image buffer error outside of a build.
    #[error(transparent)]
    Image(#[from] vfx_core::Error),
}

impl FusionError {
    /// Creates a [`FusionError::BuildError`].
    pub fn build(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BuildError {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_property(operation: &str, property: &str) -> Self {
        Self::InvalidProperty {
            operation: operation.to_string(),
            property: property.to_string(),
        }
    }

    /// Returns `true` for [`FusionError::UnknownOperation`].
    pub fn is_unknown_operation(&self) -> bool {
        matches!(self, Self::UnknownOperation(_))
    }

    /// Returns `true` for [`FusionError::InvalidProperty`].
    pub fn is_invalid_property(&self) -> bool {
        matches!(self, Self::InvalidProperty { .. })
    }

    /// Returns `true` for [`FusionError::TypeMismatch`].
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Returns `true` for [`FusionError::BuildError`].
    pub fn is_build_error(&self) -> bool {
        matches!(self, Self::BuildError { .. })
    }

    /// Engine message of a build failure.
    pub fn build_message(&self) -> Option<&str> {
        match self {
            Self::BuildError { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FusionError::TypeMismatch {
            operation: "resize".into(),
            property: "scale".into(),
            expected: ValueKind::Double,
            found: ValueKind::Image,
        };
        assert_eq!(err.to_string(), "resize.scale: expected double, got image");
        assert!(err.is_type_mismatch());

        let err = FusionError::build("sharpen", "sigma out of range");
        assert!(err.is_build_error());
        assert_eq!(err.build_message(), Some("sigma out of range"));
        assert!(err.to_string().contains("sharpen"));
    }

    #[test]
    fn test_predicates_are_exclusive() {
        let err = FusionError::UnknownOperation("warp".into());
        assert!(err.is_unknown_operation());
        assert!(!err.is_build_error());
        assert!(err.build_message().is_none());
        assert!(FusionError::invalid_property("copy", "x").is_invalid_property());
    }
}
