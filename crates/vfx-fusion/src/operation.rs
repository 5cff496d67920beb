//! The engine capability boundary.
//!
//! An [`Operation`] is a named transform that declares its arguments and
//! knows how to execute once every input is concrete. The protocol layer
//! never looks inside an operation: it checks property names and kinds
//! against [`Operation::arguments`] and hands resolved values to
//! [`Operation::execute`] through a [`Context`].

use crate::value::{ImageRef, Value, ValueKind};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use vfx_core::{Image, ResourceKind, ResourceTracker};
use vfx_ops::{OpsError, OpsResult};

/// Whether an argument is read or produced by the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDirection {
    /// Set by the caller before build.
    Input,
    /// Produced by the build.
    Output,
}

/// Declared property of an operation.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Property name.
    pub name: &'static str,
    /// Accepted value kind.
    pub kind: ValueKind,
    /// Input or output.
    pub direction: ArgDirection,
    /// Build fails if a required input is missing.
    pub required: bool,
    /// Value used when the input is not set.
    pub default: Option<Value>,
    /// Inclusive numeric range for `Double`/`Int` inputs.
    pub range: Option<(f64, f64)>,
    /// One-line description.
    pub description: &'static str,
}

impl Argument {
    /// Required input.
    pub fn input(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            direction: ArgDirection::Input,
            required: true,
            default: None,
            range: None,
            description: "",
        }
    }

    /// Output property.
    pub fn output(name: &'static str, kind: ValueKind) -> Self {
        Self {
            direction: ArgDirection::Output,
            required: false,
            ..Self::input(name, kind)
        }
    }

    /// Makes the input optional with a default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    /// Makes the input optional without a default.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Restricts numeric inputs to `[min, max]`.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Sets the description.
    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Returns `true` for inputs.
    #[inline]
    pub fn is_input(&self) -> bool {
        self.direction == ArgDirection::Input
    }

    /// Returns `true` for outputs.
    #[inline]
    pub fn is_output(&self) -> bool {
        self.direction == ArgDirection::Output
    }
}

/// A named operation the engine can execute.
pub trait Operation: Send + Sync {
    /// Registry name, e.g. `"resize"`.
    fn name(&self) -> &str;

    /// Short human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Declared inputs and outputs.
    fn arguments(&self) -> &[Argument];

    /// Whether results may be served from the operation cache.
    fn cacheable(&self) -> bool {
        true
    }

    /// Runs the operation on fully resolved inputs.
    fn execute(&self, ctx: &Context<'_>) -> OpsResult<Outputs>;

    /// Looks up a declared argument.
    fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments().iter().find(|a| a.name == name)
    }
}

impl fmt::Debug for dyn Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("name", &self.name()).finish()
    }
}

/// Resolved inputs of one node, plus the allocator for its outputs.
pub struct Context<'a> {
    args: &'a BTreeMap<String, Value>,
    tracker: &'a Arc<ResourceTracker>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(args: &'a BTreeMap<String, Value>, tracker: &'a Arc<ResourceTracker>) -> Self {
        Self { args, tracker }
    }

    fn missing(name: &str, kind: ValueKind) -> OpsError {
        OpsError::InvalidParameter(format!("missing {kind} argument '{name}'"))
    }

    /// Raw resolved value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Concrete image input.
    pub fn image(&self, name: &str) -> OpsResult<&Image> {
        match self.args.get(name) {
            Some(Value::Image(ImageRef::Ready(img))) => Ok(img),
            _ => Err(Self::missing(name, ValueKind::Image)),
        }
    }

    /// Float input.
    pub fn f64(&self, name: &str) -> OpsResult<f64> {
        self.opt_f64(name).ok_or_else(|| Self::missing(name, ValueKind::Double))
    }

    /// Float input that may be absent.
    pub fn opt_f64(&self, name: &str) -> Option<f64> {
        self.args.get(name).and_then(Value::as_f64)
    }

    /// Integer input.
    pub fn i64(&self, name: &str) -> OpsResult<i64> {
        self.args
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| Self::missing(name, ValueKind::Int))
    }

    /// Flag input.
    pub fn bool(&self, name: &str) -> OpsResult<bool> {
        self.args
            .get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| Self::missing(name, ValueKind::Bool))
    }

    /// String input.
    pub fn str(&self, name: &str) -> OpsResult<&str> {
        self.args
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| Self::missing(name, ValueKind::Str))
    }

    /// Allocates an output image accounted by the engine's tracker.
    pub fn alloc(&self, data: Vec<f32>, width: usize, height: usize, bands: usize) -> OpsResult<Image> {
        let dim = |v: usize| {
            u32::try_from(v).map_err(|_| OpsError::InvalidDimensions(format!("{v} does not fit in u32")))
        };
        let lease = self.tracker.acquire(ResourceKind::Image);
        Image::from_f32_tracked(data, dim(width)?, dim(height)?, dim(bands)?, lease)
            .map_err(|e| OpsError::InvalidDimensions(e.to_string()))
    }
}

/// Values produced by one execution, by output name.
#[derive(Debug, Clone, Default)]
pub struct Outputs(BTreeMap<String, Value>);

impl Outputs {
    /// Empty output set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an output.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Output by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Output names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of outputs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no outputs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
