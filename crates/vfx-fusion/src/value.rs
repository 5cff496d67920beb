//! Typed property values.
//!
//! [`Value`] is the closed set of kinds a property slot can hold. Values are
//! moved into a descriptor by [`Descriptor::set`](crate::Descriptor::set), so
//! a carrier cannot be reused after it has been stored.
//!
//! An image value is either [`ImageRef::Ready`] (concrete pixels) or
//! [`ImageRef::Deferred`]: the not-yet-computed output of another
//! descriptor. Reading a deferred output never runs anything.
//!
//! # Example
//!
//! ```rust
//! use vfx_fusion::{Value, ValueKind};
//!
//! let v = Value::from(0.5);
//! assert_eq!(v.kind(), ValueKind::Double);
//! assert_eq!(v.as_f64(), Some(0.5));
//!
//! // No coercion between kinds
//! assert_eq!(Value::from(2_i64).as_f64(), None);
//! ```

use crate::descriptor::{Node, NodeId};
use std::fmt;
use std::sync::Arc;
use vfx_core::Image;

/// Kind of a [`Value`], as declared by an operation argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Image handle (ready or deferred).
    Image,
    /// 64-bit float.
    Double,
    /// 64-bit signed integer.
    Int,
    /// Boolean flag.
    Bool,
    /// UTF-8 string (enum names, modes).
    Str,
}

impl ValueKind {
    /// Lowercase type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Double => "double",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Str => "string",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to the unevaluated output of a descriptor.
///
/// Holding a `Deferred` keeps the upstream node (and everything it depends
/// on) alive, even after its [`Descriptor`](crate::Descriptor) is dropped.
#[derive(Clone)]
pub struct Deferred {
    node: Arc<Node>,
    output: String,
}

impl Deferred {
    pub(crate) fn new(node: Arc<Node>, output: impl Into<String>) -> Self {
        Self {
            node,
            output: output.into(),
        }
    }

    /// Id of the producing node.
    pub fn node_id(&self) -> NodeId {
        self.node.id()
    }

    /// Name of the producing operation.
    pub fn operation(&self) -> &str {
        self.node.operation().name()
    }

    /// Output property this reference points at.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub(crate) fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub(crate) fn into_node(self) -> Arc<Node> {
        self.node
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deferred({} {}.{})", self.node_id(), self.operation(), self.output)
    }
}

/// Image-valued property: concrete pixels or a pending output.
#[derive(Debug, Clone)]
pub enum ImageRef {
    /// Pixels exist.
    Ready(Image),
    /// Output of an operation that has not been evaluated.
    Deferred(Deferred),
}

/// A single property value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Image handle.
    Image(ImageRef),
    /// Float scalar.
    Double(f64),
    /// Integer scalar.
    Int(i64),
    /// Flag.
    Bool(bool),
    /// String.
    Str(String),
}

impl Value {
    /// Kind of the contained value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Image(_) => ValueKind::Image,
            Self::Double(_) => ValueKind::Double,
            Self::Int(_) => ValueKind::Int,
            Self::Bool(_) => ValueKind::Bool,
            Self::Str(_) => ValueKind::Str,
        }
    }

    /// Returns the float, if this is a `Double`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the flag, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the concrete image, if this is a ready image.
    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Self::Image(ImageRef::Ready(img)) => Some(img),
            _ => None,
        }
    }

    /// Returns the deferred reference, if this is a pending image.
    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Self::Image(ImageRef::Deferred(d)) => Some(d),
            _ => None,
        }
    }

    /// Returns `true` for a pending image.
    pub fn is_deferred(&self) -> bool {
        self.as_deferred().is_some()
    }

    /// Numeric view used for range checks (`Double` and `Int` only).
    pub(crate) fn as_number(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(ImageRef::Ready(img)) => {
                write!(f, "{} {}x{}x{}", img.id(), img.width(), img.height(), img.bands())
            }
            Self::Image(ImageRef::Deferred(d)) => write!(f, "<{} {}.{}>", d.node_id(), d.operation(), d.output()),
            Self::Double(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<Image> for Value {
    fn from(img: Image) -> Self {
        Self::Image(ImageRef::Ready(img))
    }
}

impl From<&Image> for Value {
    fn from(img: &Image) -> Self {
        Self::Image(ImageRef::Ready(img.clone()))
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Self::Image(ImageRef::Deferred(d))
    }
}

impl From<ImageRef> for Value {
    fn from(r: ImageRef) -> Self {
        Self::Image(r)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Double(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
