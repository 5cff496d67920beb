//! # vfx-fusion
//!
//! Fused operation graphs over an image-processing engine.
//!
//! Instead of running each transform eagerly and materializing an image
//! after every step, callers create operation [`Descriptor`]s, link the
//! unevaluated output of one into the input of the next, and build the
//! terminal descriptor once. The [`Engine`] then evaluates the whole
//! dependency graph in a single call.
//!
//! # Protocol
//!
//! ```rust
//! use vfx_fusion::{Engine, extract_output, link};
//! use vfx_core::Image;
//!
//! let engine = Engine::default();
//! let input = Image::filled(64, 64, 3, 0.5);
//!
//! // Create descriptors and set typed properties
//! let mut resize = engine.operation("resize")?;
//! resize.set("in", &input)?;
//! resize.set("scale", 0.5)?;
//!
//! // Link resize.out -> sharpen.in (nothing runs yet)
//! let mut sharpen = engine.operation("sharpen")?;
//! link(&resize, "out", &mut sharpen, "in")?;
//! sharpen.set("sigma", 1.5)?;
//!
//! // One build evaluates the whole chain
//! let built = engine.build(&sharpen)?;
//! let output = extract_output(&built)?;
//!
//! // Releasing everything else leaves the output intact
//! drop((built, resize, sharpen));
//! assert_eq!(output.dimensions(), (32, 32, 3));
//! # Ok::<(), vfx_fusion::FusionError>(())
//! ```
//!
//! Or with the pipeline front end:
//!
//! ```rust
//! use vfx_fusion::{Engine, Stage, fused_pipeline};
//! use vfx_core::Image;
//!
//! let engine = Engine::default();
//! let input = Image::filled(64, 64, 3, 0.5);
//! let out = fused_pipeline(&engine, &input, &[
//!     Stage::new("resize").set("scale", 0.5),
//!     Stage::new("sharpen").set("sigma", 1.5),
//! ])?;
//! assert_eq!(out.dimensions(), (32, 32, 3));
//! # Ok::<(), vfx_fusion::FusionError>(())
//! ```
//!
//! # Modules
//!
//! - [`value`] - Typed property values and deferred references
//! - [`operation`] - Engine capability trait and argument declarations
//! - [`registry`] - Operation lookup by name
//! - [`descriptor`] - Unevaluated graph nodes
//! - [`graph`] - Explicit DAG planned from a terminal descriptor
//! - [`engine`] - Builder/executor
//! - [`cache`] - Operation result cache
//! - [`pipeline`] - Linear pipelines and their YAML form
//!
//! # Resource Accounting
//!
//! Each engine owns a [`ResourceTracker`](vfx_core::ResourceTracker).
//! Descriptors, built operations and engine-allocated images hold leases on
//! it, so [`Engine::counts`] returns to its baseline once everything a call
//! created has been dropped.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod builtin;
mod built;
pub mod cache;
pub mod config;
pub mod descriptor;
pub mod engine;
mod error;
pub mod graph;
mod link;
pub mod operation;
pub mod pipeline;
pub mod registry;
pub mod value;

pub use built::{BuiltOperation, extract_output};
pub use cache::{CacheKey, CacheStats, OperationCache};
pub use config::EngineConfig;
pub use descriptor::{Descriptor, NodeId, NodeState};
pub use engine::Engine;
pub use error::{FusionError, FusionResult};
pub use graph::{Edge, Graph};
pub use link::link;
pub use operation::{ArgDirection, Argument, Context, Operation, Outputs};
pub use pipeline::{Pipeline, PipelineSpec, ScalarValue, Stage, StageSpec, fused_pipeline};
pub use registry::OperationRegistry;
pub use value::{Deferred, ImageRef, Value, ValueKind};

pub use vfx_core::{Image, ImageType, ResourceCounts, ResourceKind};
