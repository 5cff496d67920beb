//! # vfx-core
//!
//! Core types shared by the fused operation graph crates.
//!
//! This crate provides the foundational types used throughout the workspace:
//!
//! - [`Image`] - Reference-counted image handle carrying file-format metadata
//! - [`ImageType`] - File format an image came from or is destined for
//! - [`ResourceTracker`], [`Lease`] - Live-object accounting for descriptors,
//!   built operations and image buffers
//! - [`Error`] - Buffer and geometry errors
//!
//! ## Ownership Model
//!
//! An [`Image`] is a cheap handle over a shared pixel buffer. Cloning it
//! retains the buffer, dropping it releases the buffer, so ownership never
//! has to be paired by hand across error branches:
//!
//! ```rust
//! use vfx_core::Image;
//!
//! let img = Image::filled(4, 4, 3, 0.5);
//! let alias = img.clone();          // retain
//! assert_eq!(img.ref_count(), 2);
//! drop(alias);                      // release
//! assert_eq!(img.ref_count(), 1);
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//! vfx-core (this crate)
//!    ^
//!    |
//!    +-- vfx-ops (pixel kernels)
//!    +-- vfx-fusion (operation graphs)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod image;
pub mod resource;

// Re-exports for convenience
pub use error::*;
pub use format::*;
pub use image::*;
pub use resource::*;

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use vfx_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::format::ImageType;
    pub use crate::image::{Image, ImageId};
    pub use crate::resource::{Lease, ResourceCounts, ResourceKind, ResourceTracker};
}
