//! # vfx-ops
//!
//! Pixel kernels for the reference operation engine.
//!
//! Every kernel works on interleaved `f32` slices described by
//! `(width, height, channels)` and returns a freshly allocated buffer, so
//! callers decide who owns the result.
//!
//! # Modules
//!
//! - [`resize`] - Separable resampling by scale factor
//! - [`filter`] - Gaussian blur and unsharp-mask sharpening
//! - [`arithmetic`] - Per-sample arithmetic and statistics
//! - [`transform`] - Flips and area extraction
//!
//! # Example
//!
//! ```rust
//! use vfx_ops::{filter, resize};
//!
//! let src = vec![0.5f32; 16 * 16 * 3];
//! let (small, w, h) = resize::resize_scale(&src, 16, 16, 3, 0.5, 0.5, resize::Filter::Lanczos3).unwrap();
//! let sharp = filter::unsharp_mask(&small, w, h, 3, 1.5, 1.0, 0.0).unwrap();
//! assert_eq!(sharp.len(), 8 * 8 * 3);
//! ```
//!
//! # Feature Flags
//!
//! - `parallel` - Process rows with rayon (enabled by default)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod arithmetic;
pub mod filter;
pub mod resize;
pub mod transform;

pub use error::{OpsError, OpsResult};
pub use resize::Filter;
pub use transform::Direction;

/// Runs `f(y, row)` over each `row_len`-sized row of `dst`.
#[cfg(feature = "parallel")]
pub(crate) fn for_each_row<F>(dst: &mut [f32], row_len: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    use rayon::prelude::*;
    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn for_each_row<F>(dst: &mut [f32], row_len: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    dst.chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}
