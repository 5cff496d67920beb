//! Error types for vfx-core operations.
//!
//! The [`Error`] enum covers the failure modes of image buffer handling:
//! - Buffer construction (dimensions, data length)
//! - Pixel access (bounds checking)
//! - Geometry agreement between two images
//!
//! # Usage
//!
//! ```rust
//! use vfx_core::{Error, Result};
//!
//! fn check_pixel(x: u32, y: u32, width: u32, height: u32) -> Result<()> {
//!     if x >= width || y >= height {
//!         return Err(Error::out_of_bounds(x, y, width, height));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Used By
//!
//! - [`crate::image::Image`] - Buffer construction and pixel access
//! - `vfx-fusion` - Wrapped into build failures

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating or reading image buffers.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel coordinates are outside image bounds.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vfx_core::Error;
    ///
    /// let err = Error::out_of_bounds(100, 50, 80, 60);
    /// assert!(err.to_string().contains("100"));
    /// ```
    #[error("pixel ({x}, {y}) out of bounds for image {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was out of bounds
        x: u32,
        /// Y coordinate that was out of bounds
        y: u32,
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },

    /// Image geometry doesn't match for the operation.
    ///
    /// Returned when two images must share width, height and band count
    /// (e.g. pixel-wise arithmetic).
    #[error("geometry mismatch: {a_width}x{a_height}x{a_bands} vs {b_width}x{b_height}x{b_bands}")]
    GeometryMismatch {
        /// First image width
        a_width: u32,
        /// First image height
        a_height: u32,
        /// First image bands
        a_bands: u32,
        /// Second image width
        b_width: u32,
        /// Second image height
        b_height: u32,
        /// Second image bands
        b_bands: u32,
    },

    /// Invalid image dimensions.
    ///
    /// Returned when width, height or band count is zero, or the supplied
    /// buffer length does not match `width * height * bands`.
    #[error("invalid dimensions: {width}x{height}x{bands} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Requested band count
        bands: u32,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an [`Error::OutOfBounds`] error.
    #[inline]
    pub fn out_of_bounds(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, bands: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            bands,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::GeometryMismatch`] error from `(width, height, bands)` triples.
    #[inline]
    pub fn geometry_mismatch(a: (u32, u32, u32), b: (u32, u32, u32)) -> Self {
        Self::GeometryMismatch {
            a_width: a.0,
            a_height: a.1,
            a_bands: a.2,
            b_width: b.0,
            b_height: b.1,
            b_bands: b.2,
        }
    }

    /// Creates an [`Error::Other`] error.
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns `true` if this is a bounds-related error.
    #[inline]
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }

    /// Returns `true` if this is a geometry or dimension error.
    #[inline]
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Self::GeometryMismatch { .. } | Self::InvalidDimensions { .. })
    }
}
