//! Geometric transformation operations.
//!
//! # Operations
//!
//! - [`extract_area`] - Copy out a rectangular region
//! - [`flip`] - Mirror along one axis
//!
//! # Example
//!
//! ```rust
//! use vfx_ops::transform::{extract_area, flip, Direction};
//!
//! let src = vec![0.5f32; 64 * 64 * 4];
//! let flipped = flip(&src, 64, 64, 4, Direction::Horizontal).unwrap();
//! let cropped = extract_area(&flipped, 64, 64, 4, 16, 16, 32, 32).unwrap();
//! assert_eq!(cropped.len(), 32 * 32 * 4);
//! ```

use crate::error::check_len;
use crate::{OpsError, OpsResult};

/// Flip axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Left-right mirror.
    Horizontal,
    /// Top-bottom mirror.
    Vertical,
}

impl Direction {
    /// Parses `horizontal` / `vertical` (or `h` / `v`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Some(Self::Horizontal),
            "vertical" | "v" => Some(Self::Vertical),
            _ => None,
        }
    }
}

/// Extracts the `w`x`h` region whose top-left corner is `(left, top)`.
///
/// # Errors
///
/// Returns [`OpsError::InvalidDimensions`] if the region is empty or
/// does not fit inside the source.
pub fn extract_area(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    left: usize,
    top: usize,
    w: usize,
    h: usize,
) -> OpsResult<Vec<f32>> {
    check_len(src, src_w, src_h, channels)?;
    if w == 0 || h == 0 || left + w > src_w || top + h > src_h {
        return Err(OpsError::InvalidDimensions(format!(
            "area {}x{} at ({},{}) does not fit in {}x{}",
            w, h, left, top, src_w, src_h
        )));
    }

    let mut dst = Vec::with_capacity(w * h * channels);
    for row in top..top + h {
        let start = (row * src_w + left) * channels;
        dst.extend_from_slice(&src[start..start + w * channels]);
    }
    Ok(dst)
}

/// Mirrors the image along `direction`.
pub fn flip(
    src: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    direction: Direction,
) -> OpsResult<Vec<f32>> {
    check_len(src, width, height, channels)?;
    let row_len = width * channels;
    let mut dst = Vec::with_capacity(src.len());

    match direction {
        Direction::Horizontal => {
            for row in src.chunks(row_len) {
                for px in row.chunks(channels).rev() {
                    dst.extend_from_slice(px);
                }
            }
        }
        Direction::Vertical => {
            for row in src.chunks(row_len).rev() {
                dst.extend_from_slice(row);
            }
        }
    }
    Ok(dst)
}
