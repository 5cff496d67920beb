//! Per-sample arithmetic and image statistics.
//!
//! # Operations
//!
//! - [`linear`] - `out = in * a + b`
//! - [`invert`] - `out = 1 - in`
//! - [`add`], [`subtract`] - Two-image arithmetic
//! - [`abs`] - Absolute value
//! - [`average`] - Mean over all samples
//!
//! # Example
//!
//! ```rust
//! use vfx_ops::arithmetic::{subtract, abs, average};
//!
//! let a = vec![0.5f32, 0.25, 1.0];
//! let b = vec![0.25f32, 0.5, 1.0];
//! let diff = abs(&subtract(&a, &b).unwrap());
//! assert!((average(&diff).unwrap() - 1.0 / 6.0).abs() < 1e-6);
//! ```

use crate::{OpsError, OpsResult};

/// Applies `out = in * a + b` to every sample.
pub fn linear(src: &[f32], a: f64, b: f64) -> OpsResult<Vec<f32>> {
    if !a.is_finite() || !b.is_finite() {
        return Err(OpsError::InvalidParameter(format!(
            "linear coefficients must be finite, got a={a} b={b}"
        )));
    }
    let (a, b) = (a as f32, b as f32);
    Ok(src.iter().map(|&v| v * a + b).collect())
}

/// Inverts normalized samples: `out = 1 - in`.
pub fn invert(src: &[f32]) -> Vec<f32> {
    src.iter().map(|&v| 1.0 - v).collect()
}

fn check_pair(left: &[f32], right: &[f32]) -> OpsResult<()> {
    if left.len() != right.len() {
        return Err(OpsError::SizeMismatch(format!(
            "left has {} samples, right has {}",
            left.len(),
            right.len()
        )));
    }
    Ok(())
}

/// Sample-wise `left + right`.
pub fn add(left: &[f32], right: &[f32]) -> OpsResult<Vec<f32>> {
    check_pair(left, right)?;
    Ok(left.iter().zip(right).map(|(l, r)| l + r).collect())
}

/// Sample-wise `left - right`.
pub fn subtract(left: &[f32], right: &[f32]) -> OpsResult<Vec<f32>> {
    check_pair(left, right)?;
    Ok(left.iter().zip(right).map(|(l, r)| l - r).collect())
}

/// Sample-wise absolute value.
pub fn abs(src: &[f32]) -> Vec<f32> {
    src.iter().map(|v| v.abs()).collect()
}

/// Mean of all samples, accumulated in f64.
///
/// # Errors
///
/// Returns [`OpsError::InvalidDimensions`] for an empty buffer.
pub fn average(src: &[f32]) -> OpsResult<f64> {
    if src.is_empty() {
        return Err(OpsError::InvalidDimensions("cannot average an empty image".into()));
    }
    Ok(src.iter().map(|&v| v as f64).sum::<f64>() / src.len() as f64)
}
