//! Image resize and resampling operations.
//!
//! Scaling is separable: a horizontal pass followed by a vertical pass,
//! each with per-output-sample weights computed once and reused for every
//! row or column.
//!
//! # Filters
//!
//! - [`Filter::Nearest`] - Fastest, no interpolation (blocky)
//! - [`Filter::Linear`] - Triangle filter (smooth but blurry)
//! - [`Filter::Cubic`] - Mitchell-Netravali cubic
//! - [`Filter::Lanczos3`] - Sinc-based (best for downscaling)
//!
//! # Example
//!
//! ```rust
//! use vfx_ops::resize::{resize_scale, Filter};
//!
//! let src: Vec<f32> = vec![0.0; 64 * 64 * 4];
//! let (dst, w, h) = resize_scale(&src, 64, 64, 4, 0.5, 0.5, Filter::Lanczos3).unwrap();
//! assert_eq!((w, h), (32, 32));
//! assert_eq!(dst.len(), 32 * 32 * 4);
//! ```

use crate::error::check_len;
use crate::{OpsError, OpsResult, for_each_row};
use tracing::trace;

/// Largest output width or height.
pub const MAX_DIMENSION: usize = u32::MAX as usize;

/// Largest number of samples a resize may allocate (4 GiB of `f32`).
pub const MAX_SAMPLES: usize = 1 << 30;

/// Resampling filter for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Nearest-neighbor (fastest, no interpolation).
    Nearest,
    /// Linear interpolation (smooth, fast).
    Linear,
    /// Cubic interpolation (sharper than linear).
    Cubic,
    /// Lanczos-3 (high quality, best for downscaling).
    #[default]
    Lanczos3,
}

impl Filter {
    /// Parses a kernel name: `nearest`, `linear`, `cubic`, `lanczos3`.
    ///
    /// ```rust
    /// use vfx_ops::Filter;
    ///
    /// assert_eq!(Filter::from_name("lanczos3"), Some(Filter::Lanczos3));
    /// assert_eq!(Filter::from_name("box"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "nearest" => Some(Self::Nearest),
            "linear" | "bilinear" => Some(Self::Linear),
            "cubic" | "bicubic" => Some(Self::Cubic),
            "lanczos3" => Some(Self::Lanczos3),
            _ => None,
        }
    }

    /// Canonical kernel name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
            Self::Cubic => "cubic",
            Self::Lanczos3 => "lanczos3",
        }
    }

    /// Returns the support radius for this filter.
    #[inline]
    pub fn support(&self) -> f32 {
        match self {
            Filter::Nearest => 0.5,
            Filter::Linear => 1.0,
            Filter::Cubic => 2.0,
            Filter::Lanczos3 => 3.0,
        }
    }

    /// Evaluates the filter kernel at position x.
    #[inline]
    pub fn weight(&self, x: f32) -> f32 {
        match self {
            Filter::Nearest => nearest_weight(x),
            Filter::Linear => linear_weight(x),
            Filter::Cubic => cubic_weight(x),
            Filter::Lanczos3 => lanczos_weight(x, 3.0),
        }
    }
}

#[inline]
fn nearest_weight(x: f32) -> f32 {
    if x.abs() < 0.5 { 1.0 } else { 0.0 }
}

#[inline]
fn linear_weight(x: f32) -> f32 {
    let ax = x.abs();
    if ax < 1.0 { 1.0 - ax } else { 0.0 }
}

/// Mitchell-Netravali with B=1/3, C=1/3.
#[inline]
fn cubic_weight(x: f32) -> f32 {
    const B: f32 = 1.0 / 3.0;
    const C: f32 = 1.0 / 3.0;

    let ax = x.abs();
    if ax < 1.0 {
        ((12.0 - 9.0 * B - 6.0 * C) * ax * ax * ax
            + (-18.0 + 12.0 * B + 6.0 * C) * ax * ax
            + (6.0 - 2.0 * B))
            / 6.0
    } else if ax < 2.0 {
        ((-B - 6.0 * C) * ax * ax * ax
            + (6.0 * B + 30.0 * C) * ax * ax
            + (-12.0 * B - 48.0 * C) * ax
            + (8.0 * B + 24.0 * C))
            / 6.0
    } else {
        0.0
    }
}

#[inline]
fn lanczos_weight(x: f32, a: f32) -> f32 {
    let ax = x.abs();
    if ax < 1e-8 {
        1.0
    } else if ax < a {
        let pi_x = std::f32::consts::PI * ax;
        let pi_x_a = pi_x / a;
        (pi_x.sin() / pi_x) * (pi_x_a.sin() / pi_x_a)
    } else {
        0.0
    }
}

/// Output length for `len` samples scaled by `scale` (rounded, at least 1).
///
/// # Errors
///
/// Returns [`OpsError::InvalidParameter`] if `scale` is not a positive
/// finite number, and [`OpsError::InvalidDimensions`] if the result exceeds
/// [`MAX_DIMENSION`].
pub fn scaled_len(len: usize, scale: f64) -> OpsResult<usize> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(OpsError::InvalidParameter(format!(
            "scale must be a positive finite number, got {scale}"
        )));
    }
    let scaled = (len as f64 * scale).round();
    if scaled > MAX_DIMENSION as f64 {
        return Err(OpsError::InvalidDimensions(format!(
            "{len} scaled by {scale} exceeds {MAX_DIMENSION}"
        )));
    }
    Ok((scaled as usize).max(1))
}

/// Rejects outputs whose destination or intermediate pass exceeds [`MAX_SAMPLES`].
fn check_output(src_h: usize, channels: usize, dst_w: usize, dst_h: usize) -> OpsResult<()> {
    let samples = dst_w
        .checked_mul(dst_h.max(src_h))
        .and_then(|n| n.checked_mul(channels));
    match samples {
        Some(n) if n <= MAX_SAMPLES => Ok(()),
        _ => Err(OpsError::InvalidDimensions(format!(
            "{dst_w}x{dst_h}x{channels} output exceeds {MAX_SAMPLES} samples"
        ))),
    }
}

/// Weights contributing to one output sample.
struct Contrib {
    start: usize,
    weights: Vec<f32>,
}

/// Precomputes normalized contributions for a 1-D resample.
fn contributions(src_len: usize, dst_len: usize, filter: Filter) -> Vec<Contrib> {
    let scale = src_len as f32 / dst_len as f32;
    let stretch = scale.max(1.0);
    let support = filter.support() * stretch;

    (0..dst_len)
        .map(|i| {
            let center = (i as f32 + 0.5) * scale - 0.5;
            let lo = ((center - support).floor() as isize).max(0) as usize;
            let hi = ((center + support).ceil() as isize).clamp(0, src_len as isize - 1) as usize;
            let mut weights: Vec<f32> = (lo..=hi)
                .map(|s| filter.weight((s as f32 - center) / stretch))
                .collect();
            let sum: f32 = weights.iter().sum();
            if sum.abs() > f32::EPSILON {
                weights.iter_mut().for_each(|w| *w /= sum);
            } else {
                // Degenerate window: fall back to the nearest sample.
                let nearest = (center.round().max(0.0) as usize).min(src_len - 1);
                return Contrib {
                    start: nearest,
                    weights: vec![1.0],
                };
            }
            Contrib { start: lo, weights }
        })
        .collect()
}

/// Resizes f32 image data to explicit dimensions.
///
/// # Example
///
/// ```rust
/// use vfx_ops::resize::{resize_f32, Filter};
///
/// let src = vec![0.5f32; 16 * 16 * 4];
/// let dst = resize_f32(&src, 16, 16, 4, 32, 32, Filter::Linear).unwrap();
/// assert_eq!(dst.len(), 32 * 32 * 4);
/// ```
pub fn resize_f32(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
    filter: Filter,
) -> OpsResult<Vec<f32>> {
    check_len(src, src_w, src_h, channels)?;
    if dst_w == 0 || dst_h == 0 {
        return Err(OpsError::InvalidDimensions(
            "destination size must be > 0".into(),
        ));
    }
    check_output(src_h, channels, dst_w, dst_h)?;
    trace!(src_w, src_h, dst_w, dst_h, filter = filter.name(), "resize");

    let temp = resize_horizontal(src, src_w, src_h, channels, dst_w, filter);
    Ok(resize_vertical(&temp, dst_w, src_h, channels, dst_h, filter))
}

/// Resizes by independent horizontal and vertical scale factors.
///
/// Returns the resampled buffer and its `(width, height)`.
pub fn resize_scale(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    hscale: f64,
    vscale: f64,
    filter: Filter,
) -> OpsResult<(Vec<f32>, usize, usize)> {
    let dst_w = scaled_len(src_w, hscale)?;
    let dst_h = scaled_len(src_h, vscale)?;
    let dst = resize_f32(src, src_w, src_h, channels, dst_w, dst_h, filter)?;
    Ok((dst, dst_w, dst_h))
}

fn resize_horizontal(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    filter: Filter,
) -> Vec<f32> {
    let contribs = contributions(src_w, dst_w, filter);
    let mut dst = vec![0.0f32; dst_w * src_h * channels];

    for_each_row(&mut dst, dst_w * channels, |y, row| {
        let src_row = &src[y * src_w * channels..(y + 1) * src_w * channels];
        for (x, contrib) in contribs.iter().enumerate() {
            let out = &mut row[x * channels..(x + 1) * channels];
            for (k, w) in contrib.weights.iter().enumerate() {
                let s = (contrib.start + k) * channels;
                for c in 0..channels {
                    out[c] += src_row[s + c] * w;
                }
            }
        }
    });

    dst
}

fn resize_vertical(
    src: &[f32],
    width: usize,
    src_h: usize,
    channels: usize,
    dst_h: usize,
    filter: Filter,
) -> Vec<f32> {
    let contribs = contributions(src_h, dst_h, filter);
    let row_len = width * channels;
    let mut dst = vec![0.0f32; row_len * dst_h];

    for_each_row(&mut dst, row_len, |y, row| {
        let contrib = &contribs[y];
        for (k, w) in contrib.weights.iter().enumerate() {
            let src_row = &src[(contrib.start + k) * row_len..(contrib.start + k + 1) * row_len];
            for (o, s) in row.iter_mut().zip(src_row) {
                *o += s * w;
            }
        }
    });

    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_filter_weights() {
        assert_relative_eq!(Filter::Nearest.weight(0.0), 1.0);
        assert_relative_eq!(Filter::Nearest.weight(0.6), 0.0);
        assert_relative_eq!(Filter::Linear.weight(0.5), 0.5);
        assert_relative_eq!(Filter::Lanczos3.weight(0.0), 1.0);
        assert_relative_eq!(Filter::Lanczos3.weight(3.5), 0.0);
    }

    #[test]
    fn test_oversized_output_rejected() {
        let src = vec![0.5f32; 10 * 10];
        let err = resize_scale(&src, 10, 10, 1, 1.0e5, 1.0e5, Filter::Linear).unwrap_err();
        assert!(matches!(err, OpsError::InvalidDimensions(_)));

        assert!(matches!(scaled_len(10, 1.0e12), Err(OpsError::InvalidDimensions(_))));
        assert!(resize_f32(&src, 10, 10, 1, usize::MAX, 2, Filter::Nearest).is_err());
        assert!(resize_f32(&src, 10, 10, 1, 40_000, 40_000, Filter::Nearest).is_err());
        assert_eq!(scaled_len(10, 2.0).unwrap(), 20);
    }

    #[test]
    fn test_filter_names() {
        for f in [Filter::Nearest, Filter::Linear, Filter::Cubic, Filter::Lanczos3] {
            assert_eq!(Filter::from_name(f.name()), Some(f));
        }
        assert_eq!(Filter::from_name("BICUBIC"), Some(Filter::Cubic));
    }

    #[test]
    fn test_scaled_len() {
        assert_eq!(scaled_len(100, 0.5).unwrap(), 50);
        assert_eq!(scaled_len(3, 0.1).unwrap(), 1);
        assert_eq!(scaled_len(10, 1.25).unwrap(), 13);
        assert!(scaled_len(10, 0.0).is_err());
        assert!(scaled_len(10, -1.0).is_err());
        assert!(scaled_len(10, f64::NAN).is_err());
    }

    #[test]
    fn test_resize_identity_preserves_values() {
        let src: Vec<f32> = (0..4 * 4 * 3).map(|i| i as f32 / 48.0).collect();
        let dst = resize_f32(&src, 4, 4, 3, 4, 4, Filter::Linear).unwrap();
        for (a, b) in src.iter().zip(&dst) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_resize_constant_stays_constant() {
        let src = vec![0.5f32; 8 * 8 * 4];
        for filter in [Filter::Nearest, Filter::Linear, Filter::Cubic, Filter::Lanczos3] {
            let (dst, w, h) = resize_scale(&src, 8, 8, 4, 1.5, 0.5, filter).unwrap();
            assert_eq!((w, h), (12, 4));
            for v in dst {
                assert_relative_eq!(v, 0.5, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_resize_rejects_bad_input() {
        assert!(resize_f32(&[0.0; 5], 2, 2, 1, 4, 4, Filter::Linear).is_err());
        assert!(resize_f32(&[0.0; 4], 2, 2, 1, 0, 4, Filter::Linear).is_err());
        assert!(resize_scale(&[0.0; 4], 2, 2, 1, -0.5, 1.0, Filter::Linear).is_err());
    }
}
