//! Gaussian blur and unsharp-mask sharpening.
//!
//! Both filters are separable: a 1-D Gaussian kernel is applied along rows
//! then columns, with edge samples clamped.
//!
//! # Example
//!
//! ```rust
//! use vfx_ops::filter::{gaussian_blur, unsharp_mask};
//!
//! let src = vec![0.5f32; 16 * 16 * 3];
//! let blurred = gaussian_blur(&src, 16, 16, 3, 1.0).unwrap();
//! let sharp = unsharp_mask(&src, 16, 16, 3, 1.5, 1.0, 0.0).unwrap();
//! assert_eq!(blurred.len(), sharp.len());
//! ```

use crate::error::check_len;
use crate::{OpsError, OpsResult, for_each_row};
use tracing::{debug, trace};

/// Builds a normalized 1-D Gaussian kernel.
///
/// The radius is `ceil(3 * sigma)`, which covers 99.7% of the curve.
///
/// # Errors
///
/// Returns [`OpsError::InvalidParameter`] unless `sigma` is positive and finite.
///
/// # Example
///
/// ```rust
/// use vfx_ops::filter::gaussian_kernel;
///
/// let k = gaussian_kernel(1.0).unwrap();
/// assert_eq!(k.len(), 7);
/// assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
/// ```
pub fn gaussian_kernel(sigma: f64) -> OpsResult<Vec<f32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(OpsError::InvalidParameter(format!(
            "sigma must be a positive finite number, got {sigma}"
        )));
    }
    let radius = ((sigma * 3.0).ceil() as i64).max(1);
    let sigma2 = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / sigma2).exp() as f32)
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    Ok(kernel)
}

/// Applies a separable Gaussian blur.
pub fn gaussian_blur(
    src: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    sigma: f64,
) -> OpsResult<Vec<f32>> {
    check_len(src, width, height, channels)?;
    let kernel = gaussian_kernel(sigma)?;
    trace!(width, height, channels, sigma, taps = kernel.len(), "gaussian_blur");

    let temp = blur_horizontal(src, width, channels, &kernel);
    Ok(blur_vertical(&temp, width, height, channels, &kernel))
}

fn blur_horizontal(src: &[f32], width: usize, channels: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = (kernel.len() / 2) as isize;
    let row_len = width * channels;
    let mut dst = vec![0.0f32; src.len()];

    for_each_row(&mut dst, row_len, |y, row| {
        let src_row = &src[y * row_len..(y + 1) * row_len];
        for x in 0..width {
            for (k, w) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - radius).clamp(0, width as isize - 1) as usize;
                for c in 0..channels {
                    row[x * channels + c] += src_row[sx * channels + c] * w;
                }
            }
        }
    });

    dst
}

fn blur_vertical(src: &[f32], width: usize, height: usize, channels: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = (kernel.len() / 2) as isize;
    let row_len = width * channels;
    let mut dst = vec![0.0f32; src.len()];

    for_each_row(&mut dst, row_len, |y, row| {
        for (k, w) in kernel.iter().enumerate() {
            let sy = (y as isize + k as isize - radius).clamp(0, height as isize - 1) as usize;
            let src_row = &src[sy * row_len..(sy + 1) * row_len];
            for (o, s) in row.iter_mut().zip(src_row) {
                *o += s * w;
            }
        }
    });

    dst
}

/// Sharpens with an unsharp mask.
///
/// `out = in + amount * (in - blur(in, sigma))` wherever the difference
/// reaches `threshold`; other samples pass through unchanged.
///
/// # Arguments
///
/// * `sigma` - Blur sigma of the mask (larger = wider halo)
/// * `amount` - Strength of sharpening (1.0 = normal)
/// * `threshold` - Minimum absolute difference to sharpen
pub fn unsharp_mask(
    src: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    sigma: f64,
    amount: f64,
    threshold: f64,
) -> OpsResult<Vec<f32>> {
    if !amount.is_finite() || !threshold.is_finite() || threshold < 0.0 {
        return Err(OpsError::InvalidParameter(format!(
            "amount must be finite and threshold >= 0, got amount={amount} threshold={threshold}"
        )));
    }
    debug!(width, height, sigma, amount, threshold, "unsharp_mask");

    let blurred = gaussian_blur(src, width, height, channels, sigma)?;
    let (amount, threshold) = (amount as f32, threshold as f32);

    Ok(src
        .iter()
        .zip(&blurred)
        .map(|(&s, &b)| {
            let diff = s - b;
            if diff.abs() >= threshold { s + amount * diff } else { s }
        })
        .collect())
}
