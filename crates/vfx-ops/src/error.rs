//! Error types for pixel kernels.

use thiserror::Error;

/// Error type for pixel kernels.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Inputs have incompatible sizes.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation not supported for this input.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type for pixel kernels.
pub type OpsResult<T> = Result<T, OpsError>;

/// Checks that `src` holds exactly `width * height * channels` samples.
pub(crate) fn check_len(src: &[f32], width: usize, height: usize, channels: usize) -> OpsResult<()> {
    if width == 0 || height == 0 || channels == 0 {
        return Err(OpsError::InvalidDimensions(
            "width, height, and channels must be > 0".into(),
        ));
    }
    let expected = width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(channels))
        .ok_or_else(|| OpsError::InvalidDimensions("image dimensions overflow".into()))?;
    if src.len() != expected {
        return Err(OpsError::InvalidDimensions(format!(
            "expected {} samples, got {}",
            expected,
            src.len()
        )));
    }
    Ok(())
}
