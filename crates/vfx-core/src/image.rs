//! Reference-counted image handle.
//!
//! [`Image`] is the caller-facing handle returned by a fused pipeline. It
//! wraps a shared, immutable `f32` pixel buffer plus file-format metadata.
//!
//! # Ownership
//!
//! The buffer lives behind an [`Arc`]:
//! - `clone()` retains the buffer (no pixel copy)
//! - dropping a handle releases it
//! - the graph engine may alias a buffer freely while evaluating, and the
//!   caller's handle stays valid after every engine object is gone
//!
//! Buffers allocated by an engine carry a [`Lease`] so they show up in the
//! engine's [`ResourceTracker`](crate::ResourceTracker) until the last
//! handle is dropped.
//!
//! # Memory Layout
//!
//! Pixels are stored row-major, top-to-bottom, bands interleaved:
//!
//! ```text
//! Memory: [R G B R G B R G B ...]  <- Row 0
//!         [R G B R G B R G B ...]  <- Row 1
//! ```
//!
//! # Usage
//!
//! ```rust
//! use vfx_core::{Image, ImageType};
//!
//! let img = Image::from_f32(vec![0.25; 2 * 2 * 3], 2, 2, 3)
//!     .unwrap()
//!     .with_formats(ImageType::Png, ImageType::Jpeg);
//!
//! assert_eq!(img.dimensions(), (2, 2, 3));
//! assert_eq!(img.pixel(1, 1).unwrap(), &[0.25, 0.25, 0.25]);
//! assert_eq!(img.original_format(), ImageType::Jpeg);
//! ```

use crate::{Error, ImageType, Lease, Result};
use std::fmt;
use std::sync::Arc;

/// Identity of a pixel buffer.
///
/// Two handles have the same id exactly when they alias the same buffer.
/// Ids may be reused once every handle to a buffer is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(usize);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img@{:x}", self.0)
    }
}

/// Shared pixel storage.
struct Buffer {
    data: Vec<f32>,
    width: u32,
    height: u32,
    bands: u32,
    lease: Option<Lease>,
}

/// Image handle: shared pixels plus current and original file format.
#[derive(Clone)]
pub struct Image {
    buffer: Arc<Buffer>,
    format: ImageType,
    original_format: ImageType,
}

impl Image {
    /// Creates an untracked image from interleaved `f32` data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if any dimension is zero or
    /// `data.len() != width * height * bands`.
    pub fn from_f32(data: Vec<f32>, width: u32, height: u32, bands: u32) -> Result<Self> {
        Self::build(data, width, height, bands, None)
    }

    /// Creates an image whose buffer is accounted by `lease`.
    ///
    /// The lease is returned when the last handle to the buffer drops.
    pub fn from_f32_tracked(
        data: Vec<f32>,
        width: u32,
        height: u32,
        bands: u32,
        lease: Lease,
    ) -> Result<Self> {
        Self::build(data, width, height, bands, Some(lease))
    }

    fn build(data: Vec<f32>, width: u32, height: u32, bands: u32, lease: Option<Lease>) -> Result<Self> {
        if width == 0 || height == 0 || bands == 0 {
            return Err(Error::invalid_dimensions(
                width,
                height,
                bands,
                "width, height and bands must be > 0",
            ));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(bands as usize))
            .ok_or_else(|| Error::invalid_dimensions(width, height, bands, "buffer size overflows"))?;
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                bands,
                format!("expected {} elements, got {}", expected, data.len()),
            ));
        }
        Ok(Self {
            buffer: Arc::new(Buffer {
                data,
                width,
                height,
                bands,
                lease,
            }),
            format: ImageType::Unknown,
            original_format: ImageType::Unknown,
        })
    }

    /// Creates an untracked image with every sample set to `value`.
    ///
    /// # Panics
    ///
    /// Panics if any dimension is zero.
    pub fn filled(width: u32, height: u32, bands: u32, value: f32) -> Self {
        let len = width as usize * height as usize * bands as usize;
        match Self::from_f32(vec![value; len], width, height, bands) {
            Ok(img) => img,
            Err(e) => panic!("Image::filled: {e}"),
        }
    }

    /// Returns the image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    /// Returns the image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    /// Returns the number of interleaved bands per pixel.
    #[inline]
    pub fn bands(&self) -> u32 {
        self.buffer.bands
    }

    /// Returns `(width, height, bands)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.width(), self.height(), self.bands())
    }

    /// Returns the raw interleaved samples.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.buffer.data
    }

    /// Copies the samples out.
    pub fn to_vec(&self) -> Vec<f32> {
        self.buffer.data.clone()
    }

    /// Returns the bands of pixel `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Result<&[f32]> {
        if x >= self.width() || y >= self.height() {
            return Err(Error::out_of_bounds(x, y, self.width(), self.height()));
        }
        let bands = self.bands() as usize;
        let offset = (y as usize * self.width() as usize + x as usize) * bands;
        Ok(&self.buffer.data[offset..offset + bands])
    }

    /// Checks that `other` has the same width, height and band count.
    pub fn ensure_same_geometry(&self, other: &Image) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(Error::geometry_mismatch(self.dimensions(), other.dimensions()));
        }
        Ok(())
    }

    /// Current file format (used when saving).
    #[inline]
    pub fn format(&self) -> ImageType {
        self.format
    }

    /// File format the image was originally decoded from.
    #[inline]
    pub fn original_format(&self) -> ImageType {
        self.original_format
    }

    /// Returns the handle with both formats replaced.
    #[must_use]
    pub fn with_formats(mut self, format: ImageType, original_format: ImageType) -> Self {
        self.format = format;
        self.original_format = original_format;
        self
    }

    /// Returns the handle with formats copied from `source`.
    #[must_use]
    pub fn with_formats_of(self, source: &Image) -> Self {
        self.with_formats(source.format, source.original_format)
    }

    /// Identity of the underlying buffer.
    #[inline]
    pub fn id(&self) -> ImageId {
        ImageId(Arc::as_ptr(&self.buffer) as usize)
    }

    /// Number of live handles sharing this buffer.
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.buffer)
    }

    /// Returns `true` if both handles alias the same buffer.
    #[inline]
    pub fn same_buffer(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Returns `true` if the buffer is accounted by a resource tracker.
    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.buffer.lease.is_some()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("bands", &self.bands())
            .field("format", &self.format)
            .field("original_format", &self.original_format)
            .field("refs", &self.ref_count())
            .finish()
    }
}
