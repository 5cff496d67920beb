//! File format metadata carried by image handles.
//!
//! An [`Image`](crate::Image) remembers two formats:
//! - the *current* format, used when the image is eventually saved
//! - the *original* format, the one it was decoded from
//!
//! Neither is interpreted by the graph layer; both are propagated from a
//! pipeline's input image to its output.
//!
//! # Usage
//!
//! ```rust
//! use vfx_core::ImageType;
//!
//! assert_eq!(ImageType::from_extension("JPG"), ImageType::Jpeg);
//! assert_eq!(ImageType::Exr.name(), "exr");
//! ```

use std::fmt;

/// Image file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    /// Unknown or in-memory only.
    #[default]
    Unknown,
    /// JPEG.
    Jpeg,
    /// PNG.
    Png,
    /// WebP.
    Webp,
    /// TIFF.
    Tiff,
    /// GIF.
    Gif,
    /// HEIF / HEIC.
    Heif,
    /// AVIF.
    Avif,
    /// OpenEXR.
    Exr,
    /// DPX.
    Dpx,
    /// Radiance HDR.
    Hdr,
}

impl ImageType {
    /// All known formats except [`ImageType::Unknown`].
    pub const ALL: [ImageType; 10] = [
        Self::Jpeg,
        Self::Png,
        Self::Webp,
        Self::Tiff,
        Self::Gif,
        Self::Heif,
        Self::Avif,
        Self::Exr,
        Self::Dpx,
        Self::Hdr,
    ];

    /// Short lowercase name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
            Self::Heif => "heif",
            Self::Avif => "avif",
            Self::Exr => "exr",
            Self::Dpx => "dpx",
            Self::Hdr => "hdr",
        }
    }

    /// File extensions without dots.
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Unknown => &[],
            Self::Jpeg => &["jpg", "jpeg", "jpe"],
            Self::Png => &["png"],
            Self::Webp => &["webp"],
            Self::Tiff => &["tif", "tiff"],
            Self::Gif => &["gif"],
            Self::Heif => &["heif", "heic"],
            Self::Avif => &["avif"],
            Self::Exr => &["exr"],
            Self::Dpx => &["dpx"],
            Self::Hdr => &["hdr"],
        }
    }

    /// Looks up a format by file extension (case-insensitive, dot optional).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.extensions().contains(&ext.as_str()))
            .unwrap_or(Self::Unknown)
    }

    /// Returns `true` unless this is [`ImageType::Unknown`].
    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(ImageType::from_extension("jpeg"), ImageType::Jpeg);
        assert_eq!(ImageType::from_extension(".TIF"), ImageType::Tiff);
        assert_eq!(ImageType::from_extension("heic"), ImageType::Heif);
        assert_eq!(ImageType::from_extension("xyz"), ImageType::Unknown);
    }

    #[test]
    fn test_names_round_trip_through_extensions() {
        for t in ImageType::ALL {
            assert!(t.is_known());
            assert_eq!(ImageType::from_extension(t.extensions()[0]), t);
        }
        assert!(!ImageType::default().is_known());
    }
}
