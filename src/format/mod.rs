/// Image container formats, media presets and constants

/// Format constants
pub mod constants;
/// Media kinds, geometry and filesystem layout presets
pub mod media;

pub use constants::*;
pub use media::{FsLayout, Geometry, MediaKind};

use std::path::Path;

/// Disk image container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Structured container with a header and per-sector headers
    D88,
    /// Headerless sector dump whose layout comes from the media kind
    Raw(MediaKind),
}

impl ImageFormat {
    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::D88 => "D88",
            ImageFormat::Raw(_) => "Raw",
        }
    }

    /// Check if this format carries its own header
    pub fn has_header(&self) -> bool {
        matches!(self, ImageFormat::D88)
    }

    /// Detect the container format from a file extension
    ///
    /// - `.d88`, `.d77`, `.88d` are D88 containers
    /// - `.2d`, `.2dd`, `.2hd` are raw dumps of the matching media
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        match ext.as_str() {
            "d88" | "d77" | "88d" => Some(ImageFormat::D88),
            "2d" => Some(ImageFormat::Raw(MediaKind::TwoD)),
            "2dd" => Some(ImageFormat::Raw(MediaKind::TwoDD)),
            "2hd" => Some(ImageFormat::Raw(MediaKind::TwoHD)),
            _ => None,
        }
    }

    /// Detect the container format from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageFormat::D88 => write!(f, "D88"),
            ImageFormat::Raw(media) => write!(f, "Raw {}", media),
        }
    }
}
