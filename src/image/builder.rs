/// Builder for creating formatted volumes

use crate::error::Result;
use crate::format::{Geometry, ImageFormat, MediaKind, DEFAULT_FILL_BYTE};
use crate::image::DiskVolume;
use crate::io::raw;

/// Builder for constructing blank, formatted volumes
pub struct VolumeBuilder {
    media: MediaKind,
    format: ImageFormat,
    fill_byte: u8,
    name: Vec<u8>,
    write_protected: bool,
}

impl VolumeBuilder {
    /// Create a new builder with default values (2D media in a D88 container)
    pub fn new() -> Self {
        Self {
            media: MediaKind::TwoD,
            format: ImageFormat::D88,
            fill_byte: DEFAULT_FILL_BYTE,
            name: Vec::new(),
            write_protected: false,
        }
    }

    /// Set the media kind
    pub fn media(mut self, media: MediaKind) -> Self {
        self.media = media;
        self
    }

    /// Set the container format
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the byte every sector is filled with
    pub fn fill_byte(mut self, fill_byte: u8) -> Self {
        self.fill_byte = fill_byte;
        self
    }

    /// Set the volume name
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.as_bytes().iter().copied().take(16).collect();
        self
    }

    /// Set the write-protect flag
    pub fn write_protected(mut self, write_protected: bool) -> Self {
        self.write_protected = write_protected;
        self
    }

    /// Build the volume with the specified configuration
    pub fn build(self) -> Result<DiskVolume> {
        let format = match self.format {
            ImageFormat::Raw(_) => {
                raw::check_media(self.media)?;
                ImageFormat::Raw(self.media)
            }
            ImageFormat::D88 => ImageFormat::D88,
        };

        let mut volume = DiskVolume::blank(self.media, format);
        volume.format(Geometry::for_media(self.media), self.fill_byte);
        volume.header.name = self.name;
        volume.header.write_protected = self.write_protected;
        Ok(volume)
    }
}

impl Default for VolumeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiskError;

    #[test]
    fn test_builder_default() {
        let volume = VolumeBuilder::new().build().unwrap();
        assert_eq!(volume.image_format(), ImageFormat::D88);
        assert_eq!(volume.media(), MediaKind::TwoD);
        assert_eq!(volume.store().track_count(), 80);
    }

    #[test]
    fn test_builder_custom() {
        let volume = VolumeBuilder::new()
            .media(MediaKind::TwoHD)
            .fill_byte(0xE5)
            .name("WORK")
            .write_protected(true)
            .build()
            .unwrap();

        assert_eq!(volume.total_sectors(), 154 * 26);
        assert_eq!(volume.name(), "WORK");
        assert!(volume.is_write_protected());
        assert_eq!(volume.read_sector(0).unwrap()[0], 0xE5);
    }

    #[test]
    fn test_builder_raw_follows_media() {
        let volume = VolumeBuilder::new()
            .media(MediaKind::TwoDD)
            .format(ImageFormat::Raw(MediaKind::TwoD))
            .build()
            .unwrap();
        assert_eq!(volume.image_format(), ImageFormat::Raw(MediaKind::TwoDD));
    }

    #[test]
    fn test_builder_rejects_single_sided_raw() {
        let result = VolumeBuilder::new()
            .media(MediaKind::OneD)
            .format(ImageFormat::Raw(MediaKind::OneD))
            .build();
        assert!(matches!(result, Err(DiskError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_single_sided_sector_ids() {
        let volume = VolumeBuilder::new().media(MediaKind::OneD).build().unwrap();
        let sector = volume.get_sector_for_read(16 * 3 + 2).unwrap();
        assert_eq!(sector.id.cylinder, 3);
        assert_eq!(sector.id.side, 0);
        assert_eq!(sector.id.sector, 3);
        assert_eq!(sector.density, crate::format::DENSITY_SINGLE);
    }
}
