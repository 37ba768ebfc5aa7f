/// Disk volume data structures

/// Builder for creating volumes
pub mod builder;
/// Sector definition and status
pub mod sector;
/// Sector store addressed by absolute sector index
pub mod store;
/// Track definition
pub mod track;

pub use builder::VolumeBuilder;
pub use sector::{Sector, SectorId, SectorStatus};
pub use store::SectorStore;
pub use track::Track;

use crate::error::{DiskError, Result};
use crate::format::{FsLayout, Geometry, ImageFormat, MediaKind, D88_HEADER_SIZE};
use crate::io::VolumeHeader;
use log::{debug, info};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// How a call to [`DiskVolume::write_to`] updated the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The whole image was serialized from the start of the stream
    Rebuilt,
    /// Only runs of dirty sectors were rewritten in place
    Patched {
        /// Number of contiguous runs written
        runs: usize,
        /// Number of sectors written
        sectors: usize,
    },
}

/// A mounted disk volume: one sector store plus media geometry and metadata
#[derive(Debug, Clone)]
pub struct DiskVolume {
    /// Container format used for reads and writes
    pub(crate) format: ImageFormat,
    /// Header metadata
    pub(crate) header: VolumeHeader,
    /// Physical geometry
    pub(crate) geometry: Geometry,
    /// Sector store
    pub(crate) store: SectorStore,
    /// Header metadata changed since the last read/write
    pub(crate) header_dirty: bool,
    /// Original filename if loaded from disk
    pub(crate) filename: Option<String>,
}

impl DiskVolume {
    /// Open a D88 or raw image file from disk
    ///
    /// The container format is detected from the file extension.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let format = ImageFormat::from_path(&path).ok_or_else(|| {
            DiskError::invalid_format(format!(
                "Unknown image extension: {}",
                path.as_ref().display()
            ))
        })?;
        Self::open_as(path, format)
    }

    /// Open an image file with an explicit container format
    pub fn open_as<P: AsRef<Path>>(path: P, format: ImageFormat) -> Result<Self> {
        let data = std::fs::read(&path)?;
        let mut volume = Self::from_bytes(&data, format)?;
        volume.filename = path.as_ref().to_str().map(|s| s.to_string());
        info!("Opened {} image {}", format, path.as_ref().display());
        Ok(volume)
    }

    /// Decode a volume from an in-memory image
    pub fn from_bytes(data: &[u8], format: ImageFormat) -> Result<Self> {
        let media = match format {
            ImageFormat::Raw(media) => media,
            ImageFormat::D88 => MediaKind::TwoD,
        };
        let mut volume = Self::blank(media, format);
        volume.read(data)?;
        Ok(volume)
    }

    /// Create a new, formatted volume
    pub fn create(media: MediaKind, format: ImageFormat) -> Result<Self> {
        VolumeBuilder::new().media(media).format(format).build()
    }

    /// Create a new builder for constructing volumes
    pub fn builder() -> VolumeBuilder {
        VolumeBuilder::new()
    }

    pub(crate) fn blank(media: MediaKind, format: ImageFormat) -> Self {
        let geometry = Geometry::for_media(media);
        Self {
            format,
            header: VolumeHeader::new(media, format),
            geometry,
            store: SectorStore::new(geometry.sectors_per_track as usize),
            header_dirty: true,
            filename: None,
        }
    }

    /// Regenerate every sector with `fill`, track-major, sector numbers 1..N
    pub fn format(&mut self, geometry: Geometry, fill: u8) {
        let mut store = SectorStore::with_capacity(
            geometry.sectors_per_track as usize,
            geometry.tracks_total(),
        );
        for t in 0..geometry.tracks_total() {
            store.add_track(crate::io::raw::format_track(&geometry, t, fill));
        }
        self.geometry = geometry;
        self.header.media = geometry.media;
        self.store = store;
        self.header_dirty = true;
        info!("Formatted {} volume ({} sectors)", geometry.media, geometry.total_sectors());
    }

    /// Replace the volume contents by decoding `data` with the active format
    ///
    /// On failure the volume is left exactly as it was.
    pub fn read(&mut self, data: &[u8]) -> Result<()> {
        let decoded = self.format.decode(data)?;
        self.geometry = Geometry::for_media(decoded.header.media);
        self.header = decoded.header;
        self.store = decoded.store;
        self.header_dirty = false;
        Ok(())
    }

    /// Check whether the next write has to serialize the whole image
    ///
    /// Needed when the header changed, when a structured header has a
    /// non-default size, when nothing is known about the stream layout, or
    /// when a dirty sector lies beyond the last track with a known position.
    pub fn needs_rebuild(&self) -> bool {
        if self.header_dirty {
            return true;
        }
        if self.format.has_header() && self.header.header_size != D88_HEADER_SIZE {
            return true;
        }
        let Some(last_known) = self.store.last_known_track() else {
            return true;
        };
        if let Some(highest_dirty) = self.store.highest_dirty_track() {
            if last_known < highest_dirty {
                return true;
            }
        }
        self.store
            .sectors()
            .any(|s| s.is_dirty() && s.stream_offset().is_none())
    }

    /// Serialize the whole image
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let data = self.format.encode(&mut self.header, &mut self.store)?;
        self.store.clear_dirty();
        self.header_dirty = false;
        Ok(data)
    }

    /// Write the image to a stream that holds the previously read image
    ///
    /// When no rebuild is needed, clean sectors are skipped and each run of
    /// dirty sectors is rewritten in place. A rebuild writes from offset 0;
    /// the caller is responsible for truncating a longer stream.
    pub fn write_to<W: Write + Seek>(&mut self, stream: &mut W) -> Result<WriteMode> {
        if self.needs_rebuild() {
            let data = self.to_bytes()?;
            stream.seek(SeekFrom::Start(0))?;
            stream.write_all(&data)?;
            stream.flush()?;
            debug!("Rebuilt image ({} bytes)", data.len());
            return Ok(WriteMode::Rebuilt);
        }

        let mut runs: Vec<(usize, Vec<u8>)> = Vec::new();
        let mut sectors = 0usize;
        for sector in self.store.sectors().filter(|s| s.is_dirty()) {
            let Some(offset) = sector.stream_offset() else {
                continue;
            };
            let record = self.format.sector_record(sector);
            sectors += 1;
            match runs.last_mut() {
                Some((start, bytes)) if *start + bytes.len() == offset => {
                    bytes.extend_from_slice(&record);
                }
                _ => runs.push((offset, record)),
            }
        }

        for (offset, bytes) in &runs {
            stream.seek(SeekFrom::Start(*offset as u64))?;
            stream.write_all(bytes)?;
        }
        stream.flush()?;
        self.store.clear_dirty();
        debug!("Patched {} sectors in {} runs", sectors, runs.len());

        Ok(WriteMode::Patched {
            runs: runs.len(),
            sectors,
        })
    }

    /// Save the image to a file
    ///
    /// Saving back to the file the volume was read from patches it in place
    /// when possible; any other path gets a full image.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<WriteMode> {
        let same_file = self.filename.as_deref() == path.as_ref().to_str();
        let mode = if same_file && path.as_ref().exists() {
            let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
            let mode = self.write_to(&mut file)?;
            if mode == WriteMode::Rebuilt {
                let len = file.stream_position()?;
                file.set_len(len)?;
            }
            mode
        } else {
            let data = self.to_bytes()?;
            std::fs::write(&path, data)?;
            WriteMode::Rebuilt
        };
        self.filename = path.as_ref().to_str().map(|s| s.to_string());
        info!("Saved image to {}", path.as_ref().display());
        Ok(mode)
    }

    /// Get the container format
    pub fn image_format(&self) -> ImageFormat {
        self.format
    }

    /// Change the container format used by the next save
    pub fn set_image_format(&mut self, format: ImageFormat) {
        if format != self.format {
            self.format = format;
            self.header.header_size = if format.has_header() { D88_HEADER_SIZE } else { 0 };
            self.store.clear_offsets();
            self.header_dirty = true;
        }
    }

    /// Get the media kind
    pub fn media(&self) -> MediaKind {
        self.header.media
    }

    /// Get the physical geometry
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Get the filesystem layout preset for this media
    pub fn layout(&self) -> FsLayout {
        FsLayout::for_media(self.header.media)
    }

    /// Get the header metadata
    pub fn header(&self) -> &VolumeHeader {
        &self.header
    }

    /// Get the volume name
    pub fn name(&self) -> String {
        self.header.name_str()
    }

    /// Set the volume name (truncated to 16 bytes)
    pub fn set_name(&mut self, name: &[u8]) {
        self.header.name = name.iter().copied().take(16).collect();
        self.header_dirty = true;
    }

    /// Check the write-protect flag
    pub fn is_write_protected(&self) -> bool {
        self.header.write_protected
    }

    /// Set the write-protect flag
    pub fn set_write_protected(&mut self, protected: bool) {
        if self.header.write_protected != protected {
            self.header.write_protected = protected;
            self.header_dirty = true;
        }
    }

    /// Get the original filename if loaded from disk
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the sector store
    pub fn store(&self) -> &SectorStore {
        &self.store
    }

    /// Number of addressable sectors
    pub fn total_sectors(&self) -> usize {
        self.store.capacity()
    }

    /// Check if the volume has unsaved changes
    pub fn is_changed(&self) -> bool {
        self.header_dirty || self.store.is_dirty()
    }

    fn invalid_sector(&self, index: usize) -> DiskError {
        DiskError::InvalidSector {
            index,
            max: self.store.capacity().saturating_sub(1),
        }
    }

    /// Get a sector for reading
    pub fn get_sector_for_read(&self, index: usize) -> Result<&Sector> {
        self.store.get(index).ok_or_else(|| self.invalid_sector(index))
    }

    /// Get a sector for writing; the sector is flagged dirty
    pub fn get_sector_for_write(&mut self, index: usize) -> Result<&mut Sector> {
        let err = self.invalid_sector(index);
        let sector = self.store.get_mut(index).ok_or(err)?;
        sector.mark_dirty();
        Ok(sector)
    }

    /// Read sector data
    pub fn read_sector(&self, index: usize) -> Result<&[u8]> {
        Ok(self.get_sector_for_read(index)?.data())
    }

    /// Write sector data, zero-filling any part of the sector `data` does not cover
    pub fn write_sector(&mut self, index: usize, data: &[u8]) -> Result<()> {
        let sector = self.get_sector_for_write(index)?;
        sector.write_padded(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn d88_volume() -> DiskVolume {
        let mut volume = DiskVolume::create(MediaKind::TwoD, ImageFormat::D88).unwrap();
        let data = volume.to_bytes().unwrap();
        DiskVolume::from_bytes(&data, ImageFormat::D88).unwrap()
    }

    #[test]
    fn test_create_volume() {
        let volume = DiskVolume::create(MediaKind::TwoD, ImageFormat::D88).unwrap();
        assert_eq!(volume.media(), MediaKind::TwoD);
        assert_eq!(volume.total_sectors(), 1280);
        assert_eq!(volume.store().sector_count(), 1280);
        assert!(volume.is_changed());
        assert!(volume.needs_rebuild());
    }

    #[test]
    fn test_read_write_sector() {
        let mut volume = DiskVolume::create(MediaKind::TwoD, ImageFormat::D88).unwrap();
        volume.write_sector(100, &[0x42; 256]).unwrap();
        assert_eq!(volume.read_sector(100).unwrap(), &[0x42; 256][..]);
        assert!(volume.get_sector_for_read(100).unwrap().is_dirty());
    }

    #[test]
    fn test_invalid_sector() {
        let mut volume = DiskVolume::create(MediaKind::TwoD, ImageFormat::D88).unwrap();
        assert!(matches!(
            volume.read_sector(1280),
            Err(DiskError::InvalidSector { index: 1280, max: 1279 })
        ));
        assert!(volume.write_sector(5000, &[0; 256]).is_err());
    }

    #[test]
    fn test_read_for_read_does_not_dirty() {
        let volume = d88_volume();
        let _ = volume.get_sector_for_read(3).unwrap();
        assert!(!volume.is_changed());
    }

    #[test]
    fn test_d88_round_trip() {
        let mut volume = DiskVolume::create(MediaKind::TwoD, ImageFormat::D88).unwrap();
        volume.set_name(b"SOS DISK");
        volume.write_sector(17, &[0x5A; 256]).unwrap();
        let data = volume.to_bytes().unwrap();

        let reread = DiskVolume::from_bytes(&data, ImageFormat::D88).unwrap();
        assert_eq!(reread.name(), "SOS DISK");
        assert_eq!(reread.read_sector(17).unwrap(), &[0x5A; 256][..]);
        assert!(!reread.is_changed());
    }

    #[test]
    fn test_failed_read_keeps_volume() {
        let mut volume = d88_volume();
        volume.write_sector(0, &[0x11; 256]).unwrap();
        assert!(volume.read(&[0u8; 16]).is_err());
        assert_eq!(volume.read_sector(0).unwrap()[0], 0x11);
    }

    #[test]
    fn test_patch_single_sector() {
        let mut volume = d88_volume();
        let mut stream = Cursor::new(volume.clone().to_bytes().unwrap());
        assert!(!volume.needs_rebuild());

        volume.write_sector(20, &[0x77; 256]).unwrap();
        volume.write_sector(21, &[0x78; 256]).unwrap();
        volume.write_sector(40, &[0x79; 256]).unwrap();
        let mode = volume.write_to(&mut stream).unwrap();
        assert_eq!(mode, WriteMode::Patched { runs: 2, sectors: 3 });
        assert!(!volume.is_changed());

        let reread = DiskVolume::from_bytes(stream.get_ref(), ImageFormat::D88).unwrap();
        assert_eq!(reread.read_sector(20).unwrap()[0], 0x77);
        assert_eq!(reread.read_sector(21).unwrap()[0], 0x78);
        assert_eq!(reread.read_sector(40).unwrap()[0], 0x79);
    }

    #[test]
    fn test_rebuild_when_header_changes() {
        let mut volume = d88_volume();
        let mut stream = Cursor::new(volume.clone().to_bytes().unwrap());
        volume.set_write_protected(true);
        assert_eq!(volume.write_to(&mut stream).unwrap(), WriteMode::Rebuilt);

        let reread = DiskVolume::from_bytes(stream.get_ref(), ImageFormat::D88).unwrap();
        assert!(reread.is_write_protected());
    }

    #[test]
    fn test_rebuild_when_growing_past_known_tracks() {
        let geometry = Geometry::for_media(MediaKind::TwoD);
        let data = vec![0u8; geometry.track_size() * 10];
        let mut volume = DiskVolume::from_bytes(&data, ImageFormat::Raw(MediaKind::TwoD)).unwrap();
        let mut stream = Cursor::new(data);

        volume.write_sector(5, &[1; 256]).unwrap();
        assert!(!volume.needs_rebuild());

        volume.write_sector(16 * 20, &[2; 256]).unwrap();
        assert!(volume.needs_rebuild());
        assert_eq!(volume.write_to(&mut stream).unwrap(), WriteMode::Rebuilt);
        assert_eq!(stream.get_ref().len(), geometry.total_capacity());
        assert_eq!(stream.get_ref()[256 * 16 * 20], 2);
    }

    #[test]
    fn test_format_clears_layout() {
        let mut volume = d88_volume();
        volume.format(Geometry::for_media(MediaKind::TwoDD), 0xE5);
        assert_eq!(volume.media(), MediaKind::TwoDD);
        assert_eq!(volume.total_sectors(), 2560);
        assert_eq!(volume.read_sector(2559).unwrap()[0], 0xE5);
        assert!(volume.needs_rebuild());
    }
}
