/// Image codecs translating between byte streams and sector stores

/// D88 container codec
pub mod d88;
/// Raw (headerless) container codec
pub mod raw;

use crate::error::Result;
use crate::format::{ImageFormat, MediaKind, D88_HEADER_SIZE};
use crate::image::{Sector, SectorStore};

/// Volume metadata carried by a container header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHeader {
    /// Volume name bytes (at most 16, no terminator)
    pub name: Vec<u8>,
    /// Write-protect flag
    pub write_protected: bool,
    /// Media kind
    pub media: MediaKind,
    /// Size of the container header in bytes (0 for raw images)
    pub header_size: usize,
}

impl VolumeHeader {
    /// Header for a fresh volume of the given media in the given container
    pub fn new(media: MediaKind, format: ImageFormat) -> Self {
        Self {
            name: Vec::new(),
            write_protected: false,
            media,
            header_size: if format.has_header() { D88_HEADER_SIZE } else { 0 },
        }
    }

    /// Volume name as text
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).to_string()
    }
}

/// Result of decoding an image stream
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Header metadata
    pub header: VolumeHeader,
    /// Decoded sectors with stream offsets recorded
    pub store: SectorStore,
}

impl ImageFormat {
    /// Decode a complete image stream
    ///
    /// Any structural violation fails the whole decode; no partial store is returned.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
        match self {
            ImageFormat::D88 => d88::decode(data),
            ImageFormat::Raw(media) => raw::decode(data, *media),
        }
    }

    /// Encode a complete image stream, recording each sector's new stream offset
    pub fn encode(&self, header: &mut VolumeHeader, store: &mut SectorStore) -> Result<Vec<u8>> {
        match self {
            ImageFormat::D88 => d88::encode(header, store),
            ImageFormat::Raw(_) => raw::encode(header, store),
        }
    }

    /// Bytes of one sector's record as laid out in the stream
    pub fn sector_record(&self, sector: &Sector) -> Vec<u8> {
        match self {
            ImageFormat::D88 => d88::sector_record(sector),
            ImageFormat::Raw(_) => sector.data().to_vec(),
        }
    }
}
