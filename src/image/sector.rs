/// Sector data structures

use crate::format::constants::{fdc_size_to_bytes, DENSITY_DOUBLE};

/// Sector ID (CHRN) - addressing information for a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorId {
    /// C - Cylinder number
    pub cylinder: u8,
    /// H - Head/Side number
    pub side: u8,
    /// R - Sector number, 1-based within the track
    pub sector: u8,
    /// N - Size code (0=128, 1=256, 2=512, 3=1024, etc.)
    pub size_code: u8,
}

impl SectorId {
    /// Create a new sector ID
    pub fn new(cylinder: u8, side: u8, sector: u8, size_code: u8) -> Self {
        Self {
            cylinder,
            side,
            sector,
            size_code,
        }
    }

    /// Get the advertised sector size in bytes based on size code
    pub fn size_bytes(&self) -> usize {
        fdc_size_to_bytes(self.size_code)
    }
}

/// Sector status classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorStatus {
    /// Unformatted - data size is 0
    Unformatted,
    /// Formatted but contains only the fill byte
    Blank,
    /// Formatted and contains data (in use)
    InUse,
}

impl std::fmt::Display for SectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectorStatus::Unformatted => write!(f, "Unformatted"),
            SectorStatus::Blank => write!(f, "Blank"),
            SectorStatus::InUse => write!(f, "In Use"),
        }
    }
}

/// A disk sector containing data and metadata
#[derive(Debug, Clone)]
pub struct Sector {
    /// Sector addressing information (CHRN)
    pub id: SectorId,
    /// Sector count advertised by this sector's track
    pub sectors_in_track: u16,
    /// Density byte (0x00 double, 0x40 single)
    pub density: u8,
    /// Deleted data mark
    pub deleted: bool,
    /// FDC status byte recorded for this sector
    pub status: u8,
    /// Sector payload; its length is the declared data size
    data: Vec<u8>,
    /// Modified since the last read or write of the image
    dirty: bool,
    /// Position of this sector's record in the last stream it was read from or written to
    stream_offset: Option<usize>,
}

impl Sector {
    /// Create a new sector filled with `fill`, sized from the ID's size code
    pub fn new(id: SectorId, sectors_in_track: u16, fill: u8) -> Self {
        let size = id.size_bytes();
        Self {
            id,
            sectors_in_track,
            density: DENSITY_DOUBLE,
            deleted: false,
            status: 0,
            data: vec![fill; size],
            dirty: false,
            stream_offset: None,
        }
    }

    /// Create a new sector with specific data
    pub fn with_data(id: SectorId, sectors_in_track: u16, data: Vec<u8>) -> Self {
        Self {
            id,
            sectors_in_track,
            density: DENSITY_DOUBLE,
            deleted: false,
            status: 0,
            data,
            dirty: false,
            stream_offset: None,
        }
    }

    /// Set the density byte
    pub fn with_density(mut self, density: u8) -> Self {
        self.density = density;
        self
    }

    /// Get a reference to the sector data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the sector data
    ///
    /// The length stays fixed; payload size is part of the image layout.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Declared payload size
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Copy `bytes` into the start of the payload, zero-filling the rest
    pub fn write_padded(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(self.data.len());
        self.data[..len].copy_from_slice(&bytes[..len]);
        self.data[len..].fill(0);
    }

    /// Fill the sector with a specific byte value
    pub fn fill(&mut self, byte: u8) {
        self.data.fill(byte);
    }

    /// Check whether the sector was modified since the last image read/write
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flag the sector as modified
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clear the modified flag
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Position of this sector's record in its backing stream, if known
    pub fn stream_offset(&self) -> Option<usize> {
        self.stream_offset
    }

    /// Record where this sector lives in its backing stream
    pub fn set_stream_offset(&mut self, offset: Option<usize>) {
        self.stream_offset = offset;
    }

    /// Analyze the sector status based on data content
    pub fn classify(&self, fill_byte: u8) -> SectorStatus {
        if self.data.is_empty() {
            SectorStatus::Unformatted
        } else if self.data.iter().all(|&b| b == fill_byte) {
            SectorStatus::Blank
        } else {
            SectorStatus::InUse
        }
    }
}
