/// D88 container layout and sector constants

/// Length of the volume name field, including its terminator
pub const D88_NAME_LENGTH: usize = 17;

/// Offset of the write-protect byte
pub const D88_WRITE_PROTECT_OFFSET: usize = 0x1A;

/// Offset of the media-type byte
pub const D88_MEDIA_OFFSET: usize = 0x1B;

/// Offset of the total image size (u32 LE)
pub const D88_DISK_SIZE_OFFSET: usize = 0x1C;

/// Offset of the track offset table
pub const D88_TRACK_TABLE_OFFSET: usize = 0x20;

/// Number of track offset slots in a full header
pub const D88_TRACK_SLOTS: usize = 164;

/// Size of a full D88 header (name, flags, size and 164 track slots)
pub const D88_HEADER_SIZE: usize = D88_TRACK_TABLE_OFFSET + D88_TRACK_SLOTS * 4;

/// Size of the per-sector header preceding each payload
pub const D88_SECTOR_HEADER_SIZE: usize = 16;

/// Offset of the payload size (u16 LE) inside a sector header
pub const D88_SECTOR_DATA_SIZE_OFFSET: usize = 0x0E;

/// Write-protect byte value for a protected volume
pub const D88_PROTECTED: u8 = 0x10;

/// Density byte for double density sectors
pub const DENSITY_DOUBLE: u8 = 0x00;

/// Density byte for single density sectors
pub const DENSITY_SINGLE: u8 = 0x40;

/// Deleted-data flag value in a sector header
pub const DELETED_DATA_MARK: u8 = 0x10;

/// Default payload byte for freshly formatted sectors
pub const DEFAULT_FILL_BYTE: u8 = 0x00;

/// FDC sector size code to actual byte size mapping
/// Index: size_code (0-7), Value: actual size in bytes
pub const FDC_SECTOR_SIZES: [usize; 8] = [
    128,    // 0
    256,    // 1
    512,    // 2
    1024,   // 3
    2048,   // 4
    4096,   // 5
    8192,   // 6
    16384,  // 7
];

/// Convert FDC size code to actual byte size
#[inline]
pub fn fdc_size_to_bytes(size_code: u8) -> usize {
    if size_code as usize >= FDC_SECTOR_SIZES.len() {
        // Invalid size code, return default
        256
    } else {
        FDC_SECTOR_SIZES[size_code as usize]
    }
}

/// Convert byte size to FDC size code
#[inline]
pub fn bytes_to_fdc_size(bytes: usize) -> Option<u8> {
    FDC_SECTOR_SIZES
        .iter()
        .position(|&size| size == bytes)
        .map(|code| code as u8)
}
