/*!
# sosdisk

A Rust library for reading and writing D88 and raw floppy images with S-OS
filesystem support.

## Features

- Read and write D88 containers and headerless raw sector dumps
- Sector store with per-sector dirty tracking; saves patch changed sectors in place
- S-OS allocation table and directory handling on 2D, 2DD, 2HD, 1D and 1DD media
- A disk service exposing the S-OS disk calls over up to four drives, with S-OS result codes

## Quick Start

```rust,no_run
use sosdisk::{DiskService, FileMode, FileName, ImageFormat, MediaKind, WriteRequest};

let mut service = DiskService::new();

// Mount an existing image on drive A
service.mount_path('A', "work.d88")?;

// List the root directory
for record in service.files('A', 16)? {
    println!("{} {} bytes", record.entry.name, record.entry.size);
}

// Read a file
let (entry, data) = service.read_file('A', 16, &FileName::parse("GAME.BIN"))?;

// Create a new disk on drive B and copy the file across
service.format('B', MediaKind::TwoD, ImageFormat::D88)?;
service.write_file('B', &WriteRequest {
    dir_sector: 16,
    name: entry.name,
    data: &data,
    load_addr: entry.load_addr,
    end_addr: entry.load_addr.wrapping_add(data.len() as u16).wrapping_sub(1),
    exec_addr: entry.exec_addr,
    mode: FileMode::binary(),
})?;
service.save('B', "copy.d88")?;
# Ok::<(), sosdisk::SosError>(())
```

## Modules

- `format`: container formats, media presets and constants
- `image`: volume data structures (DiskVolume, SectorStore, Track, Sector)
- `io`: D88 and raw codecs
- `filesystem`: allocation table, directory and file driver
- `service`: drive multiplexing and the S-OS disk call surface
- `error`: error types and Result aliases
*/

#![warn(missing_docs)]

/// Positional little-endian byte cursor
pub mod cursor;
/// Error types and Result aliases
pub mod error;
/// S-OS filesystem
pub mod filesystem;
/// Container formats, media presets and constants
pub mod format;
/// Volume data structures (DiskVolume, SectorStore, Track, Sector)
pub mod image;
/// Image codecs
pub mod io;
/// Sector and cluster map visualization
pub mod map;
/// Disk service over mounted drives
pub mod service;

// Re-export common types
pub use cursor::ByteCursor;
pub use error::{sos_code, DiskError, Result, SosError, SosResult};
pub use filesystem::{
    AllocationPolicy, AllocationTable, ChainCluster, ChainLink, DirEntry, DirSlot,
    DirectoryEntryStore, DirectoryRecord, DriverOptions, FileMode, FileName, FileSystemDriver,
    FileSystemInfo, Timestamp,
};
pub use format::{FsLayout, Geometry, ImageFormat, MediaKind};
pub use image::{
    DiskVolume, Sector, SectorId, SectorStatus, SectorStore, Track, VolumeBuilder, WriteMode,
};
pub use io::{DecodedImage, VolumeHeader};
pub use service::{DeviceLetter, DiskService, WriteRequest};
