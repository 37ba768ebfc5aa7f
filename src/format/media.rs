/// Media kinds, physical geometry and filesystem layout presets

use crate::format::constants::{DENSITY_DOUBLE, DENSITY_SINGLE};

/// The five historical media sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Two-sided double density, 40 cylinders
    TwoD,
    /// Two-sided double density double track, 80 cylinders
    TwoDD,
    /// Two-sided high density, 77 cylinders
    TwoHD,
    /// Single-sided single density, 40 cylinders
    OneD,
    /// Single-sided double density double track, 80 cylinders
    OneDD,
}

impl MediaKind {
    /// All media kinds in media-code order
    pub const ALL: [MediaKind; 5] = [
        MediaKind::TwoD,
        MediaKind::TwoDD,
        MediaKind::TwoHD,
        MediaKind::OneD,
        MediaKind::OneDD,
    ];

    /// Media-type byte as stored in a D88 header
    pub fn code(&self) -> u8 {
        match self {
            MediaKind::TwoD => 0x00,
            MediaKind::TwoDD => 0x10,
            MediaKind::TwoHD => 0x20,
            MediaKind::OneD => 0x30,
            MediaKind::OneDD => 0x40,
        }
    }

    /// Parse a D88 media-type byte
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.code() == code)
    }

    /// Short name ("2D", "2HD", ...)
    pub fn name(&self) -> &'static str {
        match self {
            MediaKind::TwoD => "2D",
            MediaKind::TwoDD => "2DD",
            MediaKind::TwoHD => "2HD",
            MediaKind::OneD => "1D",
            MediaKind::OneDD => "1DD",
        }
    }

    /// Parse a short name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    /// Number of heads
    pub fn sides(&self) -> u8 {
        match self {
            MediaKind::OneD | MediaKind::OneDD => 1,
            _ => 2,
        }
    }

    /// Physical geometry for this media
    pub fn geometry(&self) -> Geometry {
        Geometry::for_media(*self)
    }

    /// Filesystem layout for this media
    pub fn layout(&self) -> FsLayout {
        FsLayout::for_media(*self)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Physical disk geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Media kind this geometry belongs to
    pub media: MediaKind,
    /// Number of cylinders
    pub cylinders: u8,
    /// Number of sides (1 or 2)
    pub sides: u8,
    /// Sectors per track
    pub sectors_per_track: u16,
    /// Sector size in bytes
    pub sector_size: u16,
    /// Density byte written into sector headers
    pub density: u8,
}

impl Geometry {
    /// Geometry preset for a media kind
    pub fn for_media(media: MediaKind) -> Self {
        let (cylinders, sectors_per_track, density) = match media {
            MediaKind::TwoD => (40, 16, DENSITY_DOUBLE),
            MediaKind::TwoDD => (80, 16, DENSITY_DOUBLE),
            MediaKind::TwoHD => (77, 26, DENSITY_DOUBLE),
            MediaKind::OneD => (40, 16, DENSITY_SINGLE),
            MediaKind::OneDD => (80, 16, DENSITY_DOUBLE),
        };
        Self {
            media,
            cylinders,
            sides: media.sides(),
            sectors_per_track,
            sector_size: 256,
            density,
        }
    }

    /// Total number of logical tracks (cylinders × sides)
    pub fn tracks_total(&self) -> usize {
        self.cylinders as usize * self.sides as usize
    }

    /// Total number of sectors
    pub fn total_sectors(&self) -> usize {
        self.tracks_total() * self.sectors_per_track as usize
    }

    /// Bytes per track
    pub fn track_size(&self) -> usize {
        self.sectors_per_track as usize * self.sector_size as usize
    }

    /// Total capacity in bytes
    pub fn total_capacity(&self) -> usize {
        self.total_sectors() * self.sector_size as usize
    }

    /// Cylinder and side of a logical track
    pub fn track_address(&self, track: usize) -> (u8, u8) {
        let sides = self.sides.max(1) as usize;
        ((track / sides) as u8, (track % sides) as u8)
    }

    /// Logical track of a cylinder and side
    pub fn logical_track(&self, cylinder: u8, side: u8) -> usize {
        cylinder as usize * self.sides.max(1) as usize + side as usize
    }
}

/// Filesystem layout on a volume: where the allocation table and root directory live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsLayout {
    /// Sectors per cluster
    pub cluster_sectors: u16,
    /// Number of clusters tracked by the allocation table
    pub max_cluster: u16,
    /// Absolute sector of the allocation table (low plane)
    pub fat_sector: usize,
    /// Absolute sector of the root directory
    pub dir_sector: usize,
}

impl FsLayout {
    /// Layout preset for a media kind
    pub fn for_media(media: MediaKind) -> Self {
        match media {
            MediaKind::TwoD => Self::new(16, 80, 14, 16),
            MediaKind::TwoDD => Self::new(16, 160, 14, 16),
            MediaKind::TwoHD => Self::new(16, 250, 28, 32),
            MediaKind::OneD => Self::new(8, 80, 14, 16),
            MediaKind::OneDD => Self::new(16, 80, 14, 16),
        }
    }

    /// Create a layout
    pub fn new(cluster_sectors: u16, max_cluster: u16, fat_sector: usize, dir_sector: usize) -> Self {
        Self {
            cluster_sectors,
            max_cluster,
            fat_sector,
            dir_sector,
        }
    }

    /// True when the allocation table uses two byte planes
    pub fn is_wide(&self) -> bool {
        self.max_cluster >= 128
    }

    /// Cluster holding the root directory
    pub fn dir_cluster(&self) -> u16 {
        (self.dir_sector / self.cluster_sectors as usize) as u16
    }

    /// Clusters reserved for the boot area, allocation table and root directory
    pub fn reserved_clusters(&self) -> u16 {
        self.dir_cluster() + 1
    }

    /// Number of sectors reachable through clusters
    pub fn data_sectors(&self) -> usize {
        self.max_cluster as usize * self.cluster_sectors as usize
    }

    /// First absolute sector of a cluster
    pub fn cluster_to_sector(&self, cluster: u16) -> usize {
        cluster as usize * self.cluster_sectors as usize
    }

    /// Bytes in one cluster for a given sector size
    pub fn cluster_size(&self, sector_size: u16) -> usize {
        self.cluster_sectors as usize * sector_size as usize
    }
}
