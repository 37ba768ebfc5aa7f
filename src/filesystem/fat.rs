/// Cluster allocation table
///
/// One entry per cluster, stored in the allocation sector of the volume:
/// - `0x00` free
/// - `0x01..=0x7F` next cluster in the chain
/// - `0x80..=0x8F` last cluster, `(value & 0x0F) + 1` sectors in use
///
/// Volumes with 128 or more clusters keep a second byte plane in the sector
/// after the first one. A pointer is then `(plane1 << 7) | (plane0 & 0x7F)`;
/// bit 7 of plane 0 still flags the terminal entry.

use crate::error::{SosError, SosResult};
use crate::format::FsLayout;
use crate::image::DiskVolume;
use log::{debug, warn};

const TERMINAL_FLAG: u8 = 0x80;
const SECTOR_COUNT_MASK: u8 = 0x0F;

/// Filler for plane-0 bytes beyond the last cluster
pub const UNUSED_ENTRY: u8 = 0x8F;

/// Decoded allocation table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainLink {
    /// Cluster is not allocated
    Free,
    /// Cluster continues at the given cluster
    Next(u16),
    /// Cluster ends its chain using this many sectors
    Last {
        /// Sectors used in the final cluster (1..=16)
        sectors: u16,
    },
}

/// One cluster of a chain with the number of its sectors holding data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainCluster {
    /// Cluster index
    pub cluster: u16,
    /// Sectors of the cluster that belong to the file
    pub sectors: u16,
}

/// Allocation table view over a volume's reserved sectors
#[derive(Debug, Clone, Copy)]
pub struct AllocationTable {
    layout: FsLayout,
}

impl AllocationTable {
    /// Create a table for a filesystem layout
    pub fn new(layout: FsLayout) -> Self {
        Self { layout }
    }

    /// Layout this table was built for
    pub fn layout(&self) -> &FsLayout {
        &self.layout
    }

    fn check_cluster(&self, cluster: u16) -> SosResult<usize> {
        if cluster >= self.layout.max_cluster {
            return Err(SosError::BadAllocationTable);
        }
        Ok(cluster as usize)
    }

    fn plane_byte(&self, volume: &DiskVolume, sector: usize, index: usize) -> SosResult<u8> {
        volume
            .read_sector(sector)?
            .get(index)
            .copied()
            .ok_or(SosError::BadAllocationTable)
    }

    fn set_plane_byte(
        &self,
        volume: &mut DiskVolume,
        sector: usize,
        index: usize,
        value: u8,
    ) -> SosResult<()> {
        let byte = volume
            .get_sector_for_write(sector)?
            .data_mut()
            .get_mut(index)
            .ok_or(SosError::BadAllocationTable)?;
        *byte = value;
        Ok(())
    }

    fn planes(&self, volume: &DiskVolume, cluster: u16) -> SosResult<(u8, u8)> {
        let index = self.check_cluster(cluster)?;
        let low = self.plane_byte(volume, self.layout.fat_sector, index)?;
        let high = if self.layout.is_wide() {
            self.plane_byte(volume, self.layout.fat_sector + 1, index)?
        } else {
            0
        };
        Ok((low, high))
    }

    /// Raw entry value
    ///
    /// Terminal entries come back as the plane-0 byte (`0x80..=0x8F`).
    /// Narrow tables only ever yield 7-bit pointers.
    pub fn chain_value(&self, volume: &DiskVolume, cluster: u16) -> SosResult<u16> {
        let (low, high) = self.planes(volume, cluster)?;
        if low & TERMINAL_FLAG != 0 {
            return Ok(low as u16);
        }
        if self.layout.is_wide() {
            Ok(((high as u16) << 7) | (low & 0x7F) as u16)
        } else {
            Ok((low & 0x7F) as u16)
        }
    }

    /// Decoded entry
    pub fn link(&self, volume: &DiskVolume, cluster: u16) -> SosResult<ChainLink> {
        let (low, _) = self.planes(volume, cluster)?;
        if low & TERMINAL_FLAG != 0 {
            return Ok(ChainLink::Last {
                sectors: (low & SECTOR_COUNT_MASK) as u16 + 1,
            });
        }
        match self.chain_value(volume, cluster)? {
            0 => Ok(ChainLink::Free),
            next => Ok(ChainLink::Next(next)),
        }
    }

    /// Check whether a cluster is unallocated
    pub fn is_free(&self, volume: &DiskVolume, cluster: u16) -> SosResult<bool> {
        let (low, high) = self.planes(volume, cluster)?;
        Ok(low == 0 && high == 0)
    }

    /// Write an entry
    ///
    /// For a terminal entry `value` is the used sector count minus one.
    pub fn set_chain_link(
        &self,
        volume: &mut DiskVolume,
        cluster: u16,
        value: u16,
        is_last: bool,
    ) -> SosResult<()> {
        let index = self.check_cluster(cluster)?;
        let (low, high) = if is_last {
            (TERMINAL_FLAG | (value as u8 & SECTOR_COUNT_MASK), 0)
        } else {
            ((value & 0x7F) as u8, (value >> 7) as u8)
        };

        self.set_plane_byte(volume, self.layout.fat_sector, index, low)?;
        if self.layout.is_wide() {
            self.set_plane_byte(volume, self.layout.fat_sector + 1, index, high)?;
        }
        Ok(())
    }

    /// Mark a cluster as the last of its chain with `sectors` sectors in use
    pub fn set_last(&self, volume: &mut DiskVolume, cluster: u16, sectors: u16) -> SosResult<()> {
        self.set_chain_link(volume, cluster, sectors.saturating_sub(1), true)
    }

    fn clear(&self, volume: &mut DiskVolume, cluster: u16) -> SosResult<()> {
        self.set_chain_link(volume, cluster, 0, false)
    }

    /// The `skip`-th free cluster (1-based), scanning from cluster 0
    pub fn find_free_cluster(&self, volume: &DiskVolume, skip: usize) -> SosResult<Option<u16>> {
        let mut remaining = skip.max(1);
        for cluster in 0..self.layout.max_cluster {
            if self.is_free(volume, cluster)? {
                remaining -= 1;
                if remaining == 0 {
                    return Ok(Some(cluster));
                }
            }
        }
        Ok(None)
    }

    /// Start of the first run of `length` consecutive free clusters
    pub fn find_free_run(&self, volume: &DiskVolume, length: usize) -> SosResult<Option<u16>> {
        let length = length.max(1);
        let mut run_start = 0u16;
        let mut run_len = 0usize;
        for cluster in 0..self.layout.max_cluster {
            if self.is_free(volume, cluster)? {
                if run_len == 0 {
                    run_start = cluster;
                }
                run_len += 1;
                if run_len == length {
                    return Ok(Some(run_start));
                }
            } else {
                run_len = 0;
            }
        }
        Ok(None)
    }

    /// Number of unallocated clusters
    pub fn count_free(&self, volume: &DiskVolume) -> SosResult<usize> {
        let mut free = 0;
        for cluster in 0..self.layout.max_cluster {
            if self.is_free(volume, cluster)? {
                free += 1;
            }
        }
        Ok(free)
    }

    /// Walk a chain from `start`
    pub fn chain<'v>(&self, volume: &'v DiskVolume, start: u16) -> Chain<'v> {
        Chain {
            table: *self,
            volume,
            next: Some(start),
            steps: 0,
        }
    }

    /// Free every cluster of the chain starting at `start` and zero its sectors
    ///
    /// Returns the number of clusters released. A chain that starts on a free
    /// cluster is already released and yields 0.
    pub fn release_chain(&self, volume: &mut DiskVolume, start: u16) -> SosResult<usize> {
        let span = self.layout.cluster_sectors as usize;
        let mut cluster = start;
        let mut released = 0usize;

        loop {
            if cluster < self.layout.reserved_clusters() {
                warn!("Refusing to release reserved cluster {}", cluster);
                return Err(SosError::BadAllocationTable);
            }
            let link = self.link(volume, cluster)?;
            if link == ChainLink::Free {
                break;
            }

            self.clear(volume, cluster)?;
            let first = self.layout.cluster_to_sector(cluster);
            for sector in first..first + span {
                volume.get_sector_for_write(sector)?.fill(0);
            }
            released += 1;

            match link {
                ChainLink::Next(next) if released < self.layout.max_cluster as usize => {
                    cluster = next;
                }
                ChainLink::Next(next) => {
                    warn!("Chain from cluster {} does not terminate (at {})", start, next);
                    return Err(SosError::BadAllocationTable);
                }
                _ => break,
            }
        }

        debug!("Released {} clusters from cluster {}", released, start);
        Ok(released)
    }

    /// Write an empty table: reserved clusters chained and allocated, all
    /// other clusters free
    pub fn initialize(&self, volume: &mut DiskVolume) -> SosResult<()> {
        let max = self.layout.max_cluster as usize;
        {
            let low = volume.get_sector_for_write(self.layout.fat_sector)?.data_mut();
            low.fill(0);
            for byte in low.iter_mut().skip(max) {
                *byte = UNUSED_ENTRY;
            }
        }
        if self.layout.is_wide() {
            volume.get_sector_for_write(self.layout.fat_sector + 1)?.fill(0);
        }

        let last = self.layout.dir_cluster();
        for cluster in 0..last {
            self.set_chain_link(volume, cluster, cluster + 1, false)?;
        }
        self.set_last(volume, last, self.layout.cluster_sectors)?;
        Ok(())
    }
}

/// Iterator over the clusters of one chain
///
/// Yields `Err(BadAllocationTable)` once and then stops when the chain points
/// outside the table, at a free cluster, or runs longer than the table.
pub struct Chain<'v> {
    table: AllocationTable,
    volume: &'v DiskVolume,
    next: Option<u16>,
    steps: usize,
}

impl Iterator for Chain<'_> {
    type Item = SosResult<ChainCluster>;

    fn next(&mut self) -> Option<Self::Item> {
        let cluster = self.next.take()?;
        let layout = self.table.layout;

        self.steps += 1;
        if self.steps > layout.max_cluster as usize {
            warn!("Cluster chain loops at cluster {}", cluster);
            return Some(Err(SosError::BadAllocationTable));
        }

        let link = match self.table.link(self.volume, cluster) {
            Ok(link) => link,
            Err(e) => {
                warn!("Cluster chain points outside the table: {}", cluster);
                return Some(Err(e));
            }
        };

        match link {
            ChainLink::Free => {
                warn!("Cluster chain reaches free cluster {}", cluster);
                Some(Err(SosError::BadAllocationTable))
            }
            ChainLink::Next(next) => {
                self.next = Some(next);
                Some(Ok(ChainCluster {
                    cluster,
                    sectors: layout.cluster_sectors,
                }))
            }
            ChainLink::Last { sectors } => Some(Ok(ChainCluster {
                cluster,
                sectors: sectors.min(layout.cluster_sectors),
            })),
        }
    }
}
