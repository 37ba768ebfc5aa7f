/// S-OS filesystem: allocation table, directories and file operations

/// Directory records and directory storage
pub mod directory;
/// File-level driver
pub mod driver;
/// Cluster allocation table
pub mod fat;

pub use directory::{
    DirEntry, DirSlot, DirectoryEntryStore, DirectoryRecord, FileMode, FileName, Timestamp,
};
pub use driver::{AllocationPolicy, DriverOptions, FileSystemDriver};
pub use fat::{AllocationTable, ChainCluster, ChainLink};

/// Filesystem information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemInfo {
    /// Filesystem type name
    pub fs_type: String,
    /// Clusters tracked by the allocation table
    pub total_clusters: usize,
    /// Clusters taken by the boot area, table and root directory
    pub reserved_clusters: usize,
    /// Free clusters
    pub free_clusters: usize,
    /// Cluster size in bytes
    pub cluster_size: usize,
}

impl FileSystemInfo {
    /// Free space in bytes
    pub fn free_bytes(&self) -> usize {
        self.free_clusters * self.cluster_size
    }
}
