/// File-level operations over the allocation table and directory

use crate::error::{SosError, SosResult};
use crate::filesystem::directory::{
    DirEntry, DirectoryEntryStore, DirectoryRecord, FileMode, FileName, Timestamp,
    DEFAULT_PASSWORD, MODE_DELETED, MODE_END,
};
use crate::filesystem::fat::AllocationTable;
use crate::filesystem::FileSystemInfo;
use crate::format::{FsLayout, ImageFormat, MediaKind};
use crate::image::{DiskVolume, VolumeBuilder};
use log::{debug, info, warn};

/// End-of-text marker in ASCII files
pub const ASCII_EOF: u8 = 0x1A;

/// Largest size the 16-bit size field can record
const MAX_RECORDED_SIZE: usize = 0xFFFF;

/// Cluster allocation strategy for new files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationPolicy {
    /// Take the first free cluster for each new cluster of the file
    #[default]
    FirstFit,
    /// Place the whole file in one run of consecutive clusters
    Contiguous,
}

/// Driver configuration
#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    /// Cluster allocation strategy
    pub allocation: AllocationPolicy,
    /// Source of entry timestamps
    pub clock: fn() -> Timestamp,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            allocation: AllocationPolicy::FirstFit,
            clock: Timestamp::now,
        }
    }
}

/// S-OS filesystem on one mounted volume
#[derive(Debug)]
pub struct FileSystemDriver {
    volume: DiskVolume,
    layout: FsLayout,
    fat: AllocationTable,
    options: DriverOptions,
}

impl FileSystemDriver {
    /// Wrap a volume using the layout of its media kind
    pub fn new(volume: DiskVolume) -> Self {
        Self::with_options(volume, DriverOptions::default())
    }

    /// Wrap a volume with explicit options
    pub fn with_options(volume: DiskVolume, options: DriverOptions) -> Self {
        let layout = volume.layout();
        Self {
            volume,
            layout,
            fat: AllocationTable::new(layout),
            options,
        }
    }

    /// Create a blank volume and write an empty filesystem onto it
    pub fn format(media: MediaKind, format: ImageFormat, options: DriverOptions) -> SosResult<Self> {
        let volume = VolumeBuilder::new().media(media).format(format).build()?;
        let mut driver = Self::with_options(volume, options);
        driver.initialize()?;
        info!("Created empty {} filesystem", media);
        Ok(driver)
    }

    /// Write an empty allocation table and root directory
    pub fn initialize(&mut self) -> SosResult<()> {
        self.check_writable()?;
        self.fat.initialize(&mut self.volume)?;
        self.root().initialize(&mut self.volume)?;
        Ok(())
    }

    /// Underlying volume
    pub fn volume(&self) -> &DiskVolume {
        &self.volume
    }

    /// Underlying volume, mutable
    pub fn volume_mut(&mut self) -> &mut DiskVolume {
        &mut self.volume
    }

    /// Release the volume
    pub fn into_volume(self) -> DiskVolume {
        self.volume
    }

    /// Filesystem layout in use
    pub fn layout(&self) -> &FsLayout {
        &self.layout
    }

    /// Allocation table
    pub fn allocation_table(&self) -> &AllocationTable {
        &self.fat
    }

    /// Driver options
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Root directory sector
    pub fn root_sector(&self) -> usize {
        self.layout.dir_sector
    }

    fn root(&self) -> DirectoryEntryStore {
        self.directory(self.layout.dir_sector)
    }

    /// Directory starting at `dir_sector`
    pub fn directory(&self, dir_sector: usize) -> DirectoryEntryStore {
        DirectoryEntryStore::new(dir_sector, self.layout.cluster_sectors as usize)
    }

    fn check_writable(&self) -> SosResult<()> {
        if self.volume.is_write_protected() {
            return Err(SosError::WriteProtected);
        }
        Ok(())
    }

    /// Live records of a directory
    pub fn files(&self, dir_sector: usize) -> SosResult<Vec<DirectoryRecord>> {
        self.directory(dir_sector).scan(&self.volume)
    }

    /// Find a record by name
    pub fn find(&self, dir_sector: usize, name: &FileName) -> SosResult<DirectoryRecord> {
        self.directory(dir_sector)
            .find_by_name(&self.volume, name)?
            .ok_or(SosError::FileNotFound)
    }

    /// Write a whole file, replacing any file of the same name
    ///
    /// When the disk fills up part way, the clusters written so far stay
    /// allocated and chained to the entry, the entry records the bytes
    /// actually stored and `DeviceFull` is returned.
    ///
    /// The deleted and end-of-directory mode bytes are not valid file modes.
    pub fn write_file(
        &mut self,
        dir_sector: usize,
        name: &FileName,
        data: &[u8],
        load_addr: u16,
        exec_addr: u16,
        mode: FileMode,
    ) -> SosResult<DirectoryRecord> {
        self.check_writable()?;
        if mode.0 == MODE_DELETED || mode.0 == MODE_END {
            return Err(SosError::BadFileMode);
        }
        let dir = self.directory(dir_sector);

        let slot = match dir.find_by_name(&self.volume, name)? {
            Some(existing) => {
                if existing.entry.mode.is_read_only() {
                    return Err(SosError::WriteProtected);
                }
                if existing.entry.mode.is_directory() {
                    return Err(SosError::BadFileMode);
                }
                self.delete_record(&dir, existing.clone())?;
                existing.slot
            }
            None => dir.allocate_slot(&self.volume)?.ok_or(SosError::DeviceFull)?,
        };

        let span = self.layout.cluster_sectors as usize;
        let sector_size = self.volume.geometry().sector_size as usize;
        let total_sectors = data.len().div_ceil(sector_size).max(1);
        let total_clusters = total_sectors.div_ceil(span);

        let head = match self.options.allocation {
            AllocationPolicy::FirstFit => self.fat.find_free_cluster(&self.volume, 1)?,
            AllocationPolicy::Contiguous => self.fat.find_free_run(&self.volume, total_clusters)?,
        }
        .ok_or(SosError::DeviceFull)?;

        let size = recorded_size(name, data.len());
        let mut record = DirectoryRecord {
            slot,
            entry: DirEntry {
                mode,
                name: *name,
                password: DEFAULT_PASSWORD,
                size,
                load_addr,
                exec_addr,
                timestamp: (self.options.clock)(),
                start_cluster: head as u32,
            },
        };

        self.fat.set_last(&mut self.volume, head, self.layout.cluster_sectors)?;
        dir.write_back(&mut self.volume, &record)?;
        debug!("Writing {} ({} bytes) from cluster {}", name, data.len(), head);

        let mut cluster = head;
        let mut written = 0usize;
        for index in 0..total_clusters {
            let used = (total_sectors - written).min(span);
            let first = self.layout.cluster_to_sector(cluster);
            for s in 0..span {
                let start = (written + s) * sector_size;
                let chunk = if s < used && start < data.len() {
                    &data[start..(start + sector_size).min(data.len())]
                } else {
                    &[][..]
                };
                self.volume.write_sector(first + s, chunk)?;
            }
            written += used;

            if index + 1 == total_clusters {
                self.fat.set_last(&mut self.volume, cluster, used as u16)?;
                break;
            }

            let next = match self.options.allocation {
                AllocationPolicy::FirstFit => self.fat.find_free_cluster(&self.volume, 1)?,
                AllocationPolicy::Contiguous => Some(cluster + 1),
            };
            let Some(next) = next else {
                warn!(
                    "Device full writing {}: kept {} of {} clusters",
                    name,
                    index + 1,
                    total_clusters
                );
                record.entry.size = recorded_size(name, (written * sector_size).min(data.len()));
                dir.write_back(&mut self.volume, &record)?;
                return Err(SosError::DeviceFull);
            };
            self.fat.set_chain_link(&mut self.volume, cluster, next, false)?;
            self.fat.set_last(&mut self.volume, next, self.layout.cluster_sectors)?;
            cluster = next;
        }

        Ok(record)
    }

    /// Read a whole file
    ///
    /// Text files end at the first 0x1A byte. Other files are cut at the
    /// recorded size unless it is 0, in which case every sector of the chain
    /// is returned. A broken chain ends the read with the data gathered so far.
    pub fn read_file(&self, entry: &DirEntry) -> SosResult<Vec<u8>> {
        if entry.mode.is_directory() {
            return Err(SosError::BadFileMode);
        }

        let size = entry.size as usize;
        let ascii = entry.mode.is_ascii();
        let mut out = Vec::with_capacity(size);

        for link in self.fat.chain(&self.volume, entry.start()?) {
            let link = match link {
                Ok(link) => link,
                Err(e) => {
                    warn!("Reading {} stopped after {} bytes: {}", entry.name, out.len(), e);
                    return Ok(out);
                }
            };

            let first = self.layout.cluster_to_sector(link.cluster);
            for s in 0..link.sectors as usize {
                let data = self.volume.read_sector(first + s)?;
                if ascii {
                    if let Some(end) = data.iter().position(|&b| b == ASCII_EOF) {
                        out.extend_from_slice(&data[..end]);
                        return Ok(out);
                    }
                }
                out.extend_from_slice(data);
                if size != 0 && out.len() >= size {
                    out.truncate(size);
                    return Ok(out);
                }
            }
        }

        Ok(out)
    }

    fn delete_record(&mut self, dir: &DirectoryEntryStore, mut record: DirectoryRecord) -> SosResult<()> {
        let start = record.entry.start()?;
        record.entry.mode = FileMode(MODE_DELETED);
        dir.write_back(&mut self.volume, &record)?;
        self.fat.release_chain(&mut self.volume, start)?;
        Ok(())
    }

    /// Delete a file and free its clusters
    pub fn delete_file(&mut self, record: &DirectoryRecord) -> SosResult<()> {
        self.check_writable()?;
        if record.entry.mode.is_read_only() {
            return Err(SosError::WriteProtected);
        }
        let dir = self.directory(record.slot.dir_sector);
        self.delete_record(&dir, record.clone())?;
        debug!("Deleted {}", record.entry.name);
        Ok(())
    }

    /// Rename a file in place
    pub fn rename(&mut self, record: &DirectoryRecord, new_name: &FileName) -> SosResult<DirectoryRecord> {
        self.check_writable()?;
        let dir = self.directory(record.slot.dir_sector);
        if dir.find_by_name(&self.volume, new_name)?.is_some() {
            return Err(SosError::FileAlreadyExists);
        }
        let mut renamed = record.clone();
        renamed.entry.name = *new_name;
        dir.write_back(&mut self.volume, &renamed)?;
        Ok(renamed)
    }

    /// Set or clear the read-only bit
    pub fn set_protect(&mut self, record: &DirectoryRecord, protect: bool) -> SosResult<DirectoryRecord> {
        if record.entry.mode.is_read_only() == protect {
            return Ok(record.clone());
        }
        self.check_writable()?;
        let mut updated = record.clone();
        updated.entry.mode = record.entry.mode.with_read_only(protect);
        self.directory(record.slot.dir_sector)
            .write_back(&mut self.volume, &updated)?;
        Ok(updated)
    }

    fn check_record(&self, index: usize) -> SosResult<()> {
        if index >= self.layout.data_sectors() {
            return Err(SosError::BadRecord);
        }
        Ok(())
    }

    /// Read one sector by absolute index
    pub fn read_raw_sector(&self, index: usize) -> SosResult<Vec<u8>> {
        self.check_record(index)?;
        Ok(self.volume.read_sector(index)?.to_vec())
    }

    /// Overwrite one sector by absolute index; `data` must fill the sector exactly
    pub fn write_raw_sector(&mut self, index: usize, data: &[u8]) -> SosResult<()> {
        self.check_record(index)?;
        if data.len() != self.volume.geometry().sector_size as usize {
            return Err(SosError::BadData);
        }
        self.check_writable()?;
        self.volume.write_sector(index, data)?;
        Ok(())
    }

    /// Free space summary
    pub fn info(&self) -> SosResult<FileSystemInfo> {
        Ok(FileSystemInfo {
            fs_type: "S-OS".to_string(),
            total_clusters: self.layout.max_cluster as usize,
            reserved_clusters: self.layout.reserved_clusters() as usize,
            free_clusters: self.fat.count_free(&self.volume)?,
            cluster_size: self.layout.cluster_size(self.volume.geometry().sector_size),
        })
    }
}

/// Size field value for a file of `len` bytes
fn recorded_size(name: &FileName, len: usize) -> u16 {
    if len > MAX_RECORDED_SIZE {
        warn!("{} is {} bytes; recording size 0", name, len);
        0
    } else {
        len as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> Timestamp {
        Timestamp {
            year: 24,
            month: 1,
            day_of_week: 2,
            day: 3,
            hour: 4,
            minute: 5,
        }
    }

    fn driver(media: MediaKind) -> FileSystemDriver {
        let options = DriverOptions {
            clock: fixed_clock,
            ..DriverOptions::default()
        };
        FileSystemDriver::format(media, ImageFormat::D88, options).unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_write_read_binary() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let data = pattern(600);
        let record = fs
            .write_file(root, &FileName::parse("TEST.BIN"), &data, 0x8000, 0x8000, FileMode::binary())
            .unwrap();

        assert_eq!(record.entry.size, 600);
        assert_eq!(record.entry.start_cluster, 2);
        assert_eq!(record.entry.timestamp, fixed_clock());
        assert_eq!(fs.read_file(&record.entry).unwrap(), data);

        // 3 of 16 sectors used in the only cluster
        assert_eq!(fs.volume().read_sector(14).unwrap()[2], 0x82);
    }

    #[test]
    fn test_multi_cluster_chain() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let data = pattern(4096 * 2 + 10);
        let record = fs
            .write_file(root, &FileName::parse("BIG.BIN"), &data, 0, 0, FileMode::binary())
            .unwrap();

        let fat = fs.volume().read_sector(14).unwrap();
        assert_eq!(&fat[2..5], &[0x03, 0x04, 0x80]);
        assert_eq!(fs.read_file(&record.entry).unwrap(), data);
    }

    #[test]
    fn test_exact_cluster_multiple() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let data = pattern(4096);
        fs.write_file(root, &FileName::parse("FULL.BIN"), &data, 0, 0, FileMode::binary())
            .unwrap();
        assert_eq!(fs.volume().read_sector(14).unwrap()[2], 0x8F);
    }

    #[test]
    fn test_zero_size_file() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let record = fs
            .write_file(root, &FileName::parse("EMPTY.BIN"), &[], 0, 0, FileMode::binary())
            .unwrap();
        assert_eq!(fs.volume().read_sector(14).unwrap()[2], 0x80);
        assert_eq!(fs.read_file(&record.entry).unwrap(), vec![0u8; 256]);
    }

    #[test]
    fn test_ascii_stops_at_eof_marker() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let mut text = b"10 PRINT \"HI\"\r".to_vec();
        text.push(ASCII_EOF);
        text.extend_from_slice(b"garbage");
        let record = fs
            .write_file(root, &FileName::parse("HI.ASC"), &text, 0, 0, FileMode::ascii())
            .unwrap();
        assert_eq!(fs.read_file(&record.entry).unwrap(), b"10 PRINT \"HI\"\r");
    }

    #[test]
    fn test_size_field_clamped() {
        let mut fs = driver(MediaKind::TwoDD);
        let root = fs.root_sector();
        let data = pattern(0x10000);
        let record = fs
            .write_file(root, &FileName::parse("HUGE.BIN"), &data, 0, 0, FileMode::binary())
            .unwrap();
        assert_eq!(record.entry.size, 0);
        assert_eq!(fs.read_file(&record.entry).unwrap(), data);
    }

    #[test]
    fn test_overwrite_releases_old_chain() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let name = FileName::parse("DATA.BIN");
        let free = fs.info().unwrap().free_clusters;

        let first = fs.write_file(root, &name, &pattern(9000), 0, 0, FileMode::binary()).unwrap();
        assert_eq!(fs.info().unwrap().free_clusters, free - 3);

        let second = fs.write_file(root, &name, b"short", 0, 0, FileMode::binary()).unwrap();
        assert_eq!(second.slot, first.slot);
        assert_eq!(fs.info().unwrap().free_clusters, free - 1);
        assert_eq!(fs.files(root).unwrap().len(), 1);
        assert_eq!(fs.read_file(&second.entry).unwrap(), b"short");
    }

    #[test]
    fn test_device_full_keeps_partial_file() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        // 78 free clusters of 4 KiB; ask for 80
        let data = pattern(80 * 4096);
        let result = fs.write_file(root, &FileName::parse("TOO.BIG"), &data, 0, 0, FileMode::binary());
        assert_eq!(result, Err(SosError::DeviceFull));
        assert_eq!(fs.info().unwrap().free_clusters, 0);

        let record = fs.find(root, &FileName::parse("TOO.BIG")).unwrap();
        let chain: Vec<_> = fs
            .allocation_table()
            .chain(fs.volume(), record.entry.start().unwrap())
            .collect::<SosResult<_>>()
            .unwrap();
        assert_eq!(chain.len(), 78);
        // 78 full clusters do not fit the size field
        assert_eq!(record.entry.size, 0);
    }

    #[test]
    fn test_device_full_records_written_size() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        // Leave 14 clusters free
        fs.write_file(root, &FileName::parse("FILL.BIN"), &pattern(64 * 4096), 0, 0, FileMode::binary())
            .unwrap();
        assert_eq!(fs.info().unwrap().free_clusters, 14);

        let data = pattern(60000);
        let result = fs.write_file(root, &FileName::parse("PART.BIN"), &data, 0, 0, FileMode::binary());
        assert_eq!(result, Err(SosError::DeviceFull));

        let record = fs.find(root, &FileName::parse("PART.BIN")).unwrap();
        assert_eq!(record.entry.size as usize, 14 * 4096);
        let read = fs.read_file(&record.entry).unwrap();
        assert_eq!(read.len(), 14 * 4096);
        assert_eq!(read, data[..14 * 4096]);
    }

    #[test]
    fn test_reserved_mode_bytes_rejected() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        for mode in [MODE_DELETED, MODE_END] {
            let result = fs.write_file(root, &FileName::parse("BAD.BIN"), &[1; 10], 0, 0, FileMode(mode));
            assert_eq!(result, Err(SosError::BadFileMode));
        }
        assert_eq!(fs.info().unwrap().free_clusters, 78);

        fs.write_file(root, &FileName::parse("GOOD.BIN"), &[1; 10], 0, 0, FileMode::binary())
            .unwrap();
        fs.write_file(root, &FileName::parse("NEXT.BIN"), &[2; 10], 0, 0, FileMode::binary())
            .unwrap();
        assert_eq!(fs.files(root).unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_start_cluster() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        fs.write_file(root, &FileName::parse("A.BIN"), &pattern(100), 0, 0, FileMode::binary())
            .unwrap();
        let b = fs
            .write_file(root, &FileName::parse("B.BIN"), &pattern(100), 0, 0, FileMode::binary())
            .unwrap();
        assert_eq!(b.entry.start_cluster, 3);

        // High start byte: 0x010002 must not alias A.BIN at cluster 2
        let sector = b.slot.sector;
        fs.volume_mut().get_sector_for_write(sector).unwrap().data_mut()[b.slot.offset + 0x1D] = 0x01;
        fs.volume_mut().get_sector_for_write(sector).unwrap().data_mut()[b.slot.offset + 0x1E] = 0x02;
        let corrupt = fs.find(root, &FileName::parse("B.BIN")).unwrap();
        assert_eq!(corrupt.entry.start_cluster, 0x010002);

        assert_eq!(fs.read_file(&corrupt.entry), Err(SosError::BadAllocationTable));
        assert_eq!(fs.delete_file(&corrupt), Err(SosError::BadAllocationTable));
        let a = fs.find(root, &FileName::parse("A.BIN")).unwrap();
        assert_eq!(fs.read_file(&a.entry).unwrap(), pattern(100));
    }

    #[test]
    fn test_contiguous_policy() {
        let options = DriverOptions {
            allocation: AllocationPolicy::Contiguous,
            clock: fixed_clock,
        };
        let mut fs = FileSystemDriver::format(MediaKind::TwoD, ImageFormat::D88, options).unwrap();
        let root = fs.root_sector();
        fs.write_file(root, &FileName::parse("A.BIN"), &[1], 0, 0, FileMode::binary()).unwrap();
        fs.write_file(root, &FileName::parse("B.BIN"), &[2], 0, 0, FileMode::binary()).unwrap();
        let a = fs.find(root, &FileName::parse("A.BIN")).unwrap();
        fs.delete_file(&a).unwrap();

        // The single free cluster at 2 is skipped for a two-cluster file
        let record = fs
            .write_file(root, &FileName::parse("C.BIN"), &pattern(5000), 0, 0, FileMode::binary())
            .unwrap();
        assert_eq!(record.entry.start_cluster, 4);

        let free = fs.info().unwrap().free_clusters;
        let result = fs.write_file(root, &FileName::parse("D.BIN"), &pattern(4096 * 76), 0, 0, FileMode::binary());
        assert_eq!(result, Err(SosError::DeviceFull));
        assert_eq!(fs.info().unwrap().free_clusters, free);
    }

    #[test]
    fn test_read_only_entries() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let name = FileName::parse("LOCK.BIN");
        let record = fs.write_file(root, &name, b"x", 0, 0, FileMode::binary()).unwrap();

        let locked = fs.set_protect(&record, true).unwrap();
        assert!(locked.entry.mode.is_read_only());
        assert_eq!(fs.set_protect(&locked, true).unwrap(), locked);

        assert_eq!(fs.delete_file(&locked), Err(SosError::WriteProtected));
        assert_eq!(
            fs.write_file(root, &name, b"y", 0, 0, FileMode::binary()),
            Err(SosError::WriteProtected)
        );

        let unlocked = fs.set_protect(&locked, false).unwrap();
        fs.delete_file(&unlocked).unwrap();
        assert_eq!(fs.find(root, &name), Err(SosError::FileNotFound));
    }

    #[test]
    fn test_rename() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let a = fs.write_file(root, &FileName::parse("A.BIN"), b"a", 0, 0, FileMode::binary()).unwrap();
        fs.write_file(root, &FileName::parse("B.BIN"), b"b", 0, 0, FileMode::binary()).unwrap();

        assert_eq!(fs.rename(&a, &FileName::parse("B.BIN")), Err(SosError::FileAlreadyExists));

        let renamed = fs.rename(&a, &FileName::parse("C.BIN")).unwrap();
        assert_eq!(renamed.slot, a.slot);
        assert_eq!(renamed.entry.start_cluster, a.entry.start_cluster);
        assert!(fs.find(root, &FileName::parse("A.BIN")).is_err());
        assert_eq!(fs.read_file(&renamed.entry).unwrap(), b"a");
    }

    #[test]
    fn test_directory_entry_is_not_readable() {
        let fs = driver(MediaKind::TwoD);
        let mut entry = DirEntry::parse(&[0u8; 32]);
        entry.mode = FileMode(FileMode::DIRECTORY);
        assert_eq!(fs.read_file(&entry), Err(SosError::BadFileMode));
    }

    #[test]
    fn test_broken_chain_returns_partial_data() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        let data = pattern(4096 * 2);
        let record = fs
            .write_file(root, &FileName::parse("BROKEN.BIN"), &data, 0, 0, FileMode::binary())
            .unwrap();
        // Point the first cluster at a free one
        let fat = *fs.allocation_table();
        fat.set_chain_link(fs.volume_mut(), 2, 40, false).unwrap();
        assert_eq!(fs.read_file(&record.entry).unwrap(), &data[..4096]);
    }

    #[test]
    fn test_raw_sectors() {
        let mut fs = driver(MediaKind::TwoD);
        assert_eq!(fs.read_raw_sector(1280), Err(SosError::BadRecord));
        assert_eq!(fs.write_raw_sector(1280, &[0; 256]), Err(SosError::BadRecord));
        assert_eq!(fs.write_raw_sector(100, &[0; 255]), Err(SosError::BadData));

        fs.write_raw_sector(1279, &[0x3C; 256]).unwrap();
        assert_eq!(fs.read_raw_sector(1279).unwrap(), vec![0x3C; 256]);
    }

    #[test]
    fn test_write_protected_volume() {
        let mut fs = driver(MediaKind::TwoD);
        let root = fs.root_sector();
        fs.volume_mut().set_write_protected(true);
        assert_eq!(
            fs.write_file(root, &FileName::parse("X.BIN"), b"x", 0, 0, FileMode::binary()),
            Err(SosError::WriteProtected)
        );
        assert_eq!(fs.write_raw_sector(0, &[0; 256]), Err(SosError::WriteProtected));
        assert!(fs.read_raw_sector(0).is_ok());
    }

    #[test]
    fn test_info() {
        let fs = driver(MediaKind::TwoHD);
        let info = fs.info().unwrap();
        assert_eq!(info.total_clusters, 250);
        assert_eq!(info.reserved_clusters, 3);
        assert_eq!(info.free_clusters, 247);
        assert_eq!(info.cluster_size, 4096);
    }
}
