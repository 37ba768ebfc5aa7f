/// Directory records
///
/// Record layout (32 bytes):
/// - 0x00 mode
/// - 0x01-0x0D name, 0x0E-0x10 extension (space padded)
/// - 0x11 password
/// - 0x12 size, 0x14 load address, 0x16 exec address (u16 LE)
/// - 0x18-0x1C packed BCD timestamp: year, month << 4 | day of week, day, hour, minute
/// - 0x1D start cluster high byte, 0x1E low byte, 0x1F middle byte

use crate::error::{SosError, SosResult};
use crate::image::DiskVolume;
use chrono::{Datelike, Local, Timelike};
use log::debug;
use std::fmt;

/// Size of one directory record
pub const DIR_ENTRY_SIZE: usize = 32;
/// Mode byte of a deleted (reusable) record
pub const MODE_DELETED: u8 = 0x00;
/// Mode byte terminating a directory scan
pub const MODE_END: u8 = 0xFF;
/// Password byte written for new entries
pub const DEFAULT_PASSWORD: u8 = 0x20;

const NAME_LENGTH: usize = 13;
const EXT_LENGTH: usize = 3;

/// Mode byte of a directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileMode(pub u8);

impl FileMode {
    /// Directory
    pub const DIRECTORY: u8 = 0x80;
    /// Read only
    pub const READ_ONLY: u8 = 0x40;
    /// Verify after write
    pub const VERIFY: u8 = 0x20;
    /// Hidden
    pub const HIDDEN: u8 = 0x10;
    /// Text file
    pub const ASCII: u8 = 0x04;
    /// BASIC program
    pub const BASIC: u8 = 0x02;
    /// Machine code
    pub const BINARY: u8 = 0x01;

    /// Binary file mode
    pub fn binary() -> Self {
        Self(Self::BINARY)
    }

    /// Text file mode
    pub fn ascii() -> Self {
        Self(Self::ASCII)
    }

    fn has(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    /// Check the directory bit
    pub fn is_directory(&self) -> bool {
        self.has(Self::DIRECTORY)
    }

    /// Check the read-only bit
    pub fn is_read_only(&self) -> bool {
        self.has(Self::READ_ONLY)
    }

    /// Check the hidden bit
    pub fn is_hidden(&self) -> bool {
        self.has(Self::HIDDEN)
    }

    /// Check the text type bit
    pub fn is_ascii(&self) -> bool {
        self.has(Self::ASCII)
    }

    /// Same mode with the read-only bit set or cleared
    pub fn with_read_only(self, read_only: bool) -> Self {
        if read_only {
            Self(self.0 | Self::READ_ONLY)
        } else {
            Self(self.0 & !Self::READ_ONLY)
        }
    }

    /// Short type tag for listings
    pub fn type_name(&self) -> &'static str {
        if self.is_directory() {
            "Dir"
        } else if self.has(Self::ASCII) {
            "Asc"
        } else if self.has(Self::BASIC) {
            "Bas"
        } else if self.has(Self::BINARY) {
            "Bin"
        } else {
            "???"
        }
    }
}

/// Fixed-width, space padded file name and extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileName {
    name: [u8; NAME_LENGTH],
    ext: [u8; EXT_LENGTH],
}

impl FileName {
    /// Build from raw name and extension bytes, truncating and space padding
    pub fn new(name: &[u8], ext: &[u8]) -> Self {
        let mut padded_name = [b' '; NAME_LENGTH];
        let mut padded_ext = [b' '; EXT_LENGTH];
        for (dst, &src) in padded_name.iter_mut().zip(name) {
            *dst = src;
        }
        for (dst, &src) in padded_ext.iter_mut().zip(ext) {
            *dst = src;
        }
        Self {
            name: padded_name,
            ext: padded_ext,
        }
    }

    /// Parse `NAME.EXT`; the extension starts after the last dot
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once('.') {
            Some((name, ext)) => Self::new(name.as_bytes(), ext.as_bytes()),
            None => Self::new(text.as_bytes(), b""),
        }
    }

    /// Padded name bytes
    pub fn name(&self) -> &[u8; NAME_LENGTH] {
        &self.name
    }

    /// Padded extension bytes
    pub fn ext(&self) -> &[u8; EXT_LENGTH] {
        &self.ext
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = String::from_utf8_lossy(&self.name);
        let ext = String::from_utf8_lossy(&self.ext);
        let ext = ext.trim_end();
        if ext.is_empty() {
            write!(f, "{}", name.trim_end())
        } else {
            write!(f, "{}.{}", name.trim_end(), ext)
        }
    }
}

/// Entry timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    /// Year within the century (0-99)
    pub year: u8,
    /// Month (1-12)
    pub month: u8,
    /// Day of week (0 = Sunday)
    pub day_of_week: u8,
    /// Day of month
    pub day: u8,
    /// Hour
    pub hour: u8,
    /// Minute
    pub minute: u8,
}

fn to_bcd(value: u8) -> u8 {
    ((value / 10 % 10) << 4) | (value % 10)
}

fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

impl Timestamp {
    /// Current local time
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            year: (now.year().rem_euclid(100)) as u8,
            month: now.month() as u8,
            day_of_week: now.weekday().num_days_from_sunday() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
        }
    }

    /// Packed 5-byte form
    pub fn to_bytes(&self) -> [u8; 5] {
        [
            to_bcd(self.year),
            (self.month << 4) | (self.day_of_week & 0x0F),
            to_bcd(self.day),
            to_bcd(self.hour),
            to_bcd(self.minute),
        ]
    }

    /// Unpack the 5-byte form
    pub fn from_bytes(bytes: &[u8; 5]) -> Self {
        Self {
            year: from_bcd(bytes[0]),
            month: bytes[1] >> 4,
            day_of_week: bytes[1] & 0x0F,
            day: from_bcd(bytes[2]),
            hour: from_bcd(bytes[3]),
            minute: from_bcd(bytes[4]),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

/// Decoded directory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Mode byte
    pub mode: FileMode,
    /// File name and extension
    pub name: FileName,
    /// Password byte
    pub password: u8,
    /// Recorded size in bytes (0 when untracked)
    pub size: u16,
    /// Load address
    pub load_addr: u16,
    /// Execution address
    pub exec_addr: u16,
    /// Last write time
    pub timestamp: Timestamp,
    /// First cluster of the file (24 bits)
    pub start_cluster: u32,
}

impl DirEntry {
    /// Parse a 32-byte record
    pub fn parse(record: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let word = |offset: usize| u16::from_le_bytes([record[offset], record[offset + 1]]);
        let mut stamp = [0u8; 5];
        stamp.copy_from_slice(&record[0x18..0x1D]);

        Self {
            mode: FileMode(record[0x00]),
            name: FileName::new(&record[0x01..0x0E], &record[0x0E..0x11]),
            password: record[0x11],
            size: word(0x12),
            load_addr: word(0x14),
            exec_addr: word(0x16),
            timestamp: Timestamp::from_bytes(&stamp),
            start_cluster: ((record[0x1D] as u32) << 16)
                | ((record[0x1F] as u32) << 8)
                | record[0x1E] as u32,
        }
    }

    /// Serialize to a 32-byte record
    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut record = [0u8; DIR_ENTRY_SIZE];
        record[0x00] = self.mode.0;
        record[0x01..0x0E].copy_from_slice(self.name.name());
        record[0x0E..0x11].copy_from_slice(self.name.ext());
        record[0x11] = self.password;
        record[0x12..0x14].copy_from_slice(&self.size.to_le_bytes());
        record[0x14..0x16].copy_from_slice(&self.load_addr.to_le_bytes());
        record[0x16..0x18].copy_from_slice(&self.exec_addr.to_le_bytes());
        record[0x18..0x1D].copy_from_slice(&self.timestamp.to_bytes());
        record[0x1D] = (self.start_cluster >> 16) as u8;
        record[0x1E] = self.start_cluster as u8;
        record[0x1F] = (self.start_cluster >> 8) as u8;
        record
    }

    /// Start cluster as a table index
    ///
    /// A start cluster that does not fit a table index means the record is
    /// corrupt.
    pub fn start(&self) -> SosResult<u16> {
        u16::try_from(self.start_cluster).map_err(|_| SosError::BadAllocationTable)
    }

    /// Check if the record is a deleted slot
    pub fn is_deleted(&self) -> bool {
        self.mode.0 == MODE_DELETED
    }
}

/// Where a record lives on the volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirSlot {
    /// First sector of the directory the record belongs to
    pub dir_sector: usize,
    /// Absolute sector holding the record
    pub sector: usize,
    /// Byte offset of the record within its sector
    pub offset: usize,
}

/// A directory record together with its slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Record position
    pub slot: DirSlot,
    /// Record contents
    pub entry: DirEntry,
}

/// Directory spanning one cluster of sectors
#[derive(Debug, Clone, Copy)]
pub struct DirectoryEntryStore {
    start_sector: usize,
    span: usize,
}

/// Outcome of visiting one record during a scan
enum Visit<T> {
    Continue,
    Stop(T),
}

impl DirectoryEntryStore {
    /// Directory starting at `start_sector` covering `span` sectors
    pub fn new(start_sector: usize, span: usize) -> Self {
        Self { start_sector, span }
    }

    /// First sector of the directory
    pub fn start_sector(&self) -> usize {
        self.start_sector
    }

    /// Visit records in order until the end marker or `visit` stops the scan
    fn walk<T, F>(&self, volume: &DiskVolume, mut visit: F) -> SosResult<Option<T>>
    where
        F: FnMut(DirSlot, &[u8; DIR_ENTRY_SIZE]) -> Visit<T>,
    {
        for sector in self.start_sector..self.start_sector + self.span {
            let data = volume.read_sector(sector)?;
            for (i, chunk) in data.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
                let mut record = [0u8; DIR_ENTRY_SIZE];
                record.copy_from_slice(chunk);
                let slot = DirSlot {
                    dir_sector: self.start_sector,
                    sector,
                    offset: i * DIR_ENTRY_SIZE,
                };
                if let Visit::Stop(found) = visit(slot, &record) {
                    return Ok(Some(found));
                }
                if record[0] == MODE_END {
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    /// Every live record up to the end marker
    pub fn scan(&self, volume: &DiskVolume) -> SosResult<Vec<DirectoryRecord>> {
        let mut records = Vec::new();
        self.walk::<(), _>(volume, |slot, record| {
            if record[0] != MODE_DELETED && record[0] != MODE_END {
                records.push(DirectoryRecord {
                    slot,
                    entry: DirEntry::parse(record),
                });
            }
            Visit::Continue
        })?;
        Ok(records)
    }

    /// First live record with exactly this name and extension
    pub fn find_by_name(
        &self,
        volume: &DiskVolume,
        name: &FileName,
    ) -> SosResult<Option<DirectoryRecord>> {
        self.walk(volume, |slot, record| {
            if record[0] == MODE_DELETED || record[0] == MODE_END {
                return Visit::Continue;
            }
            if &record[0x01..0x0E] == name.name() && &record[0x0E..0x11] == name.ext() {
                Visit::Stop(DirectoryRecord {
                    slot,
                    entry: DirEntry::parse(record),
                })
            } else {
                Visit::Continue
            }
        })
    }

    /// First deleted or never-used slot
    pub fn allocate_slot(&self, volume: &DiskVolume) -> SosResult<Option<DirSlot>> {
        let slot = self.walk(volume, |slot, record| {
            if record[0] == MODE_DELETED || record[0] == MODE_END {
                Visit::Stop(slot)
            } else {
                Visit::Continue
            }
        })?;
        if let Some(slot) = slot {
            debug!("Allocated directory slot at sector {} offset 0x{:02X}", slot.sector, slot.offset);
        }
        Ok(slot)
    }

    /// Write a record back to its slot
    pub fn write_back(&self, volume: &mut DiskVolume, record: &DirectoryRecord) -> SosResult<()> {
        let bytes = record.entry.to_bytes();
        let sector = volume.get_sector_for_write(record.slot.sector)?;
        let offset = record.slot.offset;
        sector
            .data_mut()
            .get_mut(offset..offset + DIR_ENTRY_SIZE)
            .ok_or(SosError::DeviceIoError)?
            .copy_from_slice(&bytes);
        Ok(())
    }

    /// Fill the directory with end markers
    pub fn initialize(&self, volume: &mut DiskVolume) -> SosResult<()> {
        for sector in self.start_sector..self.start_sector + self.span {
            volume.get_sector_for_write(sector)?.fill(MODE_END);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Sector, VolumeBuilder};

    const RECORD: [u8; 32] = [
        0x01, b'T', b'E', b'S', b'T', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b'B',
        b'I', b'N', 0x20, 0x58, 0x02, 0x00, 0x80, 0x00, 0x80, 0x24, 0xA1, 0x15, 0x09, 0x30, 0x00,
        0x05, 0x00,
    ];

    fn entry() -> DirEntry {
        DirEntry {
            mode: FileMode::binary(),
            name: FileName::parse("TEST.BIN"),
            password: DEFAULT_PASSWORD,
            size: 600,
            load_addr: 0x8000,
            exec_addr: 0x8000,
            timestamp: Timestamp {
                year: 24,
                month: 10,
                day_of_week: 1,
                day: 15,
                hour: 9,
                minute: 30,
            },
            start_cluster: 5,
        }
    }

    #[test]
    fn test_parse_record() {
        assert_eq!(DirEntry::parse(&RECORD), entry());
    }

    #[test]
    fn test_serialize_record() {
        assert_eq!(entry().to_bytes(), RECORD);
    }

    #[test]
    fn test_start_cluster_byte_order() {
        let mut e = entry();
        e.start_cluster = 0x123456;
        let bytes = e.to_bytes();
        assert_eq!(&bytes[0x1D..0x20], &[0x12, 0x56, 0x34]);
        assert_eq!(DirEntry::parse(&bytes).start_cluster, 0x123456);
    }

    #[test]
    fn test_start_cluster_out_of_range() {
        let mut record = RECORD;
        record[0x1D] = 0x01;
        let parsed = DirEntry::parse(&record);
        assert_eq!(parsed.start_cluster, 0x010005);
        assert_eq!(parsed.start(), Err(SosError::BadAllocationTable));
        assert_eq!(DirEntry::parse(&RECORD).start(), Ok(5));
    }

    #[test]
    fn test_write_back_short_sector() {
        let (mut volume, dir) = directory();
        let sector = volume.store.get_mut(16).unwrap();
        *sector = Sector::with_data(sector.id, sector.sectors_in_track, vec![MODE_END; 16]);

        let record = DirectoryRecord {
            slot: DirSlot { dir_sector: 16, sector: 16, offset: 0 },
            entry: entry(),
        };
        assert_eq!(dir.write_back(&mut volume, &record), Err(SosError::DeviceIoError));
        assert!(dir.scan(&volume).unwrap().is_empty());
    }

    #[test]
    fn test_file_name() {
        let name = FileName::parse("HELLO.ASM");
        assert_eq!(name.name(), b"HELLO        ");
        assert_eq!(name.ext(), b"ASM");
        assert_eq!(name.to_string(), "HELLO.ASM");

        assert_eq!(FileName::parse("NOEXT").to_string(), "NOEXT");
        assert_eq!(FileName::parse("A.B.C").to_string(), "A.B.C");
        assert_eq!(FileName::parse("VERYLONGFILENAME.TEXT").name(), b"VERYLONGFILEN");
        assert_ne!(FileName::parse("test.bin"), FileName::parse("TEST.BIN"));
    }

    #[test]
    fn test_file_mode() {
        let mode = FileMode::binary().with_read_only(true);
        assert_eq!(mode.0, 0x41);
        assert!(mode.is_read_only());
        assert_eq!(mode.with_read_only(false), FileMode::binary());
        assert_eq!(FileMode(0x84).type_name(), "Dir");
        assert_eq!(FileMode::ascii().type_name(), "Asc");
    }

    #[test]
    fn test_timestamp_bcd() {
        let stamp = Timestamp {
            year: 99,
            month: 12,
            day_of_week: 5,
            day: 31,
            hour: 23,
            minute: 59,
        };
        assert_eq!(stamp.to_bytes(), [0x99, 0xC5, 0x31, 0x23, 0x59]);
        assert_eq!(Timestamp::from_bytes(&stamp.to_bytes()), stamp);
    }

    fn directory() -> (DiskVolume, DirectoryEntryStore) {
        let mut volume = VolumeBuilder::new().build().unwrap();
        let dir = DirectoryEntryStore::new(16, 16);
        dir.initialize(&mut volume).unwrap();
        (volume, dir)
    }

    #[test]
    fn test_initialize_and_empty_scan() {
        let (volume, dir) = directory();
        assert!(volume.read_sector(16).unwrap().iter().all(|&b| b == 0xFF));
        assert!(volume.read_sector(31).unwrap().iter().all(|&b| b == 0xFF));
        assert_eq!(volume.read_sector(32).unwrap()[0], 0x00);
        assert!(dir.scan(&volume).unwrap().is_empty());
    }

    #[test]
    fn test_allocate_write_find() {
        let (mut volume, dir) = directory();
        let slot = dir.allocate_slot(&volume).unwrap().unwrap();
        assert_eq!((slot.sector, slot.offset), (16, 0));

        let record = DirectoryRecord { slot, entry: entry() };
        dir.write_back(&mut volume, &record).unwrap();
        assert_eq!(&volume.read_sector(16).unwrap()[..32], &RECORD);
        assert_eq!(volume.read_sector(16).unwrap()[32], 0xFF);

        let found = dir.find_by_name(&volume, &FileName::parse("TEST.BIN")).unwrap();
        assert_eq!(found, Some(record));
        assert!(dir.find_by_name(&volume, &FileName::parse("TEST.ASC")).unwrap().is_none());

        let next = dir.allocate_slot(&volume).unwrap().unwrap();
        assert_eq!((next.sector, next.offset), (16, 32));
    }

    #[test]
    fn test_deleted_slots_are_skipped_and_reused() {
        let (mut volume, dir) = directory();
        for i in 0..3u8 {
            let slot = dir.allocate_slot(&volume).unwrap().unwrap();
            let mut e = entry();
            e.name = FileName::new(&[b'A' + i], b"BIN");
            dir.write_back(&mut volume, &DirectoryRecord { slot, entry: e }).unwrap();
        }
        volume.get_sector_for_write(16).unwrap().data_mut()[32] = MODE_DELETED;

        let names: Vec<String> = dir
            .scan(&volume)
            .unwrap()
            .iter()
            .map(|r| r.entry.name.to_string())
            .collect();
        assert_eq!(names, vec!["A.BIN", "C.BIN"]);

        let slot = dir.allocate_slot(&volume).unwrap().unwrap();
        assert_eq!((slot.sector, slot.offset), (16, 32));
    }

    #[test]
    fn test_end_marker_stops_scan() {
        let (mut volume, dir) = directory();
        let mut record = entry().to_bytes();
        volume.get_sector_for_write(17).unwrap().data_mut()[..32].copy_from_slice(&record);
        // Sector 16 starts with the end marker, so sector 17 is never reached
        assert!(dir.scan(&volume).unwrap().is_empty());

        record[0] = FileMode::BINARY;
        volume.get_sector_for_write(16).unwrap().data_mut()[..32].copy_from_slice(&record);
        assert_eq!(dir.scan(&volume).unwrap().len(), 1);
    }

    #[test]
    fn test_full_directory() {
        let (mut volume, dir) = directory();
        for sector in 16..32 {
            for offset in (0..256).step_by(32) {
                volume.get_sector_for_write(sector).unwrap().data_mut()[offset] = FileMode::BINARY;
            }
        }
        assert_eq!(dir.allocate_slot(&volume).unwrap(), None);
        assert_eq!(dir.scan(&volume).unwrap().len(), 128);
    }
}
