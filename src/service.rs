/// Disk service: mounted volumes by device letter and the OS-call operation set

use crate::error::{SosError, SosResult};
use crate::filesystem::{
    DirEntry, DirectoryRecord, DriverOptions, FileMode, FileName, FileSystemDriver, FileSystemInfo,
};
use crate::format::{ImageFormat, MediaKind};
use crate::image::{DiskVolume, WriteMode};
use log::{info, warn};
use std::fmt;
use std::path::Path;

/// Number of drives the service multiplexes
pub const DRIVE_COUNT: usize = 4;

/// Drive letter A to D
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceLetter {
    /// Drive A
    A,
    /// Drive B
    B,
    /// Drive C
    C,
    /// Drive D
    D,
}

impl DeviceLetter {
    /// All drive letters in order
    pub const ALL: [DeviceLetter; DRIVE_COUNT] =
        [DeviceLetter::A, DeviceLetter::B, DeviceLetter::C, DeviceLetter::D];

    /// Parse a drive letter (case-insensitive)
    pub fn from_char(c: char) -> SosResult<Self> {
        match c.to_ascii_uppercase() {
            'A' => Ok(DeviceLetter::A),
            'B' => Ok(DeviceLetter::B),
            'C' => Ok(DeviceLetter::C),
            'D' => Ok(DeviceLetter::D),
            _ => Err(SosError::BadFileDescriptor),
        }
    }

    /// Slot index 0-3
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Letter as a character
    pub fn as_char(&self) -> char {
        (b'A' + *self as u8) as char
    }
}

impl fmt::Display for DeviceLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Arguments of a file write as issued by the OS-call layer
#[derive(Debug, Clone)]
pub struct WriteRequest<'a> {
    /// First sector of the target directory
    pub dir_sector: usize,
    /// File name
    pub name: FileName,
    /// Memory image the file is taken from
    pub data: &'a [u8],
    /// Load address
    pub load_addr: u16,
    /// Last address included in the file
    pub end_addr: u16,
    /// Execution address
    pub exec_addr: u16,
    /// Mode byte
    pub mode: FileMode,
}

impl WriteRequest<'_> {
    /// Bytes covered by `load_addr..=end_addr`, limited to the data supplied
    pub fn payload(&self) -> SosResult<&[u8]> {
        if self.end_addr < self.load_addr {
            return Err(SosError::BadData);
        }
        let len = (self.end_addr - self.load_addr) as usize + 1;
        Ok(&self.data[..len.min(self.data.len())])
    }
}

/// Up to four mounted volumes, each with its own filesystem driver
#[derive(Debug, Default)]
pub struct DiskService {
    drives: [Option<FileSystemDriver>; DRIVE_COUNT],
    options: DriverOptions,
}

impl DiskService {
    /// Create a service with no drives mounted
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service whose drivers use `options`
    pub fn with_options(options: DriverOptions) -> Self {
        Self {
            drives: Default::default(),
            options,
        }
    }

    /// Mount an already decoded volume
    pub fn mount(&mut self, device: char, volume: DiskVolume) -> SosResult<()> {
        let letter = DeviceLetter::from_char(device)?;
        info!("Mounted {} volume on {}:", volume.media(), letter);
        self.drives[letter.index()] = Some(FileSystemDriver::with_options(volume, self.options));
        Ok(())
    }

    /// Decode and mount an in-memory image; a failed decode leaves the drive empty
    pub fn mount_bytes(&mut self, device: char, data: &[u8], format: ImageFormat) -> SosResult<()> {
        let letter = DeviceLetter::from_char(device)?;
        match DiskVolume::from_bytes(data, format) {
            Ok(volume) => self.mount(device, volume),
            Err(e) => {
                warn!("Mount of {}: failed: {}", letter, e);
                self.drives[letter.index()] = None;
                Err(SosError::DeviceIoError)
            }
        }
    }

    /// Open and mount an image file; the format comes from the extension
    pub fn mount_path<P: AsRef<Path>>(&mut self, device: char, path: P) -> SosResult<()> {
        let letter = DeviceLetter::from_char(device)?;
        match DiskVolume::open(&path) {
            Ok(volume) => self.mount(device, volume),
            Err(e) => {
                warn!("Mount of {}: failed: {}", letter, e);
                self.drives[letter.index()] = None;
                Err(SosError::DeviceIoError)
            }
        }
    }

    /// Mount a freshly formatted, empty volume
    pub fn format(&mut self, device: char, media: MediaKind, format: ImageFormat) -> SosResult<()> {
        let letter = DeviceLetter::from_char(device)?;
        let driver = FileSystemDriver::format(media, format, self.options)?;
        self.drives[letter.index()] = Some(driver);
        Ok(())
    }

    /// Remove a volume from its drive
    pub fn unmount(&mut self, device: char) -> SosResult<DiskVolume> {
        let letter = DeviceLetter::from_char(device)?;
        let driver = self.drives[letter.index()]
            .take()
            .ok_or(SosError::DeviceOffline)?;
        info!("Unmounted {}:", letter);
        Ok(driver.into_volume())
    }

    /// Save a mounted volume to a file
    pub fn save<P: AsRef<Path>>(&mut self, device: char, path: P) -> SosResult<WriteMode> {
        let volume = self.driver_mut(device)?.volume_mut();
        Ok(volume.save(path)?)
    }

    /// Check if a drive holds a volume
    pub fn is_mounted(&self, device: char) -> bool {
        self.driver(device).is_ok()
    }

    /// Driver of a mounted drive
    pub fn driver(&self, device: char) -> SosResult<&FileSystemDriver> {
        let letter = DeviceLetter::from_char(device)?;
        self.drives[letter.index()]
            .as_ref()
            .ok_or(SosError::DeviceOffline)
    }

    /// Driver of a mounted drive, mutable
    pub fn driver_mut(&mut self, device: char) -> SosResult<&mut FileSystemDriver> {
        let letter = DeviceLetter::from_char(device)?;
        self.drives[letter.index()]
            .as_mut()
            .ok_or(SosError::DeviceOffline)
    }

    /// Live entries of a directory
    pub fn files(&self, device: char, dir_sector: usize) -> SosResult<Vec<DirectoryRecord>> {
        self.driver(device)?.files(dir_sector)
    }

    /// Read a whole file by name
    pub fn read_file(
        &self,
        device: char,
        dir_sector: usize,
        name: &FileName,
    ) -> SosResult<(DirEntry, Vec<u8>)> {
        let driver = self.driver(device)?;
        let record = driver.find(dir_sector, name)?;
        let data = driver.read_file(&record.entry)?;
        Ok((record.entry, data))
    }

    /// Write a whole file from a memory image
    pub fn write_file(&mut self, device: char, request: &WriteRequest<'_>) -> SosResult<DirectoryRecord> {
        let payload = request.payload()?;
        self.driver_mut(device)?.write_file(
            request.dir_sector,
            &request.name,
            payload,
            request.load_addr,
            request.exec_addr,
            request.mode,
        )
    }

    /// Read one record (sector)
    pub fn read_record(&self, device: char, index: usize) -> SosResult<Vec<u8>> {
        self.driver(device)?.read_raw_sector(index)
    }

    /// Write one record (sector)
    pub fn write_record(&mut self, device: char, index: usize, data: &[u8]) -> SosResult<()> {
        self.driver_mut(device)?.write_raw_sector(index, data)
    }

    /// Directory entry of a file without reading its data
    pub fn get_info_block(&self, device: char, dir_sector: usize, name: &FileName) -> SosResult<DirEntry> {
        Ok(self.driver(device)?.find(dir_sector, name)?.entry)
    }

    /// Mark a file read-only
    pub fn set_protect(&mut self, device: char, dir_sector: usize, name: &FileName) -> SosResult<()> {
        self.protect(device, dir_sector, name, true)
    }

    /// Clear a file's read-only mark
    pub fn reset_protect(&mut self, device: char, dir_sector: usize, name: &FileName) -> SosResult<()> {
        self.protect(device, dir_sector, name, false)
    }

    fn protect(&mut self, device: char, dir_sector: usize, name: &FileName, flag: bool) -> SosResult<()> {
        let driver = self.driver_mut(device)?;
        let record = driver.find(dir_sector, name)?;
        driver.set_protect(&record, flag)?;
        Ok(())
    }

    /// Delete a file
    pub fn kill(&mut self, device: char, dir_sector: usize, name: &FileName) -> SosResult<()> {
        let driver = self.driver_mut(device)?;
        let record = driver.find(dir_sector, name)?;
        driver.delete_file(&record)
    }

    /// Rename a file
    pub fn rename(
        &mut self,
        device: char,
        dir_sector: usize,
        old_name: &FileName,
        new_name: &FileName,
    ) -> SosResult<()> {
        let driver = self.driver_mut(device)?;
        let record = driver.find(dir_sector, old_name)?;
        driver.rename(&record, new_name)?;
        Ok(())
    }

    /// Free space summary of a drive
    pub fn info(&self, device: char) -> SosResult<FileSystemInfo> {
        self.driver(device)?.info()
    }
}
