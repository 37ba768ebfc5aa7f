use thiserror::Error;

/// Result type alias for disk image operations
pub type Result<T> = std::result::Result<T, DiskError>;

/// Result type alias for S-OS file operations
pub type SosResult<T> = std::result::Result<T, SosError>;

/// Errors that can occur when working with disk image files
#[derive(Debug, Error)]
pub enum DiskError {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unrecognized image file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Unsupported format variant
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Parse error at specific offset
    #[error("Parse error at offset {offset}: {message}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Error message
        message: String,
    },

    /// Absolute sector index outside the volume
    #[error("Invalid sector {index} (max: {max})")]
    InvalidSector {
        /// Requested sector index
        index: usize,
        /// Highest valid sector index
        max: usize,
    },
}

impl DiskError {
    /// Create a parse error with context
    pub fn parse<S: Into<String>>(offset: usize, message: S) -> Self {
        DiskError::ParseError {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        DiskError::InvalidFormat(message.into())
    }

    /// Create an unsupported format error
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        DiskError::UnsupportedFormat(message.into())
    }
}

/// S-OS result codes, numbered as the OS-call layer expects them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SosError {
    /// 1
    #[error("Device I/O error")]
    DeviceIoError,
    /// 2
    #[error("Device offline")]
    DeviceOffline,
    /// 3
    #[error("Bad file descriptor")]
    BadFileDescriptor,
    /// 4
    #[error("Write protected")]
    WriteProtected,
    /// 5
    #[error("Bad record")]
    BadRecord,
    /// 6
    #[error("Bad file mode")]
    BadFileMode,
    /// 7
    #[error("Bad allocation table")]
    BadAllocationTable,
    /// 8
    #[error("File not found")]
    FileNotFound,
    /// 9
    #[error("Device full")]
    DeviceFull,
    /// 10
    #[error("File already exists")]
    FileAlreadyExists,
    /// 11
    #[error("Reserved feature")]
    ReservedFeature,
    /// 12
    #[error("File not open")]
    FileNotOpen,
    /// 13
    #[error("Syntax error")]
    SyntaxError,
    /// 14
    #[error("Bad data")]
    BadData,
}

impl SosError {
    const ALL: [SosError; 14] = [
        SosError::DeviceIoError,
        SosError::DeviceOffline,
        SosError::BadFileDescriptor,
        SosError::WriteProtected,
        SosError::BadRecord,
        SosError::BadFileMode,
        SosError::BadAllocationTable,
        SosError::FileNotFound,
        SosError::DeviceFull,
        SosError::FileAlreadyExists,
        SosError::ReservedFeature,
        SosError::FileNotOpen,
        SosError::SyntaxError,
        SosError::BadData,
    ];

    /// Numeric result code
    pub fn code(&self) -> u8 {
        match self {
            SosError::DeviceIoError => 1,
            SosError::DeviceOffline => 2,
            SosError::BadFileDescriptor => 3,
            SosError::WriteProtected => 4,
            SosError::BadRecord => 5,
            SosError::BadFileMode => 6,
            SosError::BadAllocationTable => 7,
            SosError::FileNotFound => 8,
            SosError::DeviceFull => 9,
            SosError::FileAlreadyExists => 10,
            SosError::ReservedFeature => 11,
            SosError::FileNotOpen => 12,
            SosError::SyntaxError => 13,
            SosError::BadData => 14,
        }
    }

    /// Look up an error from its numeric code (0 and unknown codes give `None`)
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }
}

impl From<DiskError> for SosError {
    fn from(err: DiskError) -> Self {
        match err {
            DiskError::InvalidSector { .. } => SosError::BadRecord,
            _ => SosError::DeviceIoError,
        }
    }
}

/// Result code of an operation as seen by the OS-call layer (0 = success)
pub fn sos_code<T>(result: &SosResult<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiskError::InvalidSector { index: 1300, max: 1279 };
        assert_eq!(err.to_string(), "Invalid sector 1300 (max: 1279)");
    }

    #[test]
    fn test_parse_error() {
        let err = DiskError::parse(0x2B0, "Cylinder mismatch");
        assert_eq!(
            err.to_string(),
            "Parse error at offset 688: Cylinder mismatch"
        );
    }

    #[test]
    fn test_sos_codes() {
        assert_eq!(SosError::DeviceIoError.code(), 1);
        assert_eq!(SosError::FileNotFound.code(), 8);
        assert_eq!(SosError::DeviceFull.code(), 9);
        assert_eq!(SosError::FileAlreadyExists.code(), 10);
        assert_eq!(SosError::BadData.code(), 14);
    }

    #[test]
    fn test_from_code() {
        for code in 1..=14 {
            assert_eq!(SosError::from_code(code).map(|e| e.code()), Some(code));
        }
        assert_eq!(SosError::from_code(0), None);
        assert_eq!(SosError::from_code(15), None);
    }

    #[test]
    fn test_disk_error_mapping() {
        assert_eq!(
            SosError::from(DiskError::InvalidSector { index: 2000, max: 1279 }),
            SosError::BadRecord
        );
        assert_eq!(
            SosError::from(DiskError::invalid_format("bad")),
            SosError::DeviceIoError
        );
    }

    #[test]
    fn test_sos_code_of_result() {
        let ok: SosResult<()> = Ok(());
        let err: SosResult<()> = Err(SosError::DeviceOffline);
        assert_eq!(sos_code(&ok), 0);
        assert_eq!(sos_code(&err), 2);
    }
}
