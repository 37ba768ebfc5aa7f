/// Positional little-endian access to a fixed byte buffer

use crate::error::{DiskError, Result};

/// Cursor over a byte buffer, reading or writing little-endian values
///
/// Reads work on any `AsRef<[u8]>`; writes additionally need `AsMut<[u8]>`.
/// The buffer never grows: running past its end is a parse error.
#[derive(Debug, Clone)]
pub struct ByteCursor<B> {
    buf: B,
    pos: usize,
}

impl<B: AsRef<[u8]>> ByteCursor<B> {
    /// Create a cursor positioned at the start of `buf`
    pub fn new(buf: B) -> Self {
        Self { buf, pos: 0 }
    }

    /// Create a cursor positioned at `pos`
    pub fn at(buf: B, pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to an absolute position
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Advance by `count` bytes without reading
    pub fn skip(&mut self, count: usize) {
        self.pos += count;
    }

    /// Bytes left between the position and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.buf.as_ref().len().saturating_sub(self.pos)
    }

    /// Total buffer length
    pub fn len(&self) -> usize {
        self.buf.as_ref().len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buf.as_ref().is_empty()
    }

    /// Consume the cursor, returning the buffer
    pub fn into_inner(self) -> B {
        self.buf
    }

    fn check(&self, count: usize) -> Result<()> {
        if self.remaining() < count {
            return Err(DiskError::parse(
                self.pos,
                format!("Unexpected end of data (need {} bytes, {} left)", count, self.remaining()),
            ));
        }
        Ok(())
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        self.check(1)?;
        let value = self.buf.as_ref()[self.pos];
        self.pos += 1;
        Ok(value)
    }

    /// Read a little-endian u16
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian u32
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<&[u8]> {
        self.check(count)?;
        let start = self.pos;
        self.pos += count;
        Ok(&self.buf.as_ref()[start..start + count])
    }

    /// Read a fixed-size array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> ByteCursor<B> {
    /// Write one byte
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Write a little-endian u16
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a little-endian u32
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a run of bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.check(bytes.len())?;
        let start = self.pos;
        self.buf.as_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Write `count` copies of `value`
    pub fn fill(&mut self, value: u8, count: usize) -> Result<()> {
        self.check(count)?;
        let start = self.pos;
        self.buf.as_mut()[start..start + count].fill(value);
        self.pos += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_little_endian() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut cursor = ByteCursor::new(&data[..]);

        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_read_past_end() {
        let data = [0x01];
        let mut cursor = ByteCursor::new(&data[..]);
        let err = cursor.read_u16().unwrap_err();
        assert!(matches!(err, DiskError::ParseError { offset: 0, .. }));
        // A failed read does not move the cursor
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_write_positional() {
        let mut data = [0u8; 8];
        let mut cursor = ByteCursor::at(&mut data[..], 2);
        cursor.write_u16(0xBEEF).unwrap();
        cursor.write_u8(0x7F).unwrap();
        cursor.fill(0xFF, 2).unwrap();
        assert_eq!(cursor.position(), 7);
        assert_eq!(data, [0, 0, 0xEF, 0xBE, 0x7F, 0xFF, 0xFF, 0]);
    }

    #[test]
    fn test_write_past_end() {
        let mut data = [0u8; 3];
        let mut cursor = ByteCursor::at(&mut data[..], 1);
        assert!(cursor.write_u32(1).is_err());
        assert_eq!(data, [0, 0, 0]);
    }

    #[test]
    fn test_read_array_and_seek() {
        let data = *b"ABCDEFGH";
        let mut cursor = ByteCursor::new(data);
        cursor.seek(4);
        let arr: [u8; 3] = cursor.read_array().unwrap();
        assert_eq!(&arr, b"EFG");
        cursor.skip(1);
        assert_eq!(cursor.remaining(), 0);
    }
}
