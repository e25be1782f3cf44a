//! Primitive decoder over an in-memory byte buffer
//!
//! All fixed-width integers are little-endian. Reads are single-pass with no
//! backtracking; any read past the end of the buffer fails with
//! `TXNDUMP_UNEXPECTED_END`.

use super::errors::{DumpError, DumpErrorCode, DumpResult};

/// Maximum encoded size of a varint32
const MAX_VARINT32_BYTES: usize = 5;

/// Cursor over a finite byte buffer.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads exactly `len` bytes.
    pub fn read_exact(&mut self, len: usize) -> DumpResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(DumpError::unexpected_end(len, self.remaining())
                .with_details(format!("offset: {}", self.pos)));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> DumpResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_exact(N)?);
        Ok(buf)
    }

    /// Reads all remaining bytes. Used for leftover detection.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    pub fn read_u8(&mut self) -> DumpResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> DumpResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> DumpResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> DumpResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> DumpResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Non-zero byte is true.
    pub fn read_bool(&mut self) -> DumpResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a LEB128 varint32.
    pub fn read_varint32(&mut self) -> DumpResult<u32> {
        let start = self.pos;
        let mut result: u64 = 0;
        for i in 0..MAX_VARINT32_BYTES {
            let byte = self.read_u8()?;
            result |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return u32::try_from(result).map_err(|_| {
                    DumpError::new(
                        DumpErrorCode::MalformedVarint,
                        format!("varint32 overflow: {}", result),
                    )
                    .with_details(format!("offset: {}", start))
                });
            }
        }
        Err(DumpError::new(
            DumpErrorCode::MalformedVarint,
            format!("varint32 longer than {} bytes", MAX_VARINT32_BYTES),
        )
        .with_details(format!("offset: {}", start)))
    }

    /// Reads varint32-length-prefixed bytes.
    pub fn read_varbytes(&mut self) -> DumpResult<&'a [u8]> {
        let len = self.read_varint32()? as usize;
        self.read_exact(len)
    }

    /// Reads u64-length-prefixed bytes.
    pub fn read_sized_bytes(&mut self) -> DumpResult<&'a [u8]> {
        let len = self.read_u64()?;
        let len = usize::try_from(len)
            .map_err(|_| DumpError::unexpected_end(usize::MAX, self.remaining()))?;
        self.read_exact(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_little_endian() {
        let data = [
            0x01, // u8
            0x04, 0x03, 0x02, 0x01, // u32
            0xfe, 0xff, 0xff, 0xff, // i32 -2
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // i64 -1
        ];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(reader.read_u32().unwrap(), 0x01020304);
        assert_eq!(reader.read_i32().unwrap(), -2);
        assert_eq!(reader.read_i64().unwrap(), -1);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_bool_nonzero_is_true() {
        let mut reader = BinaryReader::new(&[0, 1, 7]);
        assert!(!reader.read_bool().unwrap());
        assert!(reader.read_bool().unwrap());
        assert!(reader.read_bool().unwrap());
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut reader = BinaryReader::new(&[1, 2, 3]);
        let err = reader.read_u32().unwrap_err();
        assert_eq!(err.code(), DumpErrorCode::UnexpectedEndOfData);
        // Failed read consumes nothing
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_varint32() {
        let mut reader = BinaryReader::new(&[0x05, 0xac, 0x02, 0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(reader.read_varint32().unwrap(), 5);
        assert_eq!(reader.read_varint32().unwrap(), 300);
        assert_eq!(reader.read_varint32().unwrap(), u32::MAX);
    }

    #[test]
    fn test_varint32_overflow_rejected() {
        let mut reader = BinaryReader::new(&[0xff, 0xff, 0xff, 0xff, 0x1f]);
        assert_eq!(
            reader.read_varint32().unwrap_err().code(),
            DumpErrorCode::MalformedVarint
        );

        let mut reader = BinaryReader::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert_eq!(
            reader.read_varint32().unwrap_err().code(),
            DumpErrorCode::MalformedVarint
        );
    }

    #[test]
    fn test_varbytes_and_rest() {
        let mut reader = BinaryReader::new(&[3, b'a', b'b', b'c', 9, 9]);
        assert_eq!(reader.read_varbytes().unwrap(), b"abc");
        assert_eq!(reader.read_rest(), &[9, 9]);
        assert!(reader.read_rest().is_empty());
    }

    #[test]
    fn test_varbytes_truncated() {
        let mut reader = BinaryReader::new(&[4, b'a']);
        assert_eq!(
            reader.read_varbytes().unwrap_err().code(),
            DumpErrorCode::UnexpectedEndOfData
        );
    }
}
