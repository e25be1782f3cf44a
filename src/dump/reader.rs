//! Block reader for one dump file
//!
//! A dump file is a sequence of `i64 length` + `length` body bytes.
//! - Zero bytes left at a block boundary is a clean end of file
//! - A partial length, negative length or short body is FATAL
//! - No skipping, no resynchronisation
//!
//! The end of file is whatever the stream says it is, so pipes and FIFOs
//! decode the same way as regular files.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::codec::{DumpError, DumpErrorCode, DumpResult};

/// Size of the block length prefix
pub const BLOCK_HEADER_SIZE: u64 = 8;

/// Undecoded block body and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Offset of the length prefix within the file
    pub offset: u64,
    pub body: Vec<u8>,
}

/// Sequential block reader. The file handle is released on drop.
pub struct DumpReader {
    path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
}

impl DumpReader {
    /// # Errors
    ///
    /// `TXNDUMP_IO` if the file cannot be opened.
    pub fn open(path: &Path) -> DumpResult<Self> {
        let file = File::open(path).map_err(|e| {
            DumpError::io(format!("Failed to open dump file: {}", path.display()), e)
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next block.
    ///
    /// - `Ok(Some(block))` for a complete block
    /// - `Ok(None)` at a clean end of file
    /// - `Err` for any truncation or I/O failure
    pub fn read_next(&mut self) -> DumpResult<Option<RawBlock>> {
        let offset = self.current_offset;

        let mut len_buf = [0u8; BLOCK_HEADER_SIZE as usize];
        let filled = self.fill(&mut len_buf).map_err(|e| {
            DumpError::io("Failed to read block length", e)
                .with_details(format!("offset {}", offset))
        })?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < len_buf.len() {
            return Err(DumpError::unexpected_end(len_buf.len(), filled)
                .with_details(format!("block length at offset {}", offset)));
        }
        let length = i64::from_le_bytes(len_buf);

        if length < 0 {
            return Err(DumpError::new(
                DumpErrorCode::InvalidLength,
                format!("negative block length {}", length),
            )
            .with_details(format!("offset {}", offset)));
        }

        // Grows with the bytes actually present, not with the claimed length
        let length = length as u64;
        let mut body = Vec::new();
        (&mut self.reader)
            .take(length)
            .read_to_end(&mut body)
            .map_err(|e| {
                DumpError::io("Failed to read block body", e)
                    .with_details(format!("offset {}", offset))
            })?;
        if (body.len() as u64) < length {
            return Err(DumpError::unexpected_end(length as usize, body.len())
                .with_details(format!("block body at offset {}", offset)));
        }

        self.current_offset += BLOCK_HEADER_SIZE + length;
        Ok(Some(RawBlock { offset, body }))
    }

    /// Reads until `buf` is full or the stream ends. Returns the bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl Iterator for DumpReader {
    type Item = DumpResult<RawBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}
