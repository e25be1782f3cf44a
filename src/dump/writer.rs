//! Dump file writer
//!
//! Produces files in the exact block layout `DumpReader` consumes. Used to
//! build synthetic dumps for tests and tooling; the analysis never writes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::codec::{DumpError, DumpResult};

use super::command::Command;

pub struct DumpWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    blocks_written: u64,
}

impl DumpWriter {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: &Path) -> DumpResult<Self> {
        let file = File::create(path).map_err(|e| {
            DumpError::io(format!("Failed to create dump file: {}", path.display()), e)
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            blocks_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    /// Appends one encoded command as a block.
    pub fn append(&mut self, command: &Command) -> DumpResult<()> {
        self.append_raw_block(&command.encode_block())
    }

    /// Appends an arbitrary body with a correct length prefix.
    pub fn append_raw_block(&mut self, body: &[u8]) -> DumpResult<()> {
        self.append_raw_bytes(&(body.len() as i64).to_le_bytes())?;
        self.append_raw_bytes(body)?;
        self.blocks_written += 1;
        Ok(())
    }

    /// Appends bytes with no framing at all.
    pub fn append_raw_bytes(&mut self, bytes: &[u8]) -> DumpResult<()> {
        self.writer
            .write_all(bytes)
            .map_err(|e| DumpError::io("Failed to write dump file", e))
    }

    /// Flushes buffered bytes to the file.
    pub fn finish(mut self) -> DumpResult<()> {
        self.writer
            .flush()
            .map_err(|e| DumpError::io("Failed to flush dump file", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{HybridTime, TransactionId};
    use crate::dump::command::AppliedCommand;
    use crate::dump::reader::DumpReader;
    use tempfile::TempDir;

    #[test]
    fn test_written_blocks_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("DUMP.0");
        let command = Command::Applied(AppliedCommand {
            txn_id: TransactionId::from_bytes([4; 16]),
            hybrid_time: HybridTime::from_micros(9, 0),
        });

        let mut writer = DumpWriter::create(&path).unwrap();
        writer.append(&command).unwrap();
        writer.append_raw_block(&[7]).unwrap();
        assert_eq!(writer.blocks_written(), 2);
        writer.finish().unwrap();

        let mut reader = DumpReader::open(&path).unwrap();
        let block = reader.read_next().unwrap().unwrap();
        assert_eq!(Command::decode_block(&block.body).unwrap(), command);
        assert_eq!(reader.read_next().unwrap().unwrap().body, vec![7]);
        assert!(reader.read_next().unwrap().is_none());
    }
}
