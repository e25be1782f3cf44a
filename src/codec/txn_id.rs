//! Transaction identifiers
//!
//! A transaction id is a 16-byte UUID. At a record boundary an empty input
//! decodes to `None`; this is how repeating groups and streams terminate.

use std::fmt;

use uuid::Uuid;

use super::errors::{DumpError, DumpErrorCode, DumpResult};
use super::reader::BinaryReader;
use super::writer::BinaryWriter;

/// Encoded size of a transaction id
pub const TRANSACTION_ID_SIZE: usize = 16;

/// Opaque 16-byte transaction identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn from_bytes(bytes: [u8; TRANSACTION_ID_SIZE]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; TRANSACTION_ID_SIZE] {
        self.0.as_bytes()
    }

    /// Decodes a required id.
    pub fn decode(reader: &mut BinaryReader<'_>) -> DumpResult<Self> {
        Ok(Self::from_bytes(reader.read_array()?))
    }

    /// Decodes an id at a record boundary.
    ///
    /// Zero bytes remaining yields `None`. A partial id is truncation and
    /// fails with `TXNDUMP_UNEXPECTED_END`.
    pub fn decode_optional(reader: &mut BinaryReader<'_>) -> DumpResult<Option<Self>> {
        match reader.remaining() {
            0 => Ok(None),
            n if n < TRANSACTION_ID_SIZE => Err(DumpError::new(
                DumpErrorCode::UnexpectedEndOfData,
                format!("truncated transaction id: {} of {} bytes", n, TRANSACTION_ID_SIZE),
            )),
            _ => Self::decode(reader).map(Some),
        }
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        writer.put_bytes(self.as_bytes());
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
