//! Dump decoding error types
//!
//! Every decode failure is FATAL: the dump is corrupt or the decoder is out
//! of sync with the producer, so continuing would misinterpret the bytes that
//! follow.
//!
//! Error codes:
//! - TXNDUMP_UNEXPECTED_END
//! - TXNDUMP_INVALID_LENGTH
//! - TXNDUMP_MALFORMED_VARINT
//! - TXNDUMP_MALFORMED_KEY
//! - TXNDUMP_MALFORMED_VALUE
//! - TXNDUMP_UNKNOWN_COMMAND
//! - TXNDUMP_TRAILING_DATA
//! - TXNDUMP_UNSUPPORTED_WRITE_ENTRY
//! - TXNDUMP_INVALID_ENUM_TAG
//! - TXNDUMP_COMMIT_TIME_MISMATCH
//! - TXNDUMP_IO

use std::fmt;
use std::io;

/// Dump error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpErrorCode {
    /// A read ran past the end of the buffer or file
    UnexpectedEndOfData,
    /// Block length or entry count is negative
    InvalidLength,
    /// Length varint is overlong or overflows 32 bits
    MalformedVarint,
    /// Document key bytes could not be decoded
    MalformedKey,
    /// Value bytes could not be decoded
    MalformedValue,
    /// Command tag is not one of the known kinds
    UnknownCommand,
    /// Command decode left bytes in its block
    TrailingDataInBlock,
    /// Write batch entry type is known but not supported
    UnsupportedWriteEntryType,
    /// Enumeration byte is out of range
    InvalidEnumTag,
    /// Second commit record disagrees with the first
    CommitTimeMismatch,
    /// Underlying file I/O failed
    Io,
}

impl DumpErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            DumpErrorCode::UnexpectedEndOfData => "TXNDUMP_UNEXPECTED_END",
            DumpErrorCode::InvalidLength => "TXNDUMP_INVALID_LENGTH",
            DumpErrorCode::MalformedVarint => "TXNDUMP_MALFORMED_VARINT",
            DumpErrorCode::MalformedKey => "TXNDUMP_MALFORMED_KEY",
            DumpErrorCode::MalformedValue => "TXNDUMP_MALFORMED_VALUE",
            DumpErrorCode::UnknownCommand => "TXNDUMP_UNKNOWN_COMMAND",
            DumpErrorCode::TrailingDataInBlock => "TXNDUMP_TRAILING_DATA",
            DumpErrorCode::UnsupportedWriteEntryType => "TXNDUMP_UNSUPPORTED_WRITE_ENTRY",
            DumpErrorCode::InvalidEnumTag => "TXNDUMP_INVALID_ENUM_TAG",
            DumpErrorCode::CommitTimeMismatch => "TXNDUMP_COMMIT_TIME_MISMATCH",
            DumpErrorCode::Io => "TXNDUMP_IO",
        }
    }
}

impl fmt::Display for DumpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Dump decode error with context
#[derive(Debug)]
pub struct DumpError {
    code: DumpErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl DumpError {
    /// Create an error with the given code
    pub fn new(code: DumpErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Read past the end of the available bytes
    pub fn unexpected_end(wanted: usize, available: usize) -> Self {
        Self::new(
            DumpErrorCode::UnexpectedEndOfData,
            format!("wanted {} bytes, {} available", wanted, available),
        )
    }

    pub fn malformed_key(reason: impl Into<String>) -> Self {
        Self::new(DumpErrorCode::MalformedKey, reason)
    }

    pub fn malformed_value(reason: impl Into<String>) -> Self {
        Self::new(DumpErrorCode::MalformedValue, reason)
    }

    pub fn unknown_command(tag: u8) -> Self {
        Self::new(
            DumpErrorCode::UnknownCommand,
            format!("unknown command tag {}", tag),
        )
    }

    /// Command decode finished with bytes still left in the block
    pub fn trailing_data(tag: u8, left: &[u8]) -> Self {
        Self::new(
            DumpErrorCode::TrailingDataInBlock,
            format!("extra data left in block {}: {:02x?}", tag, left),
        )
    }

    pub fn unsupported_write_entry(entry_type: impl fmt::Debug) -> Self {
        Self::new(
            DumpErrorCode::UnsupportedWriteEntryType,
            format!("not supported write batch entry type: {:?}", entry_type),
        )
    }

    pub fn invalid_enum_tag(enum_name: &str, value: u64) -> Self {
        Self::new(
            DumpErrorCode::InvalidEnumTag,
            format!("invalid {} value {}", enum_name, value),
        )
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: DumpErrorCode::Io,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Attach location details, keeping any already present
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.details = Some(match self.details.take() {
            Some(existing) => format!("{}, {}", details, existing),
            None => details,
        });
        self
    }

    pub fn code(&self) -> DumpErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code.code(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for DumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for dump decoding
pub type DumpResult<T> = Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DumpErrorCode::UnexpectedEndOfData.code(), "TXNDUMP_UNEXPECTED_END");
        assert_eq!(DumpErrorCode::TrailingDataInBlock.code(), "TXNDUMP_TRAILING_DATA");
        assert_eq!(DumpErrorCode::CommitTimeMismatch.code(), "TXNDUMP_COMMIT_TIME_MISMATCH");
    }

    #[test]
    fn test_display_contains_context() {
        let err = DumpError::trailing_data(3, &[0xab, 0xcd])
            .with_details("block_offset: 16")
            .with_details("file: DUMP.1");
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("TXNDUMP_TRAILING_DATA"));
        assert!(display.contains("block 3"));
        assert!(display.contains("ab"));
        assert!(display.contains("file: DUMP.1, block_offset: 16"));
    }
}
