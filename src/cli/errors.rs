//! CLI-specific error types
//!
//! Every CLI error ends the process with exit status 1.

use std::fmt;
use std::io;

use crate::analysis::AnalysisError;
use crate::codec::DumpError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout/stderr)
    IoError,
    /// Bad command line value
    InvalidArgument,
    /// Dump could not be decoded
    DecodeFailed,
    /// Consistency check recorded findings
    InconsistenciesFound,
    /// Consistency check stopped at the finding limit
    TooManyFindings,
    /// Requested transaction does not appear in the dump
    TransactionNotFound,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "TXNDUMP_CLI_CONFIG_ERROR",
            Self::IoError => "TXNDUMP_CLI_IO_ERROR",
            Self::InvalidArgument => "TXNDUMP_CLI_INVALID_ARGUMENT",
            Self::DecodeFailed => "TXNDUMP_CLI_DECODE_FAILED",
            Self::InconsistenciesFound => "TXNDUMP_CLI_INCONSISTENCIES_FOUND",
            Self::TooManyFindings => "TXNDUMP_CLI_TOO_MANY_FINDINGS",
            Self::TransactionNotFound => "TXNDUMP_CLI_TRANSACTION_NOT_FOUND",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn inconsistencies_found(count: usize) -> Self {
        Self::new(
            CliErrorCode::InconsistenciesFound,
            format!("{} inconsistencies found", count),
        )
    }

    pub fn transaction_not_found(id: &str) -> Self {
        Self::new(
            CliErrorCode::TransactionNotFound,
            format!("Transaction {} not found in dump", id),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<DumpError> for CliError {
    fn from(e: DumpError) -> Self {
        Self::new(CliErrorCode::DecodeFailed, e.to_string())
    }
}

impl From<AnalysisError> for CliError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::TooManyFindings { .. } => {
                Self::new(CliErrorCode::TooManyFindings, e.to_string())
            }
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DumpErrorCode;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::inconsistencies_found(2);
        assert_eq!(
            err.to_string(),
            "TXNDUMP_CLI_INCONSISTENCIES_FOUND: 2 inconsistencies found"
        );
    }

    #[test]
    fn test_from_dump_error_keeps_decode_code() {
        let err: CliError = DumpError::new(DumpErrorCode::UnknownCommand, "unknown command tag 9")
            .with_details("file DUMP.1")
            .into();
        assert_eq!(err.code(), &CliErrorCode::DecodeFailed);
        assert!(err.message().contains("TXNDUMP_UNKNOWN_COMMAND"));
        assert!(err.message().contains("DUMP.1"));
    }

    #[test]
    fn test_from_analysis_error() {
        let err: CliError = AnalysisError::TooManyFindings { limit: 10 }.into();
        assert_eq!(err.code_str(), "TXNDUMP_CLI_TOO_MANY_FINDINGS");
    }
}
