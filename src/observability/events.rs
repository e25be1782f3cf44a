//! Lifecycle events of a dump analysis run

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration loaded
    ConfigLoaded,
    /// Input path accepted, processing begins
    RunStart,
    /// Directory entry skipped for not carrying the dump prefix
    DumpFileSkipped,
    /// Periodic decode progress
    DumpProgress,
    /// All input decoded
    DecodeComplete,
    /// Fatal decode condition (run aborts)
    DecodeFailed,
    /// Global invariant check begins
    CheckStart,
    /// Global invariant check finished
    CheckComplete,
    /// Finding cap reached, run stops early
    FindingLimitReached,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::RunStart => "TXNDUMP_RUN_BEGIN",
            Event::DumpFileSkipped => "DUMP_FILE_SKIPPED",
            Event::DumpProgress => "DUMP_PROGRESS",
            Event::DecodeComplete => "DECODE_COMPLETE",
            Event::DecodeFailed => "DECODE_FAILED",
            Event::CheckStart => "CONSISTENCY_CHECK_BEGIN",
            Event::CheckComplete => "CONSISTENCY_CHECK_COMPLETE",
            Event::FindingLimitReached => "FINDING_LIMIT_REACHED",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::DecodeFailed | Event::FindingLimitReached)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
