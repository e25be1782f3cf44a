//! CLI module for txndump
//!
//! Provides command-line interface for:
//! - check: Decode a dump and verify commit status consistency
//! - stats: Decode a dump and print command counts as JSON
//! - txn: Decode a dump and show one transaction

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    check, check_with_report, collect_stats, decode, run, run_command, stats, txn, DumpStats,
    TOO_MANY_FINDINGS_TRAILER,
};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_json, write_report_to};
