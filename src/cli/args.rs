//! CLI argument definitions using clap
//!
//! Commands:
//! - txndump check <PATH>
//! - txndump stats <PATH>
//! - txndump txn <PATH> --id <UUID>
//!
//! `<PATH>` is a single dump file or a directory of prefixed dump files.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// txndump - decode transaction dumps and check commit status consistency
#[derive(Parser, Debug)]
#[command(name = "txndump")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Stop after this many findings (overrides the configuration file)
    #[arg(long, global = true)]
    pub max_findings: Option<usize>,

    /// Only log warnings and errors
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode the dump and check transaction status consistency
    Check {
        /// Dump file or directory
        path: PathBuf,
    },

    /// Decode the dump and print command statistics as JSON
    Stats {
        /// Dump file or directory
        path: PathBuf,
    },

    /// Decode the dump and print one transaction's state and log
    Txn {
        /// Dump file or directory
        path: PathBuf,

        /// Transaction id (UUID)
        #[arg(long)]
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["txndump", "check", "/tmp/dumps"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.quiet);
        match cli.command {
            Command::Check { path } => assert_eq!(path, PathBuf::from("/tmp/dumps")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "txndump",
            "stats",
            "DUMP.1",
            "--max-findings",
            "3",
            "--config",
            "txndump.json",
            "-q",
        ])
        .unwrap();
        assert_eq!(cli.max_findings, Some(3));
        assert_eq!(cli.config, Some(PathBuf::from("txndump.json")));
        assert!(cli.quiet);
    }

    #[test]
    fn test_txn_requires_id() {
        assert!(Cli::try_parse_from(["txndump", "txn", "DUMP.1"]).is_err());
        let cli = Cli::try_parse_from(["txndump", "txn", "DUMP.1", "--id", "abc"]).unwrap();
        match cli.command {
            Command::Txn { id, .. } => assert_eq!(id, "abc"),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
