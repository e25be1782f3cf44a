//! CLI command implementations
//!
//! Every command decodes the whole input first. A decode error stops the run
//! before any analysis output is produced.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::analysis::{AnalysisError, ConsistencyAnalyzer};
use crate::codec::TransactionId;
use crate::dump::DumpProcessor;
use crate::observability::{log_event_with_fields, Event, Logger, MetricsSnapshot, Severity};

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{write_json, write_report_to};

/// Final line of a report cut short by the finding limit
pub const TOO_MANY_FINDINGS_TRAILER: &str = "Too many errors, exiting";

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli)
}

/// Run the command described by already parsed arguments
pub fn run_command(cli: Cli) -> CliResult<()> {
    // stdout carries the JSON document for `stats`
    if cli.quiet || matches!(cli.command, Command::Stats { .. }) {
        Logger::set_min_severity(Severity::Warn);
    }

    let config = load_config(&cli)?;

    match cli.command {
        Command::Check { path } => check(&path, &config),
        Command::Stats { path } => stats(&path, &config),
        Command::Txn { path, id } => txn(&path, &id, &config),
    }
}

fn load_config(cli: &Cli) -> CliResult<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(max_findings) = cli.max_findings {
        config.max_findings = max_findings;
    }
    config.validate()?;

    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("file_prefix", &config.file_prefix),
            ("max_findings", &config.max_findings.to_string()),
            ("progress_interval", &config.progress_interval.to_string()),
        ],
    );
    Ok(config)
}

/// Decode every dump file under `path` into a fresh analyzer
pub fn decode(path: &Path, config: &Config) -> CliResult<DumpProcessor<ConsistencyAnalyzer>> {
    let path_str = path.display().to_string();
    log_event_with_fields(Event::RunStart, &[("path", &path_str)]);

    let mut processor = DumpProcessor::with_options(
        ConsistencyAnalyzer::new(config.max_findings),
        config.processor_options(),
    );

    if let Err(err) = processor.process(path) {
        log_event_with_fields(
            Event::DecodeFailed,
            &[("code", err.code().code()), ("path", &path_str)],
        );
        return Err(err.into());
    }

    let snapshot = processor.metrics().snapshot();
    log_event_with_fields(
        Event::DecodeComplete,
        &[
            ("files", &snapshot.files.to_string()),
            ("blocks", &snapshot.blocks.to_string()),
            ("commands", &processor.processed_commands().to_string()),
        ],
    );
    Ok(processor)
}

/// Decode, check status logs and report findings to stderr.
///
/// Succeeds only when the dump is free of findings.
pub fn check(path: &Path, config: &Config) -> CliResult<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    check_with_report(path, config, &mut out)
}

/// `check` with the findings report written to `report`
pub fn check_with_report<W: Write>(path: &Path, config: &Config, report: &mut W) -> CliResult<()> {
    let mut analyzer = decode(path, config)?.into_analyzer();

    log_event_with_fields(
        Event::CheckStart,
        &[("transactions", &analyzer.store().len().to_string())],
    );

    match analyzer.check_status_logs() {
        Ok(()) => {
            let findings = analyzer.findings().len();
            log_event_with_fields(Event::CheckComplete, &[("findings", &findings.to_string())]);
            write_report_to(&analyzer, None, report)?;
            if findings > 0 {
                return Err(CliError::inconsistencies_found(findings));
            }
            Ok(())
        }
        Err(err @ AnalysisError::TooManyFindings { .. }) => {
            log_event_with_fields(
                Event::FindingLimitReached,
                &[("limit", &analyzer.max_findings().to_string())],
            );
            write_report_to(&analyzer, Some(TOO_MANY_FINDINGS_TRAILER), report)?;
            Err(err.into())
        }
    }
}

/// Summary printed by `stats`
#[derive(Debug, Clone, Serialize)]
pub struct DumpStats {
    pub input: String,
    pub commands: u64,
    pub metrics: MetricsSnapshot,
    pub transactions: usize,
    pub committed: usize,
    pub aborted: usize,
}

/// Decode only and summarize what the dump contains
pub fn collect_stats(path: &Path, config: &Config) -> CliResult<DumpStats> {
    let processor = decode(path, config)?;
    let store = processor.analyzer().store();
    Ok(DumpStats {
        input: path.display().to_string(),
        commands: processor.processed_commands(),
        metrics: processor.metrics().snapshot(),
        transactions: store.len(),
        committed: store.committed_count(),
        aborted: store.aborted_count(),
    })
}

pub fn stats(path: &Path, config: &Config) -> CliResult<()> {
    let stats = collect_stats(path, config)?;
    write_json(&stats)
}

/// Print one transaction's summary and sorted debug log to stdout
pub fn txn(path: &Path, id: &str, config: &Config) -> CliResult<()> {
    let txn_id = TransactionId::parse(id)
        .map_err(|e| CliError::invalid_argument(format!("Invalid transaction id '{}': {}", id, e)))?;

    let processor = decode(path, config)?;
    let state = processor
        .analyzer()
        .transaction(&txn_id)
        .ok_or_else(|| CliError::transaction_not_found(id))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    state.report(&mut out)?;
    for entry in &state.status_log {
        writeln!(
            out,
            "  status: read {} by {} saw {} reason {:?}",
            entry.read_time, entry.observer_id, entry.observed_commit_time, entry.reason
        )?;
    }
    out.flush()?;
    Ok(())
}
