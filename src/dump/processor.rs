//! Record dispatcher
//!
//! Drives dump files block by block and forwards every decoded command to an
//! `Analyzer`:
//! 1. Read a length-prefixed block (`DumpReader`)
//! 2. Decode the command; the block must be consumed exactly
//! 3. Apply the command's effect to the analyzer
//! 4. Count it, logging progress every `progress_interval` commands
//!
//! Any decode failure aborts the whole run. Files are processed one at a
//! time and each is closed before the next is opened.

use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::{Analyzer, StatusLogEntry};
use crate::codec::{DumpError, DumpErrorCode, DumpResult};
use crate::observability::{
    log_event_with_fields, DumpMetrics, Event, Logger, ObservationScope, Timer,
};

use super::command::Command;
use super::reader::{DumpReader, BLOCK_HEADER_SIZE};

/// Default file name prefix of dump files inside a directory
pub const DEFAULT_FILE_PREFIX: &str = "DUMP.";

/// Default number of commands between progress events
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOptions {
    pub file_prefix: String,
    pub progress_interval: u64,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

pub struct DumpProcessor<A: Analyzer> {
    analyzer: A,
    options: ProcessorOptions,
    metrics: DumpMetrics,
    processed_commands: u64,
    timer: Timer,
}

impl<A: Analyzer> DumpProcessor<A> {
    pub fn new(analyzer: A) -> Self {
        Self::with_options(analyzer, ProcessorOptions::default())
    }

    pub fn with_options(analyzer: A, options: ProcessorOptions) -> Self {
        Self {
            analyzer,
            options,
            metrics: DumpMetrics::new(),
            processed_commands: 0,
            timer: Timer::new(),
        }
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut A {
        &mut self.analyzer
    }

    pub fn into_analyzer(self) -> A {
        self.analyzer
    }

    pub fn metrics(&self) -> &DumpMetrics {
        &self.metrics
    }

    pub fn processed_commands(&self) -> u64 {
        self.processed_commands
    }

    /// Processes a single dump file, or every prefixed file of a directory.
    pub fn process(&mut self, path: &Path) -> DumpResult<()> {
        if path.is_dir() {
            for file in self.list_dump_files(path)? {
                self.process_file(&file)?;
            }
            Ok(())
        } else {
            self.process_file(path)
        }
    }

    /// Regular files whose name starts with the configured prefix, sorted by
    /// name.
    pub fn list_dump_files(&self, dir: &Path) -> DumpResult<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| {
            DumpError::io(format!("Failed to list dump directory: {}", dir.display()), e)
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                DumpError::io(format!("Failed to list dump directory: {}", dir.display()), e)
            })?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&self.options.file_prefix) && path.is_file() {
                files.push(path);
            } else {
                log_event_with_fields(Event::DumpFileSkipped, &[("name", &name)]);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Processes every block of one file.
    pub fn process_file(&mut self, path: &Path) -> DumpResult<()> {
        let path_str = path.display().to_string();
        let scope = ObservationScope::with_fields("DUMP_FILE", &[("path", &path_str)]);

        match self.process_blocks(path) {
            Ok(blocks) => {
                self.metrics.increment_files();
                scope.complete_with_fields(&[("blocks", &blocks.to_string())]);
                Ok(())
            }
            Err(err) => {
                let err = err.with_details(format!("file {}", path_str));
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    fn process_blocks(&mut self, path: &Path) -> DumpResult<u64> {
        let mut reader = DumpReader::open(path)?;
        let mut blocks = 0u64;

        while let Some(block) = reader.read_next()? {
            self.metrics
                .record_block(BLOCK_HEADER_SIZE + block.body.len() as u64);
            let command = Command::decode_block(&block.body)
                .map_err(|e| e.with_details(format!("block at offset {}", block.offset)))?;
            self.metrics.record_command(command.kind());
            self.execute(command)
                .map_err(|e| e.with_details(format!("block at offset {}", block.offset)))?;

            blocks += 1;
            self.processed_commands += 1;
            if self.options.progress_interval > 0
                && self.processed_commands % self.options.progress_interval == 0
            {
                log_event_with_fields(
                    Event::DumpProgress,
                    &[
                        ("commands", &self.processed_commands.to_string()),
                        ("elapsed_ms", &self.timer.elapsed_ms()),
                    ],
                );
            }
        }

        Ok(blocks)
    }

    /// Applies the effect of one decoded command.
    ///
    /// # Errors
    ///
    /// `TXNDUMP_COMMIT_TIME_MISMATCH` when a transaction is committed twice
    /// at different times.
    pub fn execute(&mut self, command: Command) -> DumpResult<()> {
        match command {
            Command::Apply(cmd) => {
                for entry in &cmd.entries {
                    self.analyzer
                        .apply_row(cmd.txn_id, &entry.key, &entry.value, cmd.log_ht);
                }
            }
            Command::Read(cmd) => {
                self.analyzer.read_value(
                    cmd.txn_id,
                    &cmd.key,
                    &cmd.value,
                    cmd.read_time.read,
                    cmd.write_time,
                    cmd.same_transaction,
                );
            }
            Command::Commit(cmd) => {
                let txn = self.analyzer.get_transaction(cmd.txn_id);
                if txn.commit_time.is_valid() {
                    if txn.commit_time != cmd.commit_time {
                        return Err(DumpError::new(
                            DumpErrorCode::CommitTimeMismatch,
                            format!(
                                "Wrong commit time {} vs {}",
                                cmd.commit_time, txn
                            ),
                        ));
                    }
                    Logger::trace(
                        "DUPLICATE_COMMIT",
                        &[("txn_id", &cmd.txn_id.to_string())],
                    );
                } else {
                    txn.commit_time = cmd.commit_time;
                    txn.involved_tablets = Some(cmd.involved_tablets);
                }
            }
            Command::Status(cmd) => {
                let detail = format!(
                    "{} {} {:?} {} {}",
                    cmd.observer_id, cmd.commit_time, cmd.reason, cmd.status_time, cmd.safe_time
                );
                let txn = self.analyzer.get_transaction(cmd.txn_id);
                txn.status_log.push(StatusLogEntry {
                    read_time: cmd.read_time,
                    observer_id: cmd.observer_id,
                    observed_commit_time: cmd.commit_time,
                    reason: cmd.reason,
                });
                txn.add_log(cmd.read_time.read, "status check by", detail);

                let detail = format!(
                    "{} {} {:?} {} {}",
                    cmd.txn_id, cmd.commit_time, cmd.reason, cmd.status_time, cmd.safe_time
                );
                self.analyzer
                    .get_transaction(cmd.observer_id)
                    .add_log(cmd.read_time.read, "see status", detail);
            }
            Command::Conflicts(cmd) => {
                let txn = self.analyzer.get_transaction(cmd.txn_id);
                if !cmd.hybrid_time.is_valid() {
                    txn.aborted = true;
                }
                for data in &cmd.conflicts {
                    self.analyzer
                        .get_transaction(cmd.txn_id)
                        .add_log(cmd.hybrid_time, "see conflict", data.to_string());
                    self.analyzer.get_transaction(data.id).add_log(
                        cmd.hybrid_time,
                        "conflict check by",
                        format!("{} {}", cmd.txn_id, data),
                    );
                }
            }
            Command::Applied(cmd) => {
                self.analyzer
                    .get_transaction(cmd.txn_id)
                    .add_log(cmd.hybrid_time, "applied", "");
            }
            Command::Remove(cmd) => {
                self.analyzer.get_transaction(cmd.txn_id).add_log(
                    cmd.hybrid_time,
                    "remove",
                    format!("{:?}", cmd.reason),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ConsistencyAnalyzer, TransactionState};
    use crate::codec::{HybridTime, ReadHybridTime, TransactionId};
    use crate::dump::command::{
        CommitCommand, CommitTimeReason, ConflictsCommand, RemoveCommand, RemoveReason,
        StatusCommand, TransactionConflictData,
    };

    fn id(n: u8) -> TransactionId {
        TransactionId::from_bytes([n; 16])
    }

    fn ht(micros: u64) -> HybridTime {
        HybridTime::from_micros(micros, 0)
    }

    fn processor() -> DumpProcessor<ConsistencyAnalyzer> {
        DumpProcessor::new(ConsistencyAnalyzer::default())
    }

    fn state(p: &DumpProcessor<ConsistencyAnalyzer>, txn: TransactionId) -> &TransactionState {
        p.analyzer().transaction(&txn).unwrap()
    }

    fn commit(txn: TransactionId, at: HybridTime) -> Command {
        Command::Commit(CommitCommand {
            txn_id: txn,
            commit_time: at,
            involved_tablets: 3,
        })
    }

    #[test]
    fn test_commit_sets_time_once() {
        let mut p = processor();
        p.execute(commit(id(1), ht(10))).unwrap();
        p.execute(commit(id(1), ht(10))).unwrap();
        assert_eq!(state(&p, id(1)).commit_time, ht(10));
        assert_eq!(state(&p, id(1)).involved_tablets, Some(3));

        let err = p.execute(commit(id(1), ht(11))).unwrap_err();
        assert_eq!(err.code(), DumpErrorCode::CommitTimeMismatch);
        assert_eq!(state(&p, id(1)).commit_time, ht(10));
    }

    #[test]
    fn test_status_is_recorded_on_observed_transaction() {
        let mut p = processor();
        p.execute(Command::Status(StatusCommand {
            observer_id: id(2),
            read_time: ReadHybridTime::single_time(ht(20)),
            txn_id: id(1),
            commit_time: HybridTime::MIN,
            reason: CommitTimeReason::LocalBefore,
            status_time: ht(19),
            safe_time: ht(18),
        }))
        .unwrap();

        let observed = state(&p, id(1));
        assert_eq!(observed.status_log.len(), 1);
        assert_eq!(observed.status_log[0].observer_id, id(2));
        assert_eq!(observed.log[0].op, "status check by");

        let observer = state(&p, id(2));
        assert!(observer.status_log.is_empty());
        assert_eq!(observer.log[0].op, "see status");
    }

    #[test]
    fn test_conflicts_with_invalid_time_abort() {
        let mut p = processor();
        p.execute(Command::Conflicts(ConflictsCommand {
            txn_id: id(1),
            hybrid_time: HybridTime::INVALID,
            conflicts: vec![TransactionConflictData::new(id(2))],
        }))
        .unwrap();

        assert!(state(&p, id(1)).aborted);
        assert!(!state(&p, id(2)).aborted);
        assert_eq!(state(&p, id(1)).log[0].op, "see conflict");
        assert_eq!(state(&p, id(2)).log[0].op, "conflict check by");
    }

    #[test]
    fn test_conflicts_with_valid_time_keep_transaction_alive() {
        let mut p = processor();
        p.execute(Command::Conflicts(ConflictsCommand {
            txn_id: id(1),
            hybrid_time: ht(5),
            conflicts: vec![],
        }))
        .unwrap();
        assert!(!state(&p, id(1)).aborted);
    }

    #[test]
    fn test_remove_logs_reason() {
        let mut p = processor();
        p.execute(Command::Remove(RemoveCommand {
            txn_id: id(1),
            hybrid_time: ht(5),
            reason: RemoveReason::AbortReceived,
        }))
        .unwrap();
        let log = &state(&p, id(1)).log[0];
        assert_eq!(log.op, "remove");
        assert_eq!(log.detail, "AbortReceived");
    }
}
