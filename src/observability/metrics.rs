//! Decode counters
//!
//! Counters only, monotonic, reset only on construction. Atomic with relaxed
//! ordering so a registry can be shared with a reporting thread.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::dump::CommandKind;

/// Counters for one analysis run
#[derive(Debug, Default)]
pub struct DumpMetrics {
    files_processed: AtomicU64,
    blocks_read: AtomicU64,
    bytes_read: AtomicU64,
    /// Indexed by command tag - 1
    commands: [AtomicU64; 7],
}

impl DumpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_files(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// One block of `bytes` bytes, including its length prefix
    pub fn record_block(&self, bytes: u64) {
        self.blocks_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_command(&self, kind: CommandKind) {
        self.commands[kind.as_u8() as usize - 1].fetch_add(1, Ordering::Relaxed);
    }

    pub fn commands_of(&self, kind: CommandKind) -> u64 {
        self.commands[kind.as_u8() as usize - 1].load(Ordering::Relaxed)
    }

    pub fn total_commands(&self) -> u64 {
        self.commands.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files: self.files_processed.load(Ordering::Relaxed),
            blocks: self.blocks_read.load(Ordering::Relaxed),
            bytes: self.bytes_read.load(Ordering::Relaxed),
            apply: self.commands_of(CommandKind::Apply),
            read: self.commands_of(CommandKind::Read),
            commit: self.commands_of(CommandKind::Commit),
            status: self.commands_of(CommandKind::Status),
            conflicts: self.commands_of(CommandKind::Conflicts),
            applied: self.commands_of(CommandKind::Applied),
            remove: self.commands_of(CommandKind::Remove),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub files: u64,
    pub blocks: u64,
    pub bytes: u64,
    pub apply: u64,
    pub read: u64,
    pub commit: u64,
    pub status: u64,
    pub conflicts: u64,
    pub applied: u64,
    pub remove: u64,
}
