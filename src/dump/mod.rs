//! # Transaction Dump Files
//!
//! Reading, decoding and replaying dump files into an `Analyzer`, and the
//! matching writer.
//!
//! Every malformed byte is fatal. The run stops at the first decode error
//! and reports the file and block offset it came from.

mod command;
mod processor;
mod reader;
mod writer;

pub use command::{
    AppliedCommand, ApplyCommand, Command, CommandKind, CommitCommand, CommitTimeReason,
    ConflictsCommand, ReadCommand, RemoveCommand, RemoveReason, StatusCommand,
    TransactionConflictData, TransactionStatus, WriteBatchEntry, WriteBatchEntryType,
};
pub use processor::{DumpProcessor, ProcessorOptions, DEFAULT_FILE_PREFIX, DEFAULT_PROGRESS_INTERVAL};
pub use reader::{DumpReader, RawBlock, BLOCK_HEADER_SIZE};
pub use writer::DumpWriter;
