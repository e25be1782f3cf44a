//! Dump command kinds and their payload layouts
//!
//! A block body is a one-byte command tag followed by the payload:
//!
//! | Tag | Command   | Payload                                                            |
//! |-----|-----------|--------------------------------------------------------------------|
//! | 1   | Apply     | txn id, log ht, seq no (i64), count (i32), entries                 |
//! | 2   | Read      | txn id, read ht, doc ht, same txn, key (u64 len), value (u64 len)  |
//! | 3   | Commit    | txn id, commit ht, tablets (u32)                                   |
//! | 4   | Status    | observer id, read ht, txn id, commit ht, reason, status ht, safe ht|
//! | 5   | Conflicts | txn id, ht, conflict data until end of block                       |
//! | 6   | Applied   | txn id, ht                                                         |
//! | 7   | Remove    | txn id, ht, reason                                                 |
//!
//! Every enumeration is closed; an out-of-range byte is `TXNDUMP_INVALID_ENUM_TAG`.

use std::fmt;

use crate::codec::{
    BinaryReader, BinaryWriter, DocHybridTime, DumpError, DumpErrorCode, DumpResult, HybridTime,
    ReadHybridTime, SubDocKey, TransactionId, Value,
};

/// Command tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CommandKind {
    Apply = 1,
    Read = 2,
    Commit = 3,
    Status = 4,
    Conflicts = 5,
    Applied = 6,
    Remove = 7,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        CommandKind::Apply,
        CommandKind::Read,
        CommandKind::Commit,
        CommandKind::Status,
        CommandKind::Conflicts,
        CommandKind::Applied,
        CommandKind::Remove,
    ];

    /// Convert from u8, returns None for unknown tags
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(CommandKind::Apply),
            2 => Some(CommandKind::Read),
            3 => Some(CommandKind::Commit),
            4 => Some(CommandKind::Status),
            5 => Some(CommandKind::Conflicts),
            6 => Some(CommandKind::Applied),
            7 => Some(CommandKind::Remove),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Apply => "apply",
            CommandKind::Read => "read",
            CommandKind::Commit => "commit",
            CommandKind::Status => "status",
            CommandKind::Conflicts => "conflicts",
            CommandKind::Applied => "applied",
            CommandKind::Remove => "remove",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a status check resolved to the commit time it reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommitTimeReason {
    LocalBefore = 0,
    NoMetadata = 1,
    LocalAfter = 2,
    RemoteAborted = 3,
    RemoteCommitted = 4,
    RemotePending = 5,
}

impl CommitTimeReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CommitTimeReason::LocalBefore),
            1 => Some(CommitTimeReason::NoMetadata),
            2 => Some(CommitTimeReason::LocalAfter),
            3 => Some(CommitTimeReason::RemoteAborted),
            4 => Some(CommitTimeReason::RemoteCommitted),
            5 => Some(CommitTimeReason::RemotePending),
            _ => None,
        }
    }

    fn decode(reader: &mut BinaryReader<'_>) -> DumpResult<Self> {
        let value = reader.read_u8()?;
        Self::from_u8(value)
            .ok_or_else(|| DumpError::invalid_enum_tag("commit time reason", value.into()))
    }
}

/// Why a transaction was removed from the participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RemoveReason {
    Applied = 0,
    LargeApplied = 1,
    ProcessCleanup = 2,
    StatusReceived = 3,
    AbortReceived = 4,
}

impl RemoveReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RemoveReason::Applied),
            1 => Some(RemoveReason::LargeApplied),
            2 => Some(RemoveReason::ProcessCleanup),
            3 => Some(RemoveReason::StatusReceived),
            4 => Some(RemoveReason::AbortReceived),
            _ => None,
        }
    }

    fn decode(reader: &mut BinaryReader<'_>) -> DumpResult<Self> {
        let value = reader.read_u8()?;
        Self::from_u8(value)
            .ok_or_else(|| DumpError::invalid_enum_tag("remove reason", value.into()))
    }
}

/// Write batch record types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WriteBatchEntryType {
    Deletion = 0x0,
    Value = 0x1,
    Merge = 0x2,
    LogData = 0x3,
    ColumnFamilyDeletion = 0x4,
    ColumnFamilyValue = 0x5,
    ColumnFamilyMerge = 0x6,
    SingleDeletion = 0x7,
    ColumnFamilySingleDeletion = 0x8,
}

impl WriteBatchEntryType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(WriteBatchEntryType::Deletion),
            0x1 => Some(WriteBatchEntryType::Value),
            0x2 => Some(WriteBatchEntryType::Merge),
            0x3 => Some(WriteBatchEntryType::LogData),
            0x4 => Some(WriteBatchEntryType::ColumnFamilyDeletion),
            0x5 => Some(WriteBatchEntryType::ColumnFamilyValue),
            0x6 => Some(WriteBatchEntryType::ColumnFamilyMerge),
            0x7 => Some(WriteBatchEntryType::SingleDeletion),
            0x8 => Some(WriteBatchEntryType::ColumnFamilySingleDeletion),
            _ => None,
        }
    }
}

/// Transaction status as reported by a conflict check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TransactionStatus {
    Unknown = 0,
    Created = 1,
    Pending = 2,
    Committed = 4,
    Sealed = 5,
    AppliedInAllInvolvedTablets = 7,
    Aborted = 8,
    Applying = 20,
    AppliedInOneOfInvolvedTablets = 21,
    ImmediateCleanup = 22,
    GracefulCleanup = 23,
}

impl TransactionStatus {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(TransactionStatus::Unknown),
            1 => Some(TransactionStatus::Created),
            2 => Some(TransactionStatus::Pending),
            4 => Some(TransactionStatus::Committed),
            5 => Some(TransactionStatus::Sealed),
            7 => Some(TransactionStatus::AppliedInAllInvolvedTablets),
            8 => Some(TransactionStatus::Aborted),
            20 => Some(TransactionStatus::Applying),
            21 => Some(TransactionStatus::AppliedInOneOfInvolvedTablets),
            22 => Some(TransactionStatus::ImmediateCleanup),
            23 => Some(TransactionStatus::GracefulCleanup),
            _ => None,
        }
    }
}

/// One transaction examined during a conflict check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionConflictData {
    pub id: TransactionId,
    pub status: TransactionStatus,
    pub commit_time: HybridTime,
    pub priority: u64,
    pub failed: bool,
}

impl TransactionConflictData {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            status: TransactionStatus::Unknown,
            commit_time: HybridTime::INVALID,
            priority: 0,
            failed: false,
        }
    }

    /// Decodes the next entry, `None` at the end of the group.
    pub fn decode(reader: &mut BinaryReader<'_>) -> DumpResult<Option<Self>> {
        let id = match TransactionId::decode_optional(reader)? {
            Some(id) => id,
            None => return Ok(None),
        };
        let raw_status = reader.read_u32()?;
        let status = TransactionStatus::from_u32(raw_status)
            .ok_or_else(|| DumpError::invalid_enum_tag("transaction status", raw_status.into()))?;
        // Struct padding
        reader.read_u32()?;
        let commit_time = HybridTime::decode(reader)?;
        let priority = reader.read_u64()?;
        let failed = reader.read_u64()? != 0;
        Ok(Some(Self {
            id,
            status,
            commit_time,
            priority,
            failed,
        }))
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        self.id.encode(writer);
        writer.put_u32(self.status as u32);
        writer.put_u32(0);
        self.commit_time.encode(writer);
        writer.put_u64(self.priority);
        writer.put_u64(u64::from(self.failed));
    }
}

impl fmt::Display for TransactionConflictData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ id: {} status: {:?} commit_time: {} priority: {} failed: {} }}",
            self.id, self.status, self.commit_time, self.priority, self.failed
        )
    }
}

/// Plain value write from an applied write batch
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatchEntry {
    pub key: SubDocKey,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyCommand {
    pub txn_id: TransactionId,
    pub log_ht: HybridTime,
    /// Write batch sequence number, not used by the analysis
    pub sequence_number: i64,
    pub entries: Vec<WriteBatchEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadCommand {
    pub txn_id: TransactionId,
    pub read_time: ReadHybridTime,
    pub write_time: DocHybridTime,
    pub same_transaction: bool,
    pub key: SubDocKey,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCommand {
    pub txn_id: TransactionId,
    pub commit_time: HybridTime,
    pub involved_tablets: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCommand {
    pub observer_id: TransactionId,
    pub read_time: ReadHybridTime,
    pub txn_id: TransactionId,
    pub commit_time: HybridTime,
    pub reason: CommitTimeReason,
    pub status_time: HybridTime,
    pub safe_time: HybridTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictsCommand {
    pub txn_id: TransactionId,
    pub hybrid_time: HybridTime,
    pub conflicts: Vec<TransactionConflictData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCommand {
    pub txn_id: TransactionId,
    pub hybrid_time: HybridTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveCommand {
    pub txn_id: TransactionId,
    pub hybrid_time: HybridTime,
    pub reason: RemoveReason,
}

/// A decoded dump command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Apply(ApplyCommand),
    Read(ReadCommand),
    Commit(CommitCommand),
    Status(StatusCommand),
    Conflicts(ConflictsCommand),
    Applied(AppliedCommand),
    Remove(RemoveCommand),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Apply(_) => CommandKind::Apply,
            Command::Read(_) => CommandKind::Read,
            Command::Commit(_) => CommandKind::Commit,
            Command::Status(_) => CommandKind::Status,
            Command::Conflicts(_) => CommandKind::Conflicts,
            Command::Applied(_) => CommandKind::Applied,
            Command::Remove(_) => CommandKind::Remove,
        }
    }

    /// Decodes one block body.
    ///
    /// The body must be consumed exactly; leftover bytes mean the decoder
    /// and the producer disagree on the format.
    pub fn decode_block(body: &[u8]) -> DumpResult<Self> {
        let mut reader = BinaryReader::new(body);
        let tag = reader.read_u8()?;
        let kind = CommandKind::from_u8(tag).ok_or_else(|| DumpError::unknown_command(tag))?;
        let command = Self::decode_payload(kind, &mut reader)?;
        let left = reader.read_rest();
        if !left.is_empty() {
            return Err(DumpError::trailing_data(tag, left));
        }
        Ok(command)
    }

    fn decode_payload(kind: CommandKind, reader: &mut BinaryReader<'_>) -> DumpResult<Self> {
        let command = match kind {
            CommandKind::Apply => Command::Apply(decode_apply(reader)?),
            CommandKind::Read => Command::Read(decode_read(reader)?),
            CommandKind::Commit => Command::Commit(CommitCommand {
                txn_id: TransactionId::decode(reader)?,
                commit_time: HybridTime::decode(reader)?,
                involved_tablets: reader.read_u32()?,
            }),
            CommandKind::Status => Command::Status(StatusCommand {
                observer_id: TransactionId::decode(reader)?,
                read_time: ReadHybridTime::decode(reader)?,
                txn_id: TransactionId::decode(reader)?,
                commit_time: HybridTime::decode(reader)?,
                reason: CommitTimeReason::decode(reader)?,
                status_time: HybridTime::decode(reader)?,
                safe_time: HybridTime::decode(reader)?,
            }),
            CommandKind::Conflicts => {
                let txn_id = TransactionId::decode(reader)?;
                let hybrid_time = HybridTime::decode(reader)?;
                let mut conflicts = Vec::new();
                while let Some(data) = TransactionConflictData::decode(reader)? {
                    conflicts.push(data);
                }
                Command::Conflicts(ConflictsCommand {
                    txn_id,
                    hybrid_time,
                    conflicts,
                })
            }
            CommandKind::Applied => Command::Applied(AppliedCommand {
                txn_id: TransactionId::decode(reader)?,
                hybrid_time: HybridTime::decode(reader)?,
            }),
            CommandKind::Remove => Command::Remove(RemoveCommand {
                txn_id: TransactionId::decode(reader)?,
                hybrid_time: HybridTime::decode(reader)?,
                reason: RemoveReason::decode(reader)?,
            }),
        };
        Ok(command)
    }

    /// Encodes the block body (tag and payload, without the length prefix).
    pub fn encode_block(&self) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        w.put_u8(self.kind().as_u8());
        match self {
            Command::Apply(cmd) => {
                cmd.txn_id.encode(&mut w);
                cmd.log_ht.encode(&mut w);
                w.put_i64(cmd.sequence_number);
                w.put_i32(cmd.entries.len() as i32);
                for entry in &cmd.entries {
                    w.put_u8(WriteBatchEntryType::Value as u8);
                    w.put_varbytes(&entry.key.encode());
                    w.put_varbytes(&entry.value.encode());
                }
            }
            Command::Read(cmd) => {
                cmd.txn_id.encode(&mut w);
                cmd.read_time.encode(&mut w);
                cmd.write_time.encode(&mut w);
                w.put_bool(cmd.same_transaction);
                w.put_sized_bytes(&cmd.key.encode());
                w.put_sized_bytes(&cmd.value.encode());
            }
            Command::Commit(cmd) => {
                cmd.txn_id.encode(&mut w);
                cmd.commit_time.encode(&mut w);
                w.put_u32(cmd.involved_tablets);
            }
            Command::Status(cmd) => {
                cmd.observer_id.encode(&mut w);
                cmd.read_time.encode(&mut w);
                cmd.txn_id.encode(&mut w);
                cmd.commit_time.encode(&mut w);
                w.put_u8(cmd.reason as u8);
                cmd.status_time.encode(&mut w);
                cmd.safe_time.encode(&mut w);
            }
            Command::Conflicts(cmd) => {
                cmd.txn_id.encode(&mut w);
                cmd.hybrid_time.encode(&mut w);
                for data in &cmd.conflicts {
                    data.encode(&mut w);
                }
            }
            Command::Applied(cmd) => {
                cmd.txn_id.encode(&mut w);
                cmd.hybrid_time.encode(&mut w);
            }
            Command::Remove(cmd) => {
                cmd.txn_id.encode(&mut w);
                cmd.hybrid_time.encode(&mut w);
                w.put_u8(cmd.reason as u8);
            }
        }
        w.into_bytes()
    }
}

fn decode_apply(reader: &mut BinaryReader<'_>) -> DumpResult<ApplyCommand> {
    let txn_id = TransactionId::decode(reader)?;
    let log_ht = HybridTime::decode(reader)?;
    let sequence_number = reader.read_i64()?;
    let count = reader.read_i32()?;
    if count < 0 {
        return Err(DumpError::new(
            DumpErrorCode::InvalidLength,
            format!("negative write batch entry count {}", count),
        ));
    }

    // Every entry takes at least one byte; never trust the count for allocation
    let mut entries = Vec::with_capacity((count as usize).min(reader.remaining()));
    for _ in 0..count {
        let raw_type = reader.read_u8()?;
        let entry_type = WriteBatchEntryType::from_u8(raw_type)
            .ok_or_else(|| DumpError::invalid_enum_tag("write batch entry type", raw_type.into()))?;
        if entry_type != WriteBatchEntryType::Value {
            return Err(DumpError::unsupported_write_entry(entry_type));
        }
        let key = SubDocKey::decode(reader.read_varbytes()?, true)?;
        let value = Value::decode(reader.read_varbytes()?)?;
        entries.push(WriteBatchEntry { key, value });
    }

    Ok(ApplyCommand {
        txn_id,
        log_ht,
        sequence_number,
        entries,
    })
}

fn decode_read(reader: &mut BinaryReader<'_>) -> DumpResult<ReadCommand> {
    let txn_id = TransactionId::decode(reader)?;
    let read_time = ReadHybridTime::decode(reader)?;
    let write_time = DocHybridTime::decode(reader)?;
    let same_transaction = reader.read_bool()?;
    let key = SubDocKey::decode(reader.read_sized_bytes()?, false)?;
    let value = Value::decode(reader.read_sized_bytes()?)?;
    Ok(ReadCommand {
        txn_id,
        read_time,
        write_time,
        same_transaction,
        key,
        value,
    })
}
