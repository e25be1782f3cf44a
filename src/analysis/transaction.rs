//! Per-transaction state reconstructed from the dump

use std::fmt;
use std::io::{self, Write};

use crate::codec::{HybridTime, ReadHybridTime, TransactionId};
use crate::dump::CommitTimeReason;

/// One transaction checking the status of another.
///
/// Stored on the observed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLogEntry {
    pub read_time: ReadHybridTime,
    pub observer_id: TransactionId,
    pub observed_commit_time: HybridTime,
    pub reason: CommitTimeReason,
}

/// Free-form debug record attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnLogEntry {
    pub hybrid_time: HybridTime,
    pub op: &'static str,
    pub detail: String,
}

impl fmt::Display for TxnLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{} {}", self.hybrid_time, self.op)
        } else {
            write!(f, "{} {} {}", self.hybrid_time, self.op, self.detail)
        }
    }
}

/// Everything known about one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionState {
    pub id: TransactionId,
    pub involved_tablets: Option<u32>,
    /// Invalid until a commit record is seen
    pub commit_time: HybridTime,
    pub status_log: Vec<StatusLogEntry>,
    pub aborted: bool,
    pub log: Vec<TxnLogEntry>,
    pub applied_rows: u64,
    pub reads: u64,
}

impl TransactionState {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            involved_tablets: None,
            commit_time: HybridTime::INVALID,
            status_log: Vec::new(),
            aborted: false,
            log: Vec::new(),
            applied_rows: 0,
            reads: 0,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.commit_time.is_valid()
    }

    pub fn add_log(&mut self, hybrid_time: HybridTime, op: &'static str, detail: impl Into<String>) {
        self.log.push(TxnLogEntry {
            hybrid_time,
            op,
            detail: detail.into(),
        });
    }

    /// Debug log ordered by hybrid time; ties keep arrival order.
    pub fn sorted_log(&self) -> Vec<&TxnLogEntry> {
        let mut entries: Vec<_> = self.log.iter().collect();
        entries.sort_by_key(|entry| entry.hybrid_time);
        entries
    }

    /// Summary line followed by the sorted debug log.
    pub fn report<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "TXN: {}", self)?;
        for entry in self.sorted_log() {
            writeln!(writer, "  log: {}", entry)?;
        }
        Ok(())
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id: {} commit_time: {}", self.id, self.commit_time)?;
        if let Some(dt) = self.commit_time.to_datetime() {
            write!(f, " ({})", dt.format("%Y-%m-%d %H:%M:%S%.6f UTC"))?;
        }
        if let Some(tablets) = self.involved_tablets {
            write!(f, " tablets: {}", tablets)?;
        }
        if self.aborted {
            write!(f, " aborted")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> TransactionState {
        TransactionState::new(TransactionId::from_bytes([1; 16]))
    }

    #[test]
    fn test_fresh_state() {
        let txn = state();
        assert!(!txn.is_committed());
        assert!(!txn.aborted);
        assert!(txn.involved_tablets.is_none());
        assert!(txn.status_log.is_empty());
    }

    #[test]
    fn test_sorted_log_is_stable() {
        let mut txn = state();
        txn.add_log(HybridTime::from_repr(30), "applied", "");
        txn.add_log(HybridTime::from_repr(10), "see status", "first");
        txn.add_log(HybridTime::from_repr(10), "see status", "second");

        let ops: Vec<_> = txn.sorted_log().iter().map(|e| e.detail.as_str()).collect();
        assert_eq!(ops, vec!["first", "second", ""]);
    }

    #[test]
    fn test_report_format() {
        let mut txn = state();
        txn.commit_time = HybridTime::from_micros(5, 0);
        txn.involved_tablets = Some(2);
        txn.add_log(HybridTime::from_micros(6, 0), "applied", "");
        txn.add_log(HybridTime::from_micros(4, 0), "remove", "Applied");

        let mut out = Vec::new();
        txn.report(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("TXN: id: 01010101-0101-0101-0101-010101010101"));
        assert!(lines[0].contains("commit_time: { physical: 5 }"));
        assert!(lines[0].contains("tablets: 2"));
        assert_eq!(lines[1], "  log: { physical: 4 } remove Applied");
        assert_eq!(lines[2], "  log: { physical: 6 } applied");
    }
}
