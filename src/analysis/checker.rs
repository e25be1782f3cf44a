//! # Consistency Checker
//!
//! Cross-checks what transactions reported about each other's commit status
//! against the commit records in the dump. Runs once, after every dump file
//! has been decoded.
//!
//! For every status check `e` recorded on transaction `T`, skipping checks
//! whose observer is known to be aborted:
//!
//! | `T` committed | Observed commit         | Extra condition                      | Finding                  |
//! |---------------|-------------------------|--------------------------------------|--------------------------|
//! | yes           | valid, != commit time   |                                      | commit time mismatch     |
//! | yes           | minimum                 | read >= commit, reason != NoMetadata | commit not seen          |
//! | yes           | otherwise               | reason == RemoteAborted              | committed seen aborted   |
//! | no            | valid, not minimum      |                                      | aborted seen committed   |
//!
//! Findings are bounded. Reaching the limit stops the check with
//! `AnalysisError::TooManyFindings`; everything recorded so far is still
//! reportable.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};

use crate::codec::{DocHybridTime, HybridTime, SubDocKey, TransactionId, Value};
use crate::dump::CommitTimeReason;

use super::analyzer::Analyzer;
use super::errors::{AnalysisError, AnalysisResult};
use super::store::TransactionStore;
use super::transaction::{StatusLogEntry, TransactionState};

/// Default bound on recorded findings
pub const DEFAULT_MAX_FINDINGS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    /// Observer saw a commit time different from the recorded one
    CommitTimeMismatch,
    /// Observer read after the commit but did not see it
    CommitNotSeen,
    /// Observer was told a committed transaction aborted
    CommittedSeenAsAborted,
    /// Observer saw a commit that never happened
    AbortedSeenAsCommitted,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::CommitTimeMismatch => "commit_time_mismatch",
            FindingKind::CommitNotSeen => "commit_not_seen",
            FindingKind::CommittedSeenAsAborted => "committed_seen_as_aborted",
            FindingKind::AbortedSeenAsCommitted => "aborted_seen_as_committed",
        }
    }
}

/// One recorded inconsistency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Read time of the offending status check
    pub hybrid_time: HybridTime,
    /// Observed transaction
    pub txn_id: TransactionId,
    pub kind: FindingKind,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.hybrid_time, self.message)
    }
}

/// Bounded finding buffer plus the transactions marked for report.
#[derive(Debug)]
struct FindingLog {
    findings: Vec<Finding>,
    reported: Vec<TransactionId>,
    reported_set: HashSet<TransactionId>,
    limit: usize,
}

impl FindingLog {
    fn new(limit: usize) -> Self {
        Self {
            findings: Vec::new(),
            reported: Vec::new(),
            reported_set: HashSet::new(),
            limit,
        }
    }

    fn record(&mut self, finding: Finding) -> AnalysisResult<()> {
        if self.reported_set.insert(finding.txn_id) {
            self.reported.push(finding.txn_id);
        }
        self.findings.push(finding);
        if self.findings.len() >= self.limit {
            return Err(AnalysisError::TooManyFindings { limit: self.limit });
        }
        Ok(())
    }
}

/// Production analyzer: registry of transaction states plus the global check.
#[derive(Debug)]
pub struct ConsistencyAnalyzer {
    store: TransactionStore,
    findings: FindingLog,
}

impl Default for ConsistencyAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FINDINGS)
    }
}

impl ConsistencyAnalyzer {
    /// `max_findings` of zero is treated as one.
    pub fn new(max_findings: usize) -> Self {
        Self {
            store: TransactionStore::new(),
            findings: FindingLog::new(max_findings.max(1)),
        }
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<&TransactionState> {
        self.store.get(id)
    }

    /// Findings in recording order
    pub fn findings(&self) -> &[Finding] {
        &self.findings.findings
    }

    pub fn has_findings(&self) -> bool {
        !self.findings.findings.is_empty()
    }

    pub fn max_findings(&self) -> usize {
        self.findings.limit
    }

    /// Transactions marked for report, in the order they were first marked
    pub fn reported_transactions(&self) -> &[TransactionId] {
        &self.findings.reported
    }

    /// Runs the global invariant check over the complete registry.
    pub fn check_status_logs(&mut self) -> AnalysisResult<()> {
        let Self { store, findings } = self;
        for txn in store.iter() {
            for entry in &txn.status_log {
                let observer_aborted = store
                    .get(&entry.observer_id)
                    .map(|observer| observer.aborted)
                    .unwrap_or(false);
                if observer_aborted {
                    continue;
                }
                if let Some(finding) = Self::check_entry(txn, entry) {
                    findings.record(finding)?;
                }
            }
        }
        Ok(())
    }

    fn check_entry(txn: &TransactionState, entry: &StatusLogEntry) -> Option<Finding> {
        let seen = entry.observed_commit_time;
        let read = entry.read_time.read;
        let observed_commit = seen.is_valid() && !seen.is_min();

        let (kind, message) = if txn.is_committed() {
            if observed_commit && seen != txn.commit_time {
                (
                    FindingKind::CommitTimeMismatch,
                    format!(
                        "Seen commit time mismatch: {} vs {} of {} by {}",
                        seen, txn.commit_time, txn.id, entry.observer_id
                    ),
                )
            } else if seen.is_min()
                && read >= txn.commit_time
                && entry.reason != CommitTimeReason::NoMetadata
            {
                (
                    FindingKind::CommitNotSeen,
                    format!(
                        "Did not see commit of {} at {} by {} reason {:?}",
                        txn.id, txn.commit_time, entry.observer_id, entry.reason
                    ),
                )
            } else if !observed_commit && entry.reason == CommitTimeReason::RemoteAborted {
                (
                    FindingKind::CommittedSeenAsAborted,
                    format!(
                        "Committed transaction {} seen as aborted at {} by {}",
                        txn.id, read, entry.observer_id
                    ),
                )
            } else {
                return None;
            }
        } else if observed_commit {
            (
                FindingKind::AbortedSeenAsCommitted,
                format!(
                    "Aborted transaction seen as committed: {} by {} at {}",
                    txn.id, entry.observer_id, seen
                ),
            )
        } else {
            return None;
        };

        Some(Finding {
            hybrid_time: read,
            txn_id: txn.id,
            kind,
            message,
        })
    }

    /// Findings sorted by hybrid time, then every transaction marked for
    /// report with its sorted debug log.
    pub fn report<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut sorted: Vec<&Finding> = self.findings.findings.iter().collect();
        sorted.sort_by_key(|finding| finding.hybrid_time);
        for finding in sorted {
            writeln!(writer, "{}", finding)?;
        }
        for id in &self.findings.reported {
            if let Some(txn) = self.store.get(id) {
                txn.report(writer)?;
            }
        }
        Ok(())
    }
}

impl Analyzer for ConsistencyAnalyzer {
    fn get_transaction(&mut self, id: TransactionId) -> &mut TransactionState {
        self.store.get_or_create(id)
    }

    fn apply_row(&mut self, txn_id: TransactionId, key: &SubDocKey, value: &Value, log_ht: HybridTime) {
        let txn = self.store.get_or_create(txn_id);
        txn.applied_rows += 1;
        txn.add_log(log_ht, "apply", format!("{} => {}", key, value));
    }

    fn read_value(
        &mut self,
        txn_id: TransactionId,
        key: &SubDocKey,
        value: &Value,
        read_time: HybridTime,
        write_time: DocHybridTime,
        same_transaction: bool,
    ) {
        let txn = self.store.get_or_create(txn_id);
        txn.reads += 1;
        let mut detail = format!("{} => {} written at {}", key, value, write_time);
        if same_transaction {
            detail.push_str(" (same transaction)");
        }
        txn.add_log(read_time, "read", detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DocKey, PrimitiveValue, ReadHybridTime};

    fn id(n: u8) -> TransactionId {
        TransactionId::from_bytes([n; 16])
    }

    fn ht(micros: u64) -> HybridTime {
        HybridTime::from_micros(micros, 0)
    }

    fn commit(analyzer: &mut ConsistencyAnalyzer, txn: TransactionId, at: HybridTime) {
        analyzer.get_transaction(txn).commit_time = at;
    }

    fn status(
        analyzer: &mut ConsistencyAnalyzer,
        observed: TransactionId,
        observer: TransactionId,
        read: HybridTime,
        seen: HybridTime,
        reason: CommitTimeReason,
    ) {
        analyzer.get_transaction(observer);
        analyzer.get_transaction(observed).status_log.push(StatusLogEntry {
            read_time: ReadHybridTime::single_time(read),
            observer_id: observer,
            observed_commit_time: seen,
            reason,
        });
    }

    fn kinds(analyzer: &ConsistencyAnalyzer) -> Vec<FindingKind> {
        analyzer.findings().iter().map(|f| f.kind).collect()
    }

    #[test]
    fn test_empty_registry_has_no_findings() {
        let mut analyzer = ConsistencyAnalyzer::default();
        analyzer.check_status_logs().unwrap();
        assert!(!analyzer.has_findings());
    }

    #[test]
    fn test_commit_not_seen() {
        let mut analyzer = ConsistencyAnalyzer::default();
        commit(&mut analyzer, id(1), ht(10));
        status(&mut analyzer, id(1), id(2), ht(20), HybridTime::MIN, CommitTimeReason::LocalBefore);

        analyzer.check_status_logs().unwrap();
        assert_eq!(kinds(&analyzer), vec![FindingKind::CommitNotSeen]);
        assert_eq!(analyzer.findings()[0].hybrid_time, ht(20));
        assert_eq!(analyzer.reported_transactions(), &[id(1)]);
    }

    #[test]
    fn test_commit_not_seen_excused_without_metadata() {
        let mut analyzer = ConsistencyAnalyzer::default();
        commit(&mut analyzer, id(1), ht(10));
        status(&mut analyzer, id(1), id(2), ht(20), HybridTime::MIN, CommitTimeReason::NoMetadata);

        analyzer.check_status_logs().unwrap();
        assert!(!analyzer.has_findings());
    }

    #[test]
    fn test_read_before_commit_is_fine() {
        let mut analyzer = ConsistencyAnalyzer::default();
        commit(&mut analyzer, id(1), ht(10));
        status(&mut analyzer, id(1), id(2), ht(5), HybridTime::MIN, CommitTimeReason::LocalBefore);

        analyzer.check_status_logs().unwrap();
        assert!(!analyzer.has_findings());
    }

    #[test]
    fn test_commit_time_mismatch() {
        let mut analyzer = ConsistencyAnalyzer::default();
        commit(&mut analyzer, id(1), ht(10));
        status(&mut analyzer, id(1), id(2), ht(20), ht(11), CommitTimeReason::RemoteCommitted);
        status(&mut analyzer, id(1), id(3), ht(20), ht(10), CommitTimeReason::RemoteCommitted);

        analyzer.check_status_logs().unwrap();
        assert_eq!(kinds(&analyzer), vec![FindingKind::CommitTimeMismatch]);
        assert!(analyzer.findings()[0].message.starts_with("Seen commit time mismatch"));
    }

    #[test]
    fn test_committed_seen_as_aborted() {
        let mut analyzer = ConsistencyAnalyzer::default();
        commit(&mut analyzer, id(1), ht(10));
        status(&mut analyzer, id(1), id(2), ht(20), HybridTime::INVALID, CommitTimeReason::RemoteAborted);

        analyzer.check_status_logs().unwrap();
        assert_eq!(kinds(&analyzer), vec![FindingKind::CommittedSeenAsAborted]);
    }

    #[test]
    fn test_matching_commit_time_is_not_seen_as_aborted() {
        let mut analyzer = ConsistencyAnalyzer::default();
        commit(&mut analyzer, id(1), ht(10));
        status(&mut analyzer, id(1), id(2), ht(20), ht(10), CommitTimeReason::RemoteAborted);

        analyzer.check_status_logs().unwrap();
        assert!(!analyzer.has_findings());
    }

    #[test]
    fn test_uncommitted_seen_as_committed() {
        let mut analyzer = ConsistencyAnalyzer::default();
        status(&mut analyzer, id(1), id(2), ht(20), ht(15), CommitTimeReason::RemoteCommitted);

        analyzer.check_status_logs().unwrap();
        assert_eq!(kinds(&analyzer), vec![FindingKind::AbortedSeenAsCommitted]);
        assert_eq!(
            analyzer.findings()[0].to_string(),
            format!(
                "{}: Aborted transaction seen as committed: {} by {} at {}",
                ht(20),
                id(1),
                id(2),
                ht(15)
            )
        );
    }

    #[test]
    fn test_uncommitted_seen_without_commit_is_fine() {
        let mut analyzer = ConsistencyAnalyzer::default();
        status(&mut analyzer, id(1), id(2), ht(20), HybridTime::MIN, CommitTimeReason::LocalBefore);
        status(&mut analyzer, id(1), id(3), ht(21), HybridTime::INVALID, CommitTimeReason::RemoteAborted);

        analyzer.check_status_logs().unwrap();
        assert!(!analyzer.has_findings());
    }

    #[test]
    fn test_aborted_observer_is_skipped() {
        let mut analyzer = ConsistencyAnalyzer::default();
        commit(&mut analyzer, id(1), ht(10));
        status(&mut analyzer, id(1), id(2), ht(20), HybridTime::MIN, CommitTimeReason::LocalBefore);
        status(&mut analyzer, id(3), id(2), ht(20), ht(15), CommitTimeReason::RemoteCommitted);
        analyzer.get_transaction(id(2)).aborted = true;

        analyzer.check_status_logs().unwrap();
        assert!(!analyzer.has_findings());
    }

    #[test]
    fn test_findings_are_bounded() {
        let mut analyzer = ConsistencyAnalyzer::new(10);
        for n in 1..=11u8 {
            status(
                &mut analyzer,
                id(n),
                id(100),
                ht(u64::from(n) * 10),
                ht(5),
                CommitTimeReason::RemoteCommitted,
            );
        }

        let err = analyzer.check_status_logs().unwrap_err();
        assert_eq!(err, AnalysisError::TooManyFindings { limit: 10 });
        assert_eq!(analyzer.findings().len(), 10);
        assert_eq!(analyzer.findings()[9].hybrid_time, ht(100));
        assert_eq!(analyzer.reported_transactions().len(), 10);
    }

    #[test]
    fn test_reported_transactions_are_deduplicated() {
        let mut analyzer = ConsistencyAnalyzer::default();
        status(&mut analyzer, id(1), id(2), ht(20), ht(15), CommitTimeReason::RemoteCommitted);
        status(&mut analyzer, id(1), id(3), ht(30), ht(15), CommitTimeReason::RemoteCommitted);

        analyzer.check_status_logs().unwrap();
        assert_eq!(analyzer.findings().len(), 2);
        assert_eq!(analyzer.reported_transactions(), &[id(1)]);
    }

    #[test]
    fn test_report_sorts_findings_by_time() {
        let mut analyzer = ConsistencyAnalyzer::default();
        status(&mut analyzer, id(1), id(9), ht(30), ht(15), CommitTimeReason::RemoteCommitted);
        status(&mut analyzer, id(2), id(9), ht(20), ht(15), CommitTimeReason::RemoteCommitted);
        analyzer.check_status_logs().unwrap();

        let mut out = Vec::new();
        analyzer.report(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert!(lines[0].starts_with(&format!("{}: ", ht(20))));
        assert!(lines[1].starts_with(&format!("{}: ", ht(30))));
        assert!(lines[2].starts_with(&format!("TXN: id: {}", id(1))));
        assert!(lines[3].starts_with(&format!("TXN: id: {}", id(2))));
    }

    #[test]
    fn test_apply_and_read_are_logged() {
        let mut analyzer = ConsistencyAnalyzer::default();
        let key = SubDocKey::new(DocKey::range(vec![PrimitiveValue::Int32(1)]), vec![]);
        let value = Value::Int64(7);
        analyzer.apply_row(id(1), &key, &value, ht(10));
        analyzer.read_value(
            id(1),
            &key,
            &value,
            ht(12),
            DocHybridTime::new(ht(10), 0),
            true,
        );

        let txn = analyzer.transaction(&id(1)).unwrap();
        assert_eq!(txn.applied_rows, 1);
        assert_eq!(txn.reads, 1);
        let ops: Vec<_> = txn.sorted_log().iter().map(|e| e.op).collect();
        assert_eq!(ops, vec!["apply", "read"]);
        assert!(txn.log[1].detail.ends_with("(same transaction)"));
    }
}
