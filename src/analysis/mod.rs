//! # Transaction Analysis
//!
//! Reconstructs per-transaction state from decoded dump commands and checks
//! that every transaction's view of another's commit status agrees with the
//! commit records.
//!
//! The registry is an arena keyed by transaction id. Observer and observed
//! transactions refer to each other only by id.

mod analyzer;
mod checker;
mod errors;
mod store;
mod transaction;

pub use analyzer::Analyzer;
pub use checker::{ConsistencyAnalyzer, Finding, FindingKind, DEFAULT_MAX_FINDINGS};
pub use errors::{AnalysisError, AnalysisResult};
pub use store::TransactionStore;
pub use transaction::{StatusLogEntry, TransactionState, TxnLogEntry};
