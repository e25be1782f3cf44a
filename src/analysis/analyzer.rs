//! Capabilities the dump processor drives while decoding

use crate::codec::{DocHybridTime, HybridTime, SubDocKey, TransactionId, Value};

use super::transaction::TransactionState;

/// Receiver of decoded dump commands.
///
/// `DumpProcessor` is generic over this trait. `ConsistencyAnalyzer` is the
/// production implementation; tests substitute recorders.
pub trait Analyzer {
    /// Existing state for `id`, created and registered on first reference.
    fn get_transaction(&mut self, id: TransactionId) -> &mut TransactionState;

    /// One plain value written by an applied write batch.
    fn apply_row(&mut self, txn_id: TransactionId, key: &SubDocKey, value: &Value, log_ht: HybridTime);

    /// One value returned to a transactional read.
    fn read_value(
        &mut self,
        txn_id: TransactionId,
        key: &SubDocKey,
        value: &Value,
        read_time: HybridTime,
        write_time: DocHybridTime,
        same_transaction: bool,
    );
}
