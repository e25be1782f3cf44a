//! Binary codec for transaction dumps
//!
//! Two layers:
//! - `BinaryReader` / `BinaryWriter`: fixed-width little-endian integers,
//!   booleans, length-prefixed byte strings
//! - Domain values on top: hybrid times, transaction ids, document keys and
//!   application values
//!
//! Every decode failure is a fatal `DumpError`.

mod errors;
mod hybrid_time;
mod key;
mod reader;
mod txn_id;
mod value;
mod writer;

pub use errors::{DumpError, DumpErrorCode, DumpResult};
pub use hybrid_time::{DocHybridTime, HybridTime, ReadHybridTime, LOGICAL_BITS};
pub use key::{value_type, DocKey, PrimitiveValue, SubDocKey};
pub use reader::BinaryReader;
pub use txn_id::{TransactionId, TRANSACTION_ID_SIZE};
pub use value::Value;
pub use writer::BinaryWriter;
