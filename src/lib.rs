//! txndump - transaction dump decoder and commit status consistency checker
//!
//! A dump is a stream of length-prefixed blocks, each carrying one command
//! recorded by a tablet server: applied write batches, transactional reads,
//! commits, status checks, conflict checks and participant cleanup. The
//! crate decodes those blocks strictly, rebuilds per-transaction state and
//! checks that every status check agrees with the recorded commits.

pub mod analysis;
pub mod cli;
pub mod codec;
pub mod dump;
pub mod observability;
