//! Transaction log: commit path, replay and reads
//!
//! The log is the only writer of the audit tree and the key index. Each
//! commit is persisted to the [`TxStore`](crate::store::TxStore) before it
//! becomes visible to readers.

mod history;
mod state;
mod transaction_log;

pub use history::History;
pub use state::LogState;
pub use transaction_log::{validate_entries, Snapshot, TransactionLog};
