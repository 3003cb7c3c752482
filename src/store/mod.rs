//! Durable transaction storage
//!
//! Transactions are framed, compressed with zstd and appended to a single
//! log file. Everything else is derived from that file.

mod record;
mod tx_store;

pub use record::{Record, RecordType};
pub use tx_store::TxStore;
