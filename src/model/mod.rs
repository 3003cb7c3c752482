//! Core data model types for immulog

mod entry;
mod hash;
mod state;
mod tx;

pub use entry::{Entry, KeyValue};
pub use hash::{Hash, HASH_SIZE, LEAF_PREFIX, NODE_PREFIX};
pub use state::ImmutableState;
pub use tx::{Tx, TxMetadata};
