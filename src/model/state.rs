//! Checkpoint type a client keeps between verifications

use super::{Hash, TxMetadata};
use serde::{Deserialize, Serialize};

/// The tip of the log at some transaction
///
/// A client that has verified a state can store it and later use it as the
/// trusted starting point of a dual proof. The audit tree size at this
/// state always equals `tx_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutableState {
    /// Last committed transaction, 0 for an empty log
    pub tx_id: u64,
    /// Alh of `tx_id`, `Hash::ZERO` for an empty log
    pub tx_alh: Hash,
    /// Audit tree root at size `tx_id`
    pub tree_root: Hash,
}

impl ImmutableState {
    /// State of a log with no transactions
    pub fn empty() -> Self {
        ImmutableState {
            tx_id: 0,
            tx_alh: Hash::ZERO,
            tree_root: Hash::ZERO,
        }
    }

    pub fn tree_size(&self) -> u64 {
        self.tx_id
    }

    pub fn is_empty(&self) -> bool {
        self.tx_id == 0
    }
}

impl From<&TxMetadata> for ImmutableState {
    fn from(md: &TxMetadata) -> Self {
        ImmutableState {
            tx_id: md.id,
            tx_alh: md.alh(),
            tree_root: md.tree_root,
        }
    }
}

impl Default for ImmutableState {
    fn default() -> Self {
        Self::empty()
    }
}
