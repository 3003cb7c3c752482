//! Transaction type - an immutable, hash-chained batch of writes

use super::{Hash, KeyValue};
use crate::htree::MerkleAuditTree;
use serde::{Deserialize, Serialize};

/// Everything about a transaction except its entries
///
/// This is the part carried inside proofs. The accumulated linked hash
/// is not stored: it is always recomputed from these fields, so a record
/// can never disagree with its own Alh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMetadata {
    /// Sequential id, starting at 1
    pub id: u64,

    /// Commit time (unix millis), non-decreasing across the log
    pub timestamp: u64,

    /// Number of entries written
    pub n_entries: u32,

    /// Root of the per-transaction entry tree
    pub entry_root: Hash,

    /// Alh of transaction `id - 1`, or `Hash::ZERO` for the first one
    pub prior_alh: Hash,

    /// Audit tree size right after this transaction's leaf was appended
    pub tree_size: u64,

    /// Audit tree root at `tree_size`
    pub tree_root: Hash,
}

impl TxMetadata {
    /// Digest of the fields that are not part of the chain link itself
    pub fn inner_hash(&self) -> Hash {
        Hash::digest_many(&[
            &self.timestamp.to_be_bytes(),
            &self.n_entries.to_be_bytes(),
            self.entry_root.as_bytes(),
            &self.tree_size.to_be_bytes(),
            self.tree_root.as_bytes(),
        ])
    }

    /// Accumulated linked hash: `H(id || prior_alh || inner_hash)`
    pub fn alh(&self) -> Hash {
        Self::link(self.id, &self.prior_alh, &self.inner_hash())
    }

    /// One step of the Alh chain, from the previous Alh and an inner hash
    pub fn link(id: u64, prior_alh: &Hash, inner_hash: &Hash) -> Hash {
        Hash::digest_many(&[
            &id.to_be_bytes(),
            prior_alh.as_bytes(),
            inner_hash.as_bytes(),
        ])
    }
}

/// A committed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub metadata: TxMetadata,
    /// Entries in commit order
    pub entries: Vec<KeyValue>,
}

impl Tx {
    pub fn id(&self) -> u64 {
        self.metadata.id
    }

    pub fn alh(&self) -> Hash {
        self.metadata.alh()
    }

    /// Build the per-transaction tree over entry digests
    pub fn entry_tree(entries: &[KeyValue]) -> MerkleAuditTree {
        MerkleAuditTree::from_leaves(entries.iter().map(KeyValue::digest))
    }

    /// Root of the per-transaction tree over `entries`
    pub fn compute_entry_root(entries: &[KeyValue]) -> Hash {
        Self::entry_tree(entries).root()
    }

    /// Position of `key` among this transaction's entries
    pub fn slot_of(&self, key: &[u8]) -> Option<usize> {
        self.entries.iter().position(|kv| kv.key == key)
    }

    /// Value written for `key` in this transaction
    pub fn value_of(&self, key: &[u8]) -> Option<&[u8]> {
        self.slot_of(key).map(|slot| self.entries[slot].value.as_slice())
    }
}
