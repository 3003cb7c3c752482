//! Inclusion proofs: an entry inside its transaction, and the transaction
//! inside the audit tree

use crate::htree::{inclusion_root, verify_inclusion as verify_path};
use crate::model::{Hash, KeyValue};
use serde::{Deserialize, Serialize};

/// Sibling digests from one leaf up to the root of a tree of `tree_size`
/// leaves, ordered leaf to root
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathProof {
    pub leaf_index: u64,
    pub tree_size: u64,
    pub terms: Vec<Hash>,
}

impl PathProof {
    /// Root implied by `leaf`, or `None` for a malformed path
    pub fn root_from(&self, leaf: &Hash) -> Option<Hash> {
        inclusion_root(leaf, self.leaf_index, self.tree_size, &self.terms)
    }

    pub fn verify(&self, leaf: &Hash, root: &Hash) -> bool {
        verify_path(leaf, self.leaf_index, self.tree_size, &self.terms, root)
    }
}

/// Proof that a key-value pair was written in transaction `tx_id`
///
/// `entry` leads from the entry digest to the transaction's entry root;
/// `tx` leads from that entry root to the audit tree root at size `tx_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub tx_id: u64,
    pub entry: PathProof,
    pub tx: PathProof,
}

/// Check that `kv` is one of the entries committed under `expected_entry_root`
pub fn verify_inclusion(proof: &InclusionProof, kv: &KeyValue, expected_entry_root: &Hash) -> bool {
    proof.entry.verify(&kv.digest(), expected_entry_root)
}

/// Check that `entry_root` is leaf `tx_id - 1` of the audit tree whose root
/// at size `tx_id` is `expected_tree_root`
pub fn verify_tx_inclusion(proof: &InclusionProof, entry_root: &Hash, expected_tree_root: &Hash) -> bool {
    proof.tx_id >= 1
        && proof.tx.leaf_index == proof.tx_id - 1
        && proof.tx.tree_size == proof.tx_id
        && proof.tx.verify(entry_root, expected_tree_root)
}

/// Both levels at once: `kv` under the audit tree root of transaction `tx_id`
pub fn verify_entry_in_tree(proof: &InclusionProof, kv: &KeyValue, expected_tree_root: &Hash) -> bool {
    match proof.entry.root_from(&kv.digest()) {
        Some(entry_root) => verify_tx_inclusion(proof, &entry_root, expected_tree_root),
        None => false,
    }
}
