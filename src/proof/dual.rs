//! Dual proofs: two transactions belong to the same untampered history

use crate::htree::{verify_consistency, verify_inclusion};
use crate::model::{Hash, TxMetadata};
use serde::{Deserialize, Serialize};

/// Links an earlier (source) transaction to a later (target) one
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualProof {
    pub source_tx_metadata: TxMetadata,
    pub target_tx_metadata: TxMetadata,
    /// Audit tree consistency path from size `source` to size `target`
    pub consistency_proof: Vec<Hash>,
    /// Inclusion path of the target's entry root as the last leaf of its tree
    pub last_inclusion_proof: Vec<Hash>,
    /// Inner hash of every transaction in `source + 1..=target`, in order
    pub linear_proof: Vec<Hash>,
}

/// Check that the transactions `source_id` and `target_id`, known by their
/// Alhs, are part of one history
///
/// Holds only if each metadata hashes to the Alh it claims, the source's
/// audit tree is a prefix of the target's, the target's entry root is the
/// last leaf of its tree, and folding the linear terms onto `source_alh`
/// arrives at `target_alh`.
pub fn verify_dual_proof(
    proof: &DualProof,
    source_id: u64,
    target_id: u64,
    source_alh: &Hash,
    target_alh: &Hash,
) -> bool {
    let source = &proof.source_tx_metadata;
    let target = &proof.target_tx_metadata;

    if source_id == 0 || source_id > target_id {
        return false;
    }
    if source.id != source_id || target.id != target_id {
        return false;
    }
    if source.tree_size != source.id || target.tree_size != target.id {
        return false;
    }
    if source.alh() != *source_alh || target.alh() != *target_alh {
        return false;
    }

    if !verify_inclusion(
        &target.entry_root,
        target.id - 1,
        target.tree_size,
        &proof.last_inclusion_proof,
        &target.tree_root,
    ) {
        return false;
    }

    if !verify_consistency(
        source.tree_size,
        target.tree_size,
        &proof.consistency_proof,
        &source.tree_root,
        &target.tree_root,
    ) {
        return false;
    }

    verify_linear(&proof.linear_proof, source_id, target_id, source_alh, target_alh)
}

/// Walk the Alh chain from `source_alh` through one inner hash per
/// transaction and require it to end on `target_alh`
fn verify_linear(
    terms: &[Hash],
    source_id: u64,
    target_id: u64,
    source_alh: &Hash,
    target_alh: &Hash,
) -> bool {
    if terms.len() as u64 != target_id - source_id {
        return false;
    }
    let alh = (source_id + 1..=target_id)
        .zip(terms)
        .fold(*source_alh, |prior, (id, inner)| TxMetadata::link(id, &prior, inner));
    alh == *target_alh
}
