//! Proof generation over a consistent view of the log

use super::{DualProof, InclusionProof, PathProof, VerifiableEntry, VerifiableTx};
use crate::model::{Entry, Tx};
use crate::txlog::LogState;
use crate::{Error, Result};

/// Builds proofs from committed state. Never mutates it.
pub struct ProofEngine<'a> {
    state: &'a LogState,
}

impl<'a> ProofEngine<'a> {
    pub fn new(state: &'a LogState) -> Self {
        ProofEngine { state }
    }

    /// Prove that `key` was written in transaction `tx_id`
    pub fn inclusion_proof(&self, tx_id: u64, key: &[u8]) -> Result<InclusionProof> {
        let tx = self.state.tx(tx_id)?;
        let slot = tx.slot_of(key).ok_or(Error::KeyNotInTx(tx_id))? as u64;

        let entry_tree = Tx::entry_tree(&tx.entries);
        let entry = PathProof {
            leaf_index: slot,
            tree_size: entry_tree.len(),
            terms: entry_tree.inclusion_path(slot, entry_tree.len())?,
        };
        let tx_path = PathProof {
            leaf_index: tx_id - 1,
            tree_size: tx_id,
            terms: self.state.tree().inclusion_path(tx_id - 1, tx_id)?,
        };

        Ok(InclusionProof {
            tx_id,
            entry,
            tx: tx_path,
        })
    }

    /// Link transaction `source` to the later transaction `target`
    pub fn dual_proof(&self, source: u64, target: u64) -> Result<DualProof> {
        if source > target {
            return Err(Error::InvalidRange {
                from: source,
                to: target,
            });
        }
        let source_tx_metadata = self.state.tx(source)?.metadata;
        let target_tx_metadata = self.state.tx(target)?.metadata;
        let tree = self.state.tree();
        let linear_proof = (source + 1..=target)
            .map(|id| self.state.tx(id).map(|tx| tx.metadata.inner_hash()))
            .collect::<Result<Vec<_>>>()?;

        Ok(DualProof {
            source_tx_metadata,
            target_tx_metadata,
            consistency_proof: tree.consistency_path(source, target)?,
            last_inclusion_proof: tree.inclusion_path(target - 1, target)?,
            linear_proof,
        })
    }

    /// Metadata of `tx_id` with a dual proof against `trusted_from_tx`
    ///
    /// The proof runs in ascending order whichever side is later. A
    /// `trusted_from_tx` of 0 means no prior state and proves `tx_id`
    /// against itself.
    pub fn verifiable_tx(&self, tx_id: u64, trusted_from_tx: u64) -> Result<VerifiableTx> {
        let tx = self.state.tx(tx_id)?.metadata;
        let dual_proof = match trusted_from_tx {
            0 => self.dual_proof(tx_id, tx_id)?,
            trusted if trusted <= tx_id => self.dual_proof(trusted, tx_id)?,
            trusted => self.dual_proof(tx_id, trusted)?,
        };
        Ok(VerifiableTx { tx, dual_proof })
    }

    /// Wrap an entry read from this state with everything needed to check it
    pub fn verifiable_entry(&self, entry: Entry, trusted_from_tx: u64) -> Result<VerifiableEntry> {
        let inclusion_proof = self.inclusion_proof(entry.tx, &entry.key)?;
        let verifiable_tx = self.verifiable_tx(entry.tx, trusted_from_tx)?;
        Ok(VerifiableEntry {
            entry,
            inclusion_proof,
            verifiable_tx,
        })
    }
}
