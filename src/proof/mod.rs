//! Proof generation and verification
//!
//! Generation ([`ProofEngine`]) reads a consistent view of the log.
//! Verification is a set of pure functions that only need the proof, the
//! claimed data, and a trusted hash; a failed check is `false`, never an
//! error.

mod dual;
mod engine;
mod inclusion;
mod verifiable;

pub use dual::{verify_dual_proof, DualProof};
pub use engine::ProofEngine;
pub use inclusion::{
    verify_entry_in_tree, verify_inclusion, verify_tx_inclusion, InclusionProof, PathProof,
};
pub use verifiable::{VerifiableEntry, VerifiableTx};

use crate::model::{Hash, KeyValue};
use serde::{Deserialize, Serialize};

/// Either proof shape
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proof {
    Inclusion(InclusionProof),
    Dual(DualProof),
}

/// What a proof is checked against
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Claim {
    /// `kv` was committed under `entry_root`
    Entry { kv: KeyValue, entry_root: Hash },
    /// Both transactions belong to one history
    Chain {
        source_id: u64,
        target_id: u64,
        source_alh: Hash,
        target_alh: Hash,
    },
}

/// Verify any proof against a claim of the matching shape
pub fn verify(proof: &Proof, claim: &Claim) -> bool {
    match (proof, claim) {
        (Proof::Inclusion(p), Claim::Entry { kv, entry_root }) => verify_inclusion(p, kv, entry_root),
        (
            Proof::Dual(p),
            Claim::Chain {
                source_id,
                target_id,
                source_alh,
                target_alh,
            },
        ) => verify_dual_proof(p, *source_id, *target_id, source_alh, target_alh),
        (Proof::Inclusion(_), Claim::Chain { .. }) => false,
        (Proof::Dual(_), Claim::Entry { .. }) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txlog::LogState;
    use std::sync::Arc;

    #[test]
    fn test_dispatch() {
        let mut state = LogState::new();
        for i in 0..3u64 {
            let tx = state.prepare(vec![KeyValue::new("k", i.to_string())], i);
            state.apply(Arc::new(tx), true).unwrap();
        }
        let engine = ProofEngine::new(&state);
        let tx2 = state.tx(2).unwrap();

        let inclusion = Proof::Inclusion(engine.inclusion_proof(2, b"k").unwrap());
        let dual = Proof::Dual(engine.dual_proof(1, 3).unwrap());

        let entry_claim = Claim::Entry {
            kv: tx2.entries[0].clone(),
            entry_root: tx2.metadata.entry_root,
        };
        let chain_claim = Claim::Chain {
            source_id: 1,
            target_id: 3,
            source_alh: state.tx(1).unwrap().alh(),
            target_alh: state.tx(3).unwrap().alh(),
        };

        assert!(verify(&inclusion, &entry_claim));
        assert!(verify(&dual, &chain_claim));
        assert!(!verify(&inclusion, &chain_claim));
        assert!(!verify(&dual, &entry_claim));
    }
}
