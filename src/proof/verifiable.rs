//! Client-side checks that turn a trusted state into a newer trusted state

use super::{verify_dual_proof, verify_inclusion, verify_tx_inclusion, DualProof, InclusionProof};
use crate::model::{Entry, ImmutableState, TxMetadata};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Transaction metadata plus a dual proof against a trusted transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableTx {
    pub tx: TxMetadata,
    pub dual_proof: DualProof,
}

impl VerifiableTx {
    /// Check the proof against `trusted` and return the state to trust next
    ///
    /// The returned state is whichever of `trusted` and this transaction
    /// is later. An empty `trusted` accepts the transaction on its own
    /// metadata.
    pub fn verify(&self, trusted: &ImmutableState) -> Result<ImmutableState> {
        let tx_alh = self.tx.alh();
        let proof = &self.dual_proof;

        let verified = if trusted.is_empty() {
            verify_dual_proof(proof, self.tx.id, self.tx.id, &tx_alh, &tx_alh)
        } else if trusted.tx_id <= self.tx.id {
            verify_dual_proof(proof, trusted.tx_id, self.tx.id, &trusted.tx_alh, &tx_alh)
        } else {
            verify_dual_proof(proof, self.tx.id, trusted.tx_id, &tx_alh, &trusted.tx_alh)
        };

        if !verified {
            return Err(Error::VerificationFailed(format!(
                "tx {} does not extend trusted state at tx {}",
                self.tx.id, trusted.tx_id
            )));
        }

        if trusted.tx_id > self.tx.id {
            Ok(*trusted)
        } else {
            Ok(ImmutableState::from(&self.tx))
        }
    }
}

/// An entry as read, with proofs tying it to a trusted state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableEntry {
    pub entry: Entry,
    pub inclusion_proof: InclusionProof,
    pub verifiable_tx: VerifiableTx,
}

impl VerifiableEntry {
    /// Check the entry against its transaction, then the transaction
    /// against `trusted`
    pub fn verify(&self, trusted: &ImmutableState) -> Result<ImmutableState> {
        let md = &self.verifiable_tx.tx;
        if self.entry.tx != md.id || self.inclusion_proof.tx_id != md.id {
            return Err(Error::VerificationFailed(format!(
                "entry claims tx {} but proofs are for tx {}",
                self.entry.tx, md.id
            )));
        }

        let kv = self.entry.key_value();
        if !verify_inclusion(&self.inclusion_proof, &kv, &md.entry_root)
            || !verify_tx_inclusion(&self.inclusion_proof, &md.entry_root, &md.tree_root)
        {
            return Err(Error::VerificationFailed(format!(
                "entry is not included in tx {}",
                md.id
            )));
        }

        self.verifiable_tx.verify(trusted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KeyValue;
    use crate::proof::ProofEngine;
    use crate::txlog::LogState;
    use std::sync::Arc;

    fn state(n: u64) -> LogState {
        let mut state = LogState::new();
        for i in 1..=n {
            let entries = vec![
                KeyValue::new(format!("key-{}", i % 3), format!("v{}", i)),
                KeyValue::new(format!("other-{}", i), "x"),
            ];
            let tx = state.prepare(entries, i);
            state.apply(Arc::new(tx), true).unwrap();
        }
        state
    }

    #[test]
    fn test_trust_advances() {
        let state = state(8);
        let engine = ProofEngine::new(&state);

        let mut trusted = ImmutableState::empty();
        for id in [1u64, 2, 5, 8] {
            let vtx = engine.verifiable_tx(id, trusted.tx_id).unwrap();
            trusted = vtx.verify(&trusted).unwrap();
            assert_eq!(trusted.tx_id, id);
            assert_eq!(trusted.tx_alh, state.tx(id).unwrap().alh());
        }
        assert_eq!(trusted, state.current_state());
    }

    #[test]
    fn test_older_tx_keeps_trusted_state() {
        let state = state(6);
        let engine = ProofEngine::new(&state);
        let trusted = state.current_state();

        let vtx = engine.verifiable_tx(2, trusted.tx_id).unwrap();
        assert_eq!(vtx.verify(&trusted).unwrap(), trusted);
    }

    #[test]
    fn test_entry_verifies() {
        let state = state(6);
        let engine = ProofEngine::new(&state);
        let trusted = ImmutableState::from(&state.tx(2).unwrap().metadata);

        let entry = state.get(b"key-1", None).unwrap();
        assert_eq!(entry.tx, 4);
        let ventry = engine.verifiable_entry(entry, trusted.tx_id).unwrap();
        let next = ventry.verify(&trusted).unwrap();
        assert_eq!(next.tx_id, 4);
    }

    #[test]
    fn test_forged_entry_rejected() {
        let state = state(6);
        let engine = ProofEngine::new(&state);
        let trusted = ImmutableState::from(&state.tx(1).unwrap().metadata);

        let entry = state.get(b"key-0", None).unwrap();
        let mut ventry = engine.verifiable_entry(entry, trusted.tx_id).unwrap();
        ventry.entry.value = b"forged".to_vec();
        assert!(matches!(
            ventry.verify(&trusted),
            Err(Error::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_fork_rejected() {
        fn history(rewrite_tx3: bool) -> LogState {
            let mut state = LogState::new();
            for i in 1..=5u64 {
                let value = match (i, rewrite_tx3) {
                    (3, true) => "rewritten".to_string(),
                    _ => format!("v{}", i),
                };
                let tx = state.prepare(vec![KeyValue::new("k", value)], i);
                state.apply(Arc::new(tx), true).unwrap();
            }
            state
        }

        // A server that rewrote tx 3 cannot prove its new tip from tx 3
        let honest = history(false);
        let trusted = ImmutableState::from(&honest.tx(3).unwrap().metadata);

        let forked = history(true);
        let vtx = ProofEngine::new(&forked).verifiable_tx(5, 3).unwrap();
        assert!(vtx.verify(&trusted).is_err());

        let vtx = ProofEngine::new(&honest).verifiable_tx(5, 3).unwrap();
        assert_eq!(vtx.verify(&trusted).unwrap(), honest.current_state());
    }

    #[test]
    fn test_fork_in_timestamp_only_rejected() {
        fn history(tx4_time: u64) -> LogState {
            let mut state = LogState::new();
            for i in 1..=5u64 {
                let now = if i == 4 { tx4_time } else { i * 10 };
                let tx = state.prepare(vec![KeyValue::new("k", format!("v{}", i))], now);
                state.apply(Arc::new(tx), true).unwrap();
            }
            state
        }

        // Tx 4 differs only in its timestamp, so every entry root and audit
        // root matches the honest history
        let honest = history(40);
        let forked = history(41);
        assert_eq!(
            honest.tx(5).unwrap().metadata.tree_root,
            forked.tx(5).unwrap().metadata.tree_root
        );
        assert_ne!(honest.tx(5).unwrap().alh(), forked.tx(5).unwrap().alh());

        let trusted = ImmutableState::from(&honest.tx(3).unwrap().metadata);
        let vtx = ProofEngine::new(&forked).verifiable_tx(5, 3).unwrap();
        assert!(matches!(
            vtx.verify(&trusted),
            Err(Error::VerificationFailed(_))
        ));
    }
}
