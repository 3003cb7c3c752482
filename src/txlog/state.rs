//! In-memory view of the committed log

use super::history::History;
use crate::htree::MerkleAuditTree;
use crate::index::{KeyIndex, Revision};
use crate::model::{Entry, Hash, ImmutableState, KeyValue, Tx, TxMetadata};
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Committed transactions plus the structures derived from them
///
/// Only [`LogState::apply`] mutates it, and `apply` checks every link of
/// the incoming transaction before touching anything, so the transactions,
/// the audit tree and the key index always describe the same prefix of
/// the log.
#[derive(Debug, Default)]
pub struct LogState {
    txs: Vec<Arc<Tx>>,
    tree: MerkleAuditTree,
    index: KeyIndex,
    tip_alh: Hash,
}

impl LogState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from records in id order
    pub fn replay(txs: impl IntoIterator<Item = Arc<Tx>>, verify_entries: bool) -> Result<Self> {
        let mut state = Self::new();
        for tx in txs {
            state.apply(tx, verify_entries)?;
        }
        Ok(state)
    }

    /// Id of the last committed transaction (0 when empty)
    pub fn tx_count(&self) -> u64 {
        self.txs.len() as u64
    }

    pub fn tip_alh(&self) -> Hash {
        self.tip_alh
    }

    pub fn tree(&self) -> &MerkleAuditTree {
        &self.tree
    }

    pub fn index(&self) -> &KeyIndex {
        &self.index
    }

    /// Transaction by id
    pub fn tx(&self, id: u64) -> Result<&Arc<Tx>> {
        id.checked_sub(1)
            .and_then(|i| self.txs.get(i as usize))
            .ok_or(Error::TxNotFound(id))
    }

    pub fn current_state(&self) -> ImmutableState {
        match self.txs.last() {
            Some(tx) => ImmutableState {
                tx_id: tx.id(),
                tx_alh: self.tip_alh,
                tree_root: tx.metadata.tree_root,
            },
            None => ImmutableState::empty(),
        }
    }

    /// Latest revision of `key` at or before `max_tx`
    pub fn get(&self, key: &[u8], max_tx: Option<u64>) -> Result<Entry> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        let revision = self
            .index
            .latest(key, max_tx)
            .ok_or(Error::KeyNotFound)?;
        self.entry_at(key, revision)
    }

    /// Every revision of `key`, oldest first
    pub fn history(&self, key: &[u8]) -> Result<History> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        let revisions = self.index.revisions(key);
        let mut txs = Vec::with_capacity(revisions.len());
        for revision in revisions {
            txs.push((Arc::clone(self.tx(revision.tx)?), revision.slot));
        }
        Ok(History::new(key.to_vec(), txs))
    }

    /// Build the next transaction on top of this state without applying it
    pub fn prepare(&self, entries: Vec<KeyValue>, now: u64) -> Tx {
        let id = self.tx_count() + 1;
        let timestamp = now.max(self.last_timestamp());
        let entry_root = Tx::compute_entry_root(&entries);
        let tree_root = self.tree.root_after_append(entry_root);

        Tx {
            metadata: TxMetadata {
                id,
                timestamp,
                n_entries: entries.len() as u32,
                entry_root,
                prior_alh: self.tip_alh,
                tree_size: id,
                tree_root,
            },
            entries,
        }
    }

    /// Append a transaction after checking it links onto the current tip
    ///
    /// With `verify_entries` the entry root is also recomputed from the
    /// entries. Any failed check leaves the state untouched.
    pub fn apply(&mut self, tx: Arc<Tx>, verify_entries: bool) -> Result<()> {
        let md = &tx.metadata;
        let violation = |what: &str| {
            Err(Error::IntegrityViolation(format!("tx {}: {}", md.id, what)))
        };

        if md.id != self.tx_count() + 1 {
            return violation(&format!("expected id {}", self.tx_count() + 1));
        }
        if md.prior_alh != self.tip_alh {
            return violation("prior alh does not match the previous transaction");
        }
        if md.tree_size != md.id {
            return violation("tree size does not match id");
        }
        if md.timestamp < self.last_timestamp() {
            return violation("timestamp goes backwards");
        }
        if md.n_entries as usize != tx.entries.len() || tx.entries.is_empty() {
            return violation("entry count mismatch");
        }

        {
            let mut seen = HashSet::with_capacity(tx.entries.len());
            for kv in &tx.entries {
                if kv.key.is_empty() || !seen.insert(kv.key.as_slice()) {
                    return violation("empty or duplicate key");
                }
            }
        }

        if verify_entries && Tx::compute_entry_root(&tx.entries) != md.entry_root {
            return violation("entry root does not match entries");
        }
        if self.tree.root_after_append(md.entry_root) != md.tree_root {
            return violation("tree root does not match audit tree");
        }

        self.tree.append(md.entry_root);
        for (slot, kv) in tx.entries.iter().enumerate() {
            self.index.insert(
                &kv.key,
                Revision {
                    tx: md.id,
                    slot: slot as u32,
                },
            )?;
        }
        self.tip_alh = md.alh();
        self.txs.push(tx);
        Ok(())
    }

    fn last_timestamp(&self) -> u64 {
        self.txs.last().map(|tx| tx.metadata.timestamp).unwrap_or(0)
    }

    fn entry_at(&self, key: &[u8], revision: Revision) -> Result<Entry> {
        let tx = self.tx(revision.tx)?;
        let kv = tx
            .entries
            .get(revision.slot as usize)
            .filter(|kv| kv.key == key)
            .ok_or_else(|| {
                Error::IntegrityViolation(format!(
                    "index points at a missing entry in tx {}",
                    revision.tx
                ))
            })?;
        Ok(Entry {
            key: kv.key.clone(),
            value: kv.value.clone(),
            tx: revision.tx,
        })
    }
}
