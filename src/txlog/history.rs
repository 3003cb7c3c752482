//! Revision history of a single key

use crate::model::{Entry, Tx};
use std::sync::Arc;

/// Every revision of one key, oldest first
///
/// Produced fresh by each `history` call from the key index. It holds the
/// writing transactions (which are immutable) rather than any lock, so it
/// can outlive later commits; it simply never sees them. Values are copied
/// out lazily as the iterator advances. Use `.rev()` for newest first and
/// `skip`/`take` for paging.
#[derive(Clone, Debug)]
pub struct History {
    key: Vec<u8>,
    revisions: Vec<(Arc<Tx>, u32)>,
    front: usize,
    back: usize,
}

impl History {
    pub(crate) fn new(key: Vec<u8>, revisions: Vec<(Arc<Tx>, u32)>) -> Self {
        let back = revisions.len();
        History {
            key,
            revisions,
            front: 0,
            back,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Ids of the transactions that wrote the key, oldest first
    pub fn tx_ids(&self) -> Vec<u64> {
        self.revisions.iter().map(|(tx, _)| tx.id()).collect()
    }

    fn entry(&self, pos: usize) -> Entry {
        let (tx, slot) = &self.revisions[pos];
        Entry {
            key: self.key.clone(),
            value: tx.entries[*slot as usize].value.clone(),
            tx: tx.id(),
        }
    }
}

impl Iterator for History {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        if self.front == self.back {
            return None;
        }
        let entry = self.entry(self.front);
        self.front += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for History {
    fn next_back(&mut self) -> Option<Entry> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(self.entry(self.back))
    }
}

impl ExactSizeIterator for History {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Hash, KeyValue, TxMetadata};

    fn tx(id: u64, entries: Vec<KeyValue>) -> Arc<Tx> {
        Arc::new(Tx {
            metadata: TxMetadata {
                id,
                timestamp: 0,
                n_entries: entries.len() as u32,
                entry_root: Hash::ZERO,
                prior_alh: Hash::ZERO,
                tree_size: id,
                tree_root: Hash::ZERO,
            },
            entries,
        })
    }

    fn sample() -> History {
        History::new(
            b"A".to_vec(),
            vec![
                (tx(1, vec![KeyValue::new("A", "1")]), 0),
                (tx(3, vec![KeyValue::new("C", "x"), KeyValue::new("A", "3")]), 1),
                (tx(7, vec![KeyValue::new("A", "")]), 0),
            ],
        )
    }

    #[test]
    fn test_forward_and_backward() {
        let forward: Vec<_> = sample().map(|e| (e.value, e.tx)).collect();
        assert_eq!(
            forward,
            vec![(b"1".to_vec(), 1), (b"3".to_vec(), 3), (Vec::new(), 7)]
        );

        let backward: Vec<_> = sample().rev().map(|e| e.tx).collect();
        assert_eq!(backward, vec![7, 3, 1]);
    }

    #[test]
    fn test_restartable_and_pageable() {
        let history = sample();
        assert_eq!(history.len(), 3);
        assert_eq!(history.clone().count(), 3);
        assert_eq!(history.clone().count(), 3);

        let page: Vec<_> = history.clone().skip(1).take(1).map(|e| e.tx).collect();
        assert_eq!(page, vec![3]);
        assert_eq!(history.tx_ids(), vec![1, 3, 7]);
    }

    #[test]
    fn test_meeting_in_the_middle() {
        let mut history = sample();
        assert_eq!(history.next().map(|e| e.tx), Some(1));
        assert_eq!(history.next_back().map(|e| e.tx), Some(7));
        assert_eq!(history.next().map(|e| e.tx), Some(3));
        assert!(history.next().is_none());
        assert!(history.next_back().is_none());
    }
}
