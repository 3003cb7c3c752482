//! Revision lists per key

use crate::{Error, Result};
use std::collections::HashMap;

/// Where one revision of a key lives
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision {
    /// Transaction that wrote it
    pub tx: u64,
    /// Entry position inside that transaction
    pub slot: u32,
}

/// Maps each key to the ascending list of revisions that wrote it
///
/// Lists only ever grow at the end. The index is a cache: it can always be
/// rebuilt by replaying the transaction records in order.
#[derive(Debug, Default)]
pub struct KeyIndex {
    keys: HashMap<Vec<u8>, Vec<Revision>>,
    revision_count: u64,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new revision of `key`
    ///
    /// Fails if `revision.tx` does not come after the key's last revision,
    /// which would mean transactions were applied out of order.
    pub fn insert(&mut self, key: &[u8], revision: Revision) -> Result<()> {
        let revisions = self.keys.entry(key.to_vec()).or_default();
        if let Some(last) = revisions.last() {
            if last.tx >= revision.tx {
                return Err(Error::IntegrityViolation(format!(
                    "revision for tx {} indexed after tx {}",
                    revision.tx, last.tx
                )));
            }
        }
        revisions.push(revision);
        self.revision_count += 1;
        Ok(())
    }

    /// Latest revision written at or before `max_tx` (`None` = no bound)
    pub fn latest(&self, key: &[u8], max_tx: Option<u64>) -> Option<Revision> {
        let revisions = self.keys.get(key)?;
        match max_tx {
            None => revisions.last().copied(),
            Some(bound) => {
                let end = revisions.partition_point(|r| r.tx <= bound);
                end.checked_sub(1).map(|i| revisions[i])
            }
        }
    }

    /// All revisions of `key`, oldest first
    pub fn revisions(&self, key: &[u8]) -> &[Revision] {
        self.keys.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.keys.contains_key(key)
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Number of revisions across all keys
    pub fn revision_count(&self) -> u64 {
        self.revision_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(tx: u64) -> Revision {
        Revision { tx, slot: 0 }
    }

    fn sample() -> KeyIndex {
        // tx1: A, tx2: B, tx3: A
        let mut index = KeyIndex::new();
        index.insert(b"A", rev(1)).unwrap();
        index.insert(b"B", rev(2)).unwrap();
        index.insert(b"A", rev(3)).unwrap();
        index
    }

    #[test]
    fn test_latest_with_bounds() {
        let index = sample();
        assert_eq!(index.latest(b"A", None), Some(rev(3)));
        assert_eq!(index.latest(b"A", Some(2)), Some(rev(1)));
        assert_eq!(index.latest(b"A", Some(3)), Some(rev(3)));
        assert_eq!(index.latest(b"A", Some(0)), None);
        assert_eq!(index.latest(b"B", Some(1)), None);
        assert_eq!(index.latest(b"C", None), None);
    }

    #[test]
    fn test_revisions_in_order() {
        let index = sample();
        assert_eq!(index.revisions(b"A"), &[rev(1), rev(3)]);
        assert!(index.revisions(b"missing").is_empty());
        assert_eq!(index.key_count(), 2);
        assert_eq!(index.revision_count(), 3);
    }

    #[test]
    fn test_out_of_order_insert_rejected() {
        let mut index = sample();
        let err = index.insert(b"A", rev(2)).unwrap_err();
        assert!(matches!(err, Error::IntegrityViolation(_)));
        assert_eq!(index.revisions(b"A").len(), 2);
    }
}
