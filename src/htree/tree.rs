//! Merkle audit tree over a growing sequence of leaf digests

use super::node::{split_point, NodeIndex};
use crate::model::Hash;
use crate::{Error, Result};

/// An append-only, size-indexed binary hash tree
///
/// `levels[h][i]` is the root of the complete subtree over leaves
/// `[i * 2^h, (i + 1) * 2^h)`. A node is written once, when its last leaf
/// is appended, and never rewritten.
#[derive(Clone, Debug)]
pub struct MerkleAuditTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleAuditTree {
    /// Create an empty tree
    pub fn new() -> Self {
        MerkleAuditTree {
            levels: vec![Vec::new()],
        }
    }

    /// Build a tree by appending every leaf in order
    pub fn from_leaves(leaves: impl IntoIterator<Item = Hash>) -> Self {
        let mut tree = Self::new();
        for leaf in leaves {
            tree.append(leaf);
        }
        tree
    }

    /// Number of leaves
    pub fn len(&self) -> u64 {
        self.levels[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Leaf digest at `index`
    pub fn leaf(&self, index: u64) -> Option<Hash> {
        self.levels[0].get(index as usize).copied()
    }

    /// Append a leaf, returning the new size
    pub fn append(&mut self, leaf: Hash) -> u64 {
        let mut index = self.levels[0].len();
        self.levels[0].push(leaf);

        // Every odd index closes a complete subtree one level up
        let mut level = 0;
        let mut hash = leaf;
        while index & 1 == 1 {
            let left = self.levels[level][index - 1];
            hash = Hash::node(&left, &hash);
            level += 1;
            index >>= 1;
            if self.levels.len() == level {
                self.levels.push(Vec::new());
            }
            debug_assert_eq!(self.levels[level].len(), index);
            self.levels[level].push(hash);
        }

        self.len()
    }

    /// Root at the current size
    pub fn root(&self) -> Hash {
        self.root_unchecked(self.len())
    }

    /// Root over the first `size` leaves
    pub fn root_at(&self, size: u64) -> Result<Hash> {
        if size > self.len() {
            return Err(Error::SizeOutOfRange {
                size,
                len: self.len(),
            });
        }
        Ok(self.root_unchecked(size))
    }

    /// Root the tree would have after appending `leaf`, without appending it
    pub fn root_after_append(&self, leaf: Hash) -> Hash {
        let mut peaks = self.peaks();
        peaks.push((0, leaf));

        while peaks.len() >= 2 {
            let (right_level, right) = peaks[peaks.len() - 1];
            let (left_level, left) = peaks[peaks.len() - 2];
            if left_level != right_level {
                break;
            }
            peaks.truncate(peaks.len() - 2);
            peaks.push((left_level + 1, Hash::node(&left, &right)));
        }

        fold_peaks(&peaks)
    }

    /// Sibling digests proving leaf `index` under the root at `size`,
    /// ordered from the leaf towards the root
    pub fn inclusion_path(&self, index: u64, size: u64) -> Result<Vec<Hash>> {
        if size > self.len() {
            return Err(Error::SizeOutOfRange {
                size,
                len: self.len(),
            });
        }
        if index >= size {
            return Err(Error::IndexOutOfRange { index, size });
        }

        let mut path = Vec::new();
        self.collect_inclusion(index, 0, size, &mut path);
        Ok(path)
    }

    /// Digests proving the root at size `m` is a prefix of the root at size `n`
    pub fn consistency_path(&self, m: u64, n: u64) -> Result<Vec<Hash>> {
        if m > n || n > self.len() {
            return Err(Error::InvalidRange { from: m, to: n });
        }

        let mut path = Vec::new();
        if m > 0 && m < n {
            self.collect_consistency(m, 0, n, true, &mut path);
        }
        Ok(path)
    }

    // === Internal helpers ===

    fn root_unchecked(&self, size: u64) -> Hash {
        if size == 0 {
            Hash::ZERO
        } else {
            self.subtree_root(0, size)
        }
    }

    /// Root of the subtree over `[start, end)` as shaped inside a tree whose
    /// split points put `start` on a boundary
    fn subtree_root(&self, start: u64, end: u64) -> Hash {
        if let Some(node) = NodeIndex::covering(start, end) {
            return self.levels[node.level as usize][node.index as usize];
        }
        let k = split_point(end - start);
        let left = self.subtree_root(start, start + k);
        let right = self.subtree_root(start + k, end);
        Hash::node(&left, &right)
    }

    /// Complete subtrees making up the current size, largest first
    fn peaks(&self) -> Vec<(u32, Hash)> {
        let len = self.len();
        let mut peaks = Vec::new();
        let mut start = 0u64;
        for level in (0..64u32).rev() {
            let width = 1u64 << level;
            if len & width != 0 {
                let node = NodeIndex::new(level, start >> level);
                peaks.push((level, self.levels[level as usize][node.index as usize]));
                start += width;
            }
        }
        peaks
    }

    fn collect_inclusion(&self, index: u64, start: u64, end: u64, path: &mut Vec<Hash>) {
        let n = end - start;
        if n == 1 {
            return;
        }
        let k = split_point(n);
        if index < start + k {
            self.collect_inclusion(index, start, start + k, path);
            path.push(self.subtree_root(start + k, end));
        } else {
            self.collect_inclusion(index, start + k, end, path);
            path.push(self.subtree_root(start, start + k));
        }
    }

    /// `m` counts old leaves inside `[start, end)`; `whole` is true while the
    /// old root itself is still on the walk and need not be emitted
    fn collect_consistency(&self, m: u64, start: u64, end: u64, whole: bool, path: &mut Vec<Hash>) {
        let n = end - start;
        if m == n {
            if !whole {
                path.push(self.subtree_root(start, end));
            }
            return;
        }
        let k = split_point(n);
        if m <= k {
            self.collect_consistency(m, start, start + k, whole, path);
            path.push(self.subtree_root(start + k, end));
        } else {
            self.collect_consistency(m - k, start + k, end, false, path);
            path.push(self.subtree_root(start, start + k));
        }
    }
}

impl Default for MerkleAuditTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine peaks right to left into a root
fn fold_peaks(peaks: &[(u32, Hash)]) -> Hash {
    let mut iter = peaks.iter().rev();
    let Some(&(_, mut acc)) = iter.next() else {
        return Hash::ZERO;
    };
    for (_, peak) in iter {
        acc = Hash::node(peak, &acc);
    }
    acc
}
