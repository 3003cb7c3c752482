//! Node addressing for the history tree

/// Position of a complete subtree: `level` 0 is a leaf, level `h` covers
/// `2^h` leaves starting at leaf `index << level`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeIndex {
    pub level: u32,
    pub index: u64,
}

impl NodeIndex {
    pub fn new(level: u32, index: u64) -> Self {
        NodeIndex { level, index }
    }

    /// The complete subtree covering exactly `[start, end)`, if there is one
    pub fn covering(start: u64, end: u64) -> Option<Self> {
        let width = end.checked_sub(start)?;
        if width == 0 || !width.is_power_of_two() || start % width != 0 {
            return None;
        }
        let level = width.trailing_zeros();
        Some(NodeIndex::new(level, start >> level))
    }

    /// Number of leaves under this node
    pub fn width(&self) -> u64 {
        1u64 << self.level
    }

    /// First leaf under this node
    pub fn first_leaf(&self) -> u64 {
        self.index << self.level
    }
}

/// Largest power of two strictly less than `n` (`n >= 2`)
pub fn split_point(n: u64) -> u64 {
    debug_assert!(n >= 2, "split_point needs at least two leaves");
    1u64 << (63 - (n - 1).leading_zeros())
}
