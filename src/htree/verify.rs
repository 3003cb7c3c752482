//! Path verification (RFC 9162, sections 2.1.3.2 and 2.1.4.2)
//!
//! These functions never fail: a path that does not lead to the expected
//! root is simply `false`.

use crate::model::Hash;

/// Root implied by an inclusion path, or `None` if the path has the wrong
/// length for `(index, size)`
pub fn inclusion_root(leaf: &Hash, index: u64, size: u64, path: &[Hash]) -> Option<Hash> {
    if index >= size {
        return None;
    }

    let mut fnode = index;
    let mut snode = size - 1;
    let mut root = *leaf;

    for sibling in path {
        if snode == 0 {
            return None;
        }
        if fnode & 1 == 1 || fnode == snode {
            root = Hash::node(sibling, &root);
            if fnode & 1 == 0 {
                while fnode & 1 == 0 && fnode != 0 {
                    fnode >>= 1;
                    snode >>= 1;
                }
            }
        } else {
            root = Hash::node(&root, sibling);
        }
        fnode >>= 1;
        snode >>= 1;
    }

    (snode == 0).then_some(root)
}

/// Check that `leaf` sits at `index` under `root` of a tree of `size` leaves
pub fn verify_inclusion(leaf: &Hash, index: u64, size: u64, path: &[Hash], root: &Hash) -> bool {
    inclusion_root(leaf, index, size, path).as_ref() == Some(root)
}

/// Check that `old_root` (size `m`) is a prefix of `new_root` (size `n`)
pub fn verify_consistency(m: u64, n: u64, path: &[Hash], old_root: &Hash, new_root: &Hash) -> bool {
    if m > n {
        return false;
    }
    if m == n {
        return path.is_empty() && old_root == new_root;
    }
    if m == 0 {
        return path.is_empty() && old_root.is_zero();
    }

    // A power-of-two old tree is itself a node of the new one and is not
    // repeated in the path
    let (seed, rest) = if m.is_power_of_two() {
        (*old_root, path)
    } else {
        match path.split_first() {
            Some((first, rest)) => (*first, rest),
            None => return false,
        }
    };

    let mut fnode = m - 1;
    let mut snode = n - 1;
    while fnode & 1 == 1 {
        fnode >>= 1;
        snode >>= 1;
    }

    let mut old_acc = seed;
    let mut new_acc = seed;
    for node in rest {
        if snode == 0 {
            return false;
        }
        if fnode & 1 == 1 || fnode == snode {
            old_acc = Hash::node(node, &old_acc);
            new_acc = Hash::node(node, &new_acc);
            if fnode & 1 == 0 {
                while fnode & 1 == 0 && fnode != 0 {
                    fnode >>= 1;
                    snode >>= 1;
                }
            }
        } else {
            new_acc = Hash::node(&new_acc, node);
        }
        fnode >>= 1;
        snode >>= 1;
    }

    snode == 0 && old_acc == *old_root && new_acc == *new_root
}
