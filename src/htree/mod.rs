//! Append-only Merkle history tree
//!
//! The tree is shaped as in RFC 6962: a tree over `n > 1` leaves splits at
//! the largest power of two strictly below `n`, left side first. Only
//! complete, aligned subtrees are stored, so nothing stored ever changes
//! once written, and the root at any earlier size stays recoverable.
//!
//! - [`MerkleAuditTree`] holds the leaves and answers root, inclusion and
//!   consistency queries
//! - [`verify_inclusion`] and [`verify_consistency`] re-derive roots from
//!   a path without access to the tree

mod node;
mod tree;
mod verify;

pub use node::{split_point, NodeIndex};
pub use tree::MerkleAuditTree;
pub use verify::{inclusion_root, verify_consistency, verify_inclusion};
