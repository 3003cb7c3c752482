//! Key index: which transactions wrote which keys

mod key_index;

pub use key_index::{KeyIndex, Revision};
