//! Key-value entries and the revisions returned by reads

use super::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single key-value write
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Non-empty key bytes
    pub key: Vec<u8>,
    /// Value bytes (may be empty)
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Leaf digest of this entry inside a transaction's entry tree
    pub fn digest(&self) -> Hash {
        Hash::leaf(&self.key, &self.value)
    }
}

impl fmt::Debug for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValue")
            .field("key", &String::from_utf8_lossy(&self.key))
            .field("value_len", &self.value.len())
            .finish()
    }
}

impl<K: Into<Vec<u8>>, V: Into<Vec<u8>>> From<(K, V)> for KeyValue {
    fn from((key, value): (K, V)) -> Self {
        KeyValue::new(key, value)
    }
}

/// One revision of a key, as returned by `get` and `history`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// The transaction that wrote this revision
    pub tx: u64,
}

impl Entry {
    pub fn key_value(&self) -> KeyValue {
        KeyValue::new(self.key.clone(), self.value.clone())
    }
}
