//! Fixed-width digest type and the tree combination rule, using BLAKE3
//!
//! Digest format:
//! - entry leaf: `H(0x00 || u32_le(len(key)) || key || H(value))`
//! - tree node:  `H(0x01 || left || right)`
//!
//! The domain prefixes keep a leaf from ever being confused with an
//! interior node of the same tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix byte for leaf digests
pub const LEAF_PREFIX: u8 = 0x00;

/// Prefix byte for interior node digests
pub const NODE_PREFIX: u8 = 0x01;

/// Digest size in bytes
pub const HASH_SIZE: usize = 32;

/// A 32-byte BLAKE3 digest
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// The zero hash: prior Alh of the first transaction, root of an empty tree
    pub const ZERO: Hash = Hash([0u8; HASH_SIZE]);

    /// Create a hash from raw bytes
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Hash arbitrary data
    pub fn digest(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }

    /// Hash multiple pieces of data
    pub fn digest_many(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Hash(*hasher.finalize().as_bytes())
    }

    /// Leaf digest of a key-value entry
    pub fn leaf(key: &[u8], value: &[u8]) -> Self {
        let value_hash = Hash::digest(value);
        let key_len = (key.len() as u32).to_le_bytes();
        Hash::digest_many(&[&[LEAF_PREFIX], &key_len, key, value_hash.as_bytes()])
    }

    /// Interior node digest, left child first
    pub fn node(left: &Hash, right: &Hash) -> Self {
        Hash::digest_many(&[&[NODE_PREFIX], left.as_bytes(), right.as_bytes()])
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != HASH_SIZE {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; HASH_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Hash(arr))
    }

    /// Get a short prefix for display (first 7 chars)
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// Check if this is the zero hash
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Hash::ZERO
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
