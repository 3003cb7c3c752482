//! Error types for immulog

use thiserror::Error;

/// Result type alias for immulog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in immulog operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Validation ===
    #[error("Transaction has no entries")]
    EmptyEntries,

    #[error("Empty key")]
    EmptyKey,

    #[error("Duplicate key in transaction: {0}")]
    DuplicateKey(String),

    #[error("Too many entries in transaction: {count} (max {max})")]
    TooManyEntries { count: usize, max: usize },

    // === Not found ===
    #[error("Key not found")]
    KeyNotFound,

    #[error("Transaction not found: {0}")]
    TxNotFound(u64),

    #[error("Key not written in transaction {0}")]
    KeyNotInTx(u64),

    // === Range ===
    #[error("Tree size {size} out of range (tree has {len} leaves)")]
    SizeOutOfRange { size: u64, len: u64 },

    #[error("Leaf index {index} out of range for tree size {size}")]
    IndexOutOfRange { index: u64, size: u64 },

    #[error("Invalid range: {from}..{to}")]
    InvalidRange { from: u64, to: u64 },

    // === Integrity ===
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    // === Storage and lifecycle ===
    #[error("Invalid database file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Database already exists: {0}")]
    AlreadyExists(String),

    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Database is closed")]
    Closed,

    #[error("Config error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input, nothing was changed
    Validation,
    /// A key, transaction or database that does not exist
    NotFound,
    /// Proof or tree sizes that do not fit the log
    Range,
    /// Stored state disagrees with its own hashes
    Integrity,
    /// Everything else: IO, encoding, lifecycle
    Storage,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyEntries
            | Error::EmptyKey
            | Error::DuplicateKey(_)
            | Error::TooManyEntries { .. } => ErrorKind::Validation,
            Error::KeyNotFound
            | Error::TxNotFound(_)
            | Error::KeyNotInTx(_)
            | Error::DatabaseNotFound(_) => ErrorKind::NotFound,
            Error::SizeOutOfRange { .. }
            | Error::IndexOutOfRange { .. }
            | Error::InvalidRange { .. } => ErrorKind::Range,
            Error::IntegrityViolation(_) | Error::VerificationFailed(_) => ErrorKind::Integrity,
            Error::Io(_)
            | Error::Serialization(_)
            | Error::Json(_)
            | Error::InvalidFile(_)
            | Error::VersionMismatch { .. }
            | Error::AlreadyExists(_)
            | Error::Closed
            | Error::Config(_) => ErrorKind::Storage,
        }
    }

    /// True for errors the caller can fix by changing the request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Range
        )
    }
}
