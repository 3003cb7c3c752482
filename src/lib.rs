//! # immulog
//!
//! A verifiable, append-only key-value transaction log.
//!
//! Every commit is bound into a hash chain (the accumulated linked hash,
//! or Alh) and into an append-only Merkle audit tree, so a client holding
//! one trusted checkpoint can check any later state, and any value read,
//! without trusting the server.
//!
//! ## Core Concepts
//!
//! - **Transactions**: atomic batches of writes with sequential ids
//! - **Alh**: each transaction's hash covers every transaction before it
//! - **Audit tree**: one leaf per transaction; old roots are prefixes of new ones
//! - **Proofs**: inclusion (a value in a transaction) and dual (two
//!   transactions in one history)
//!
//! ## Example
//!
//! ```ignore
//! use immulog::{Database, ImmutableState, KeyValue, Options};
//!
//! let db = Database::open_or_create(Options::new().with_root_path("data"))?;
//! db.set(vec![KeyValue::new("greeting", "hello")])?;
//!
//! let trusted = ImmutableState::empty();
//! let entry = db.verifiable_get(b"greeting", None, trusted.tx_id)?;
//! let trusted = entry.verify(&trusted)?;
//! ```

pub mod htree;
pub mod index;
pub mod model;
pub mod options;
pub mod proof;
pub mod store;
pub mod txlog;

mod database;
mod error;

pub use database::{Database, Health};
pub use error::{Error, ErrorKind, Result};
pub use model::{Entry, Hash, ImmutableState, KeyValue, Tx, TxMetadata};
pub use options::Options;
pub use proof::{
    verify, verify_dual_proof, verify_inclusion, verify_tx_inclusion, Claim, DualProof,
    InclusionProof, Proof, VerifiableEntry, VerifiableTx,
};
pub use txlog::History;

/// Log file format version
pub const VERSION: u32 = 1;

/// Magic bytes for file identification
pub const MAGIC: &[u8; 8] = b"IMMULOG\0";

/// Most entries a single transaction may carry
pub const MAX_TX_ENTRIES: usize = 1024;
