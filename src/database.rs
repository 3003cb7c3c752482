//! High-level Database API
//!
//! This module provides the main entry point for interacting with immulog:
//! plain reads and writes, verifiable reads and writes, and lifecycle.

use crate::model::{Entry, ImmutableState, KeyValue, Tx, TxMetadata};
use crate::options::Options;
use crate::proof::{DualProof, InclusionProof, ProofEngine, VerifiableEntry, VerifiableTx};
use crate::txlog::{History, TransactionLog};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind as IoErrorKind;
use std::sync::Arc;
use tracing::info;

/// The main database interface
///
/// All methods take `&self`; a `Database` can be shared between threads
/// behind an `Arc`. Commits are serialized, reads run concurrently.
pub struct Database {
    options: Options,
    log: TransactionLog,
}

/// Liveness summary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// False once the database is closed or has seen an integrity violation
    pub status: bool,
    /// Id of the last committed transaction
    pub tx_id: u64,
}

impl Database {
    /// Create a new database; fails if its directory already exists
    pub fn create(options: Options) -> Result<Self> {
        options.validate()?;
        std::fs::create_dir_all(&options.root_path)?;

        let db_dir = options.db_dir();
        std::fs::create_dir(&db_dir).map_err(|e| match e.kind() {
            IoErrorKind::AlreadyExists => Error::AlreadyExists(db_dir.display().to_string()),
            _ => Error::Io(e),
        })?;

        let log = TransactionLog::create(options.log_path(), options.sync_on_commit)?;
        info!(name = %options.name, root = %options.root_path.display(), "created database");
        Ok(Database { options, log })
    }

    /// Open an existing database, replaying its log
    pub fn open(options: Options) -> Result<Self> {
        options.validate()?;

        let db_dir = options.db_dir();
        if !db_dir.is_dir() {
            return Err(Error::DatabaseNotFound(db_dir.display().to_string()));
        }

        let log = TransactionLog::open(
            options.log_path(),
            options.sync_on_commit,
            options.corruption_checker,
        )?;
        info!(name = %options.name, root = %options.root_path.display(), "opened database");
        Ok(Database { options, log })
    }

    /// Open the database if it exists, otherwise create it
    pub fn open_or_create(options: Options) -> Result<Self> {
        if options.db_dir().is_dir() {
            Self::open(options)
        } else {
            Self::create(options)
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // === Writes ===

    /// Commit `entries` atomically as one transaction
    pub fn set(&self, entries: Vec<KeyValue>) -> Result<TxMetadata> {
        self.log.commit(entries)
    }

    /// Commit and return the new transaction with a proof from
    /// `trusted_from_tx` (0 for none)
    pub fn verifiable_set(&self, entries: Vec<KeyValue>, trusted_from_tx: u64) -> Result<VerifiableTx> {
        let metadata = self.log.commit(entries)?;
        let snapshot = self.log.snapshot()?;
        ProofEngine::new(&snapshot).verifiable_tx(metadata.id, trusted_from_tx)
    }

    // === Reads ===

    /// Latest value of `key`, or the latest at or before `max_tx`
    pub fn get(&self, key: &[u8], max_tx: Option<u64>) -> Result<Entry> {
        self.log.get(key, max_tx)
    }

    /// Several keys read against the same state
    pub fn get_all<K: AsRef<[u8]>>(&self, keys: &[K], max_tx: Option<u64>) -> Result<Vec<Entry>> {
        let snapshot = self.log.snapshot()?;
        keys.iter()
            .map(|key| snapshot.get(key.as_ref(), max_tx))
            .collect()
    }

    /// Every revision of `key`, oldest first
    pub fn history(&self, key: &[u8]) -> Result<History> {
        self.log.history(key)
    }

    pub fn tx_by_id(&self, id: u64) -> Result<Arc<Tx>> {
        self.log.tx_by_id(id)
    }

    /// The checkpoint a client should trust after this call
    pub fn current_state(&self) -> Result<ImmutableState> {
        self.log.current_state()
    }

    // === Verifiable reads ===

    /// Read `key` together with proofs against `trusted_from_tx`
    pub fn verifiable_get(
        &self,
        key: &[u8],
        max_tx: Option<u64>,
        trusted_from_tx: u64,
    ) -> Result<VerifiableEntry> {
        let snapshot = self.log.snapshot()?;
        let entry = snapshot.get(key, max_tx)?;
        ProofEngine::new(&snapshot).verifiable_entry(entry, trusted_from_tx)
    }

    pub fn verifiable_tx_by_id(&self, id: u64, trusted_from_tx: u64) -> Result<VerifiableTx> {
        let snapshot = self.log.snapshot()?;
        ProofEngine::new(&snapshot).verifiable_tx(id, trusted_from_tx)
    }

    pub fn inclusion_proof(&self, tx_id: u64, key: &[u8]) -> Result<InclusionProof> {
        let snapshot = self.log.snapshot()?;
        ProofEngine::new(&snapshot).inclusion_proof(tx_id, key)
    }

    pub fn dual_proof(&self, source: u64, target: u64) -> Result<DualProof> {
        let snapshot = self.log.snapshot()?;
        ProofEngine::new(&snapshot).dual_proof(source, target)
    }

    // === Lifecycle ===

    pub fn health(&self) -> Health {
        let tx_id = self.log.current_state().map(|s| s.tx_id).unwrap_or(0);
        Health {
            status: !self.log.is_closed() && !self.log.is_failed(),
            tx_id,
        }
    }

    /// Recompute every hash from the stored transactions
    pub fn check_integrity(&self) -> Result<ImmutableState> {
        self.log.check_integrity()
    }

    pub fn sync(&self) -> Result<()> {
        self.log.sync()
    }

    pub fn close(&self) -> Result<()> {
        self.log.close()?;
        info!(name = %self.options.name, "closed database");
        Ok(())
    }
}
