//! The serialized commit path and the shared log state

use super::history::History;
use super::state::LogState;
use crate::model::{Entry, ImmutableState, KeyValue, Tx, TxMetadata};
use crate::store::TxStore;
use crate::{Error, Result, MAX_TX_ENTRIES};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::collections::HashSet;
use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

/// Append-only log of hash-chained transactions
///
/// Commits are totally ordered: `commit_lock` admits one at a time, and the
/// state write lock is only taken to publish a transaction that is already
/// durable. Readers take the state read lock (directly or through a
/// [`Snapshot`]) and see the log at a transaction boundary.
pub struct TransactionLog {
    store: TxStore,
    state: RwLock<LogState>,
    commit_lock: Mutex<()>,
    closed: AtomicBool,
    failed: AtomicBool,
}

/// A consistent, read-only view of the log
///
/// Commits cannot publish while a snapshot is alive, so keep it short.
pub struct Snapshot<'a> {
    guard: RwLockReadGuard<'a, LogState>,
}

impl Deref for Snapshot<'_> {
    type Target = LogState;

    fn deref(&self) -> &LogState {
        &self.guard
    }
}

impl TransactionLog {
    /// Create a new log file at `path`
    pub fn create(path: impl AsRef<Path>, sync_on_commit: bool) -> Result<Self> {
        let store = TxStore::create(&path, sync_on_commit)?;
        info!(path = %path.as_ref().display(), "created transaction log");
        Ok(Self::with_state(store, LogState::new()))
    }

    /// Open an existing log file and rebuild the tree and index from it
    ///
    /// With `verify_entries` every entry root is recomputed as well (the
    /// corruption checker); chain links are always checked.
    pub fn open(path: impl AsRef<Path>, sync_on_commit: bool, verify_entries: bool) -> Result<Self> {
        let (store, txs) = TxStore::open(&path, sync_on_commit)?;
        let state = LogState::replay(txs.into_iter().map(Arc::new), verify_entries).map_err(|e| {
            error!(path = %path.as_ref().display(), error = %e, "transaction log failed replay");
            e
        })?;

        let tip = state.current_state();
        info!(
            path = %path.as_ref().display(),
            tx_id = tip.tx_id,
            alh = %tip.tx_alh.short(),
            "opened transaction log"
        );
        Ok(Self::with_state(store, state))
    }

    fn with_state(store: TxStore, state: LogState) -> Self {
        TransactionLog {
            store,
            state: RwLock::new(state),
            commit_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        }
    }

    /// Commit a batch of writes as the next transaction
    pub fn commit(&self, entries: Vec<KeyValue>) -> Result<TxMetadata> {
        validate_entries(&entries)?;

        let _commit = self.commit_lock.lock();
        self.ensure_writable()?;

        let tx = Arc::new(self.state.read().prepare(entries, now_millis()));

        self.store.append(&tx)?;

        let mut state = self.state.write();
        if let Err(e) = state.apply(Arc::clone(&tx), false) {
            // The record is durable but could not be published
            self.mark_failed(&e);
            return Err(e);
        }
        drop(state);

        debug!(
            tx_id = tx.id(),
            entries = tx.entries.len(),
            alh = %tx.alh().short(),
            "committed transaction"
        );
        Ok(tx.metadata)
    }

    /// Take a point-in-time view for several reads or proof generation
    pub fn snapshot(&self) -> Result<Snapshot<'_>> {
        self.ensure_open()?;
        Ok(Snapshot {
            guard: self.state.read(),
        })
    }

    pub fn get(&self, key: &[u8], max_tx: Option<u64>) -> Result<Entry> {
        self.snapshot()?.get(key, max_tx)
    }

    pub fn history(&self, key: &[u8]) -> Result<History> {
        self.snapshot()?.history(key)
    }

    pub fn tx_by_id(&self, id: u64) -> Result<Arc<Tx>> {
        self.snapshot()?.tx(id).map(Arc::clone)
    }

    pub fn current_state(&self) -> Result<ImmutableState> {
        Ok(self.snapshot()?.current_state())
    }

    /// Re-read every record from the log file, re-derive every entry root,
    /// tree root and Alh from them and compare against the live state
    ///
    /// A mismatch is fatal: the log stops accepting commits.
    pub fn check_integrity(&self) -> Result<ImmutableState> {
        let _commit = self.commit_lock.lock();
        let snapshot = self.snapshot()?;
        let live = snapshot.current_state();

        let rebuilt = self.store.read_all().and_then(|stored| {
            if stored.len() as u64 != snapshot.tx_count() {
                return Err(Error::IntegrityViolation(format!(
                    "log file holds {} transactions, {} are live",
                    stored.len(),
                    snapshot.tx_count()
                )));
            }
            for (id, tx) in (1..).zip(&stored) {
                if **snapshot.tx(id)? != *tx {
                    return Err(Error::IntegrityViolation(format!(
                        "stored tx {} differs from the live transaction",
                        id
                    )));
                }
            }

            let derived = LogState::replay(stored.into_iter().map(Arc::new), true)?.current_state();
            if derived != live {
                return Err(Error::IntegrityViolation(format!(
                    "derived state at tx {} differs from live state",
                    derived.tx_id
                )));
            }
            Ok(derived)
        });
        drop(snapshot);

        match rebuilt {
            Ok(state) => {
                debug!(tx_id = state.tx_id, "integrity check passed");
                Ok(state)
            }
            Err(e) => {
                self.mark_failed(&e);
                Err(e)
            }
        }
    }

    /// Whether an integrity violation has disabled commits
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Flush the log file
    pub fn sync(&self) -> Result<()> {
        self.store.sync()
    }

    /// Stop accepting operations and flush. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let _commit = self.commit_lock.lock();
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.store.sync()?;
        info!(path = %self.store.path().display(), "closed transaction log");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        self.ensure_open()?;
        if self.is_failed() {
            return Err(Error::IntegrityViolation(
                "log is disabled after an earlier integrity violation".into(),
            ));
        }
        Ok(())
    }

    fn mark_failed(&self, cause: &Error) {
        self.failed.store(true, Ordering::SeqCst);
        error!(
            path = %self.store.path().display(),
            error = %cause,
            "integrity violation, refusing further commits"
        );
    }
}

/// Reject malformed batches before any state is touched
pub fn validate_entries(entries: &[KeyValue]) -> Result<()> {
    if entries.is_empty() {
        return Err(Error::EmptyEntries);
    }
    if entries.len() > MAX_TX_ENTRIES {
        return Err(Error::TooManyEntries {
            count: entries.len(),
            max: MAX_TX_ENTRIES,
        });
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for kv in entries {
        if kv.key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if !seen.insert(kv.key.as_slice()) {
            return Err(Error::DuplicateKey(hex::encode(&kv.key)));
        }
    }
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn kvs(pairs: &[(&str, &str)]) -> Vec<KeyValue> {
        pairs.iter().map(|&(k, v)| KeyValue::new(k, v)).collect()
    }

    #[test]
    fn test_validation() {
        assert!(matches!(validate_entries(&[]), Err(Error::EmptyEntries)));
        assert!(matches!(
            validate_entries(&kvs(&[("", "v")])),
            Err(Error::EmptyKey)
        ));
        assert!(matches!(
            validate_entries(&kvs(&[("a", "1"), ("b", "2"), ("a", "3")])),
            Err(Error::DuplicateKey(_))
        ));
        assert!(validate_entries(&kvs(&[("a", ""), ("b", "2")])).is_ok());
    }

    #[test]
    fn test_commit_assigns_sequential_ids() {
        let dir = tempdir().unwrap();
        let log = TransactionLog::create(dir.path().join("tx.log"), false).unwrap();

        for i in 1..=5u64 {
            let md = log.commit(kvs(&[("k", "v")])).unwrap();
            assert_eq!(md.id, i);
            assert_eq!(md.tree_size, i);
        }
        assert_eq!(log.current_state().unwrap().tx_id, 5);
    }

    #[test]
    fn test_rejected_commit_changes_nothing() {
        let dir = tempdir().unwrap();
        let log = TransactionLog::create(dir.path().join("tx.log"), false).unwrap();
        log.commit(kvs(&[("a", "1")])).unwrap();
        let before = log.current_state().unwrap();

        assert!(log.commit(kvs(&[("b", "1"), ("b", "2")])).is_err());
        assert!(log.commit(Vec::new()).is_err());

        assert_eq!(log.current_state().unwrap(), before);
        assert!(matches!(log.get(b"b", None), Err(Error::KeyNotFound)));
        assert_eq!(log.commit(kvs(&[("b", "1")])).unwrap().id, 2);
    }

    #[test]
    fn test_reopen_rebuilds_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tx.log");

        let state = {
            let log = TransactionLog::create(&path, true).unwrap();
            log.commit(kvs(&[("A", "1"), ("B", "1")])).unwrap();
            log.commit(kvs(&[("A", "2")])).unwrap();
            let state = log.current_state().unwrap();
            log.close().unwrap();
            state
        };

        let log = TransactionLog::open(&path, true, true).unwrap();
        assert_eq!(log.current_state().unwrap(), state);
        assert_eq!(log.get(b"A", None).unwrap().value, b"2".to_vec());
        assert_eq!(log.history(b"A").unwrap().count(), 2);
        assert_eq!(log.check_integrity().unwrap(), state);
    }

    #[test]
    fn test_file_changed_after_open_disables_commits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tx.log");
        let forged = dir.path().join("forged.log");

        let log = TransactionLog::create(&path, true).unwrap();
        log.commit(kvs(&[("A", "1")])).unwrap();
        log.commit(kvs(&[("A", "2")])).unwrap();

        // Same chain with tx 2 carrying another value, copied over in place
        {
            let other = TransactionLog::create(&forged, true).unwrap();
            other.commit(kvs(&[("A", "1")])).unwrap();
            other.commit(kvs(&[("A", "9")])).unwrap();
            other.close().unwrap();
        }
        std::fs::copy(&forged, &path).unwrap();

        assert!(matches!(
            log.check_integrity(),
            Err(Error::IntegrityViolation(_))
        ));
        assert!(log.is_failed());
        assert!(matches!(
            log.commit(kvs(&[("A", "3")])),
            Err(Error::IntegrityViolation(_))
        ));
        assert_eq!(log.current_state().unwrap().tx_id, 2);
    }

    #[test]
    fn test_closed_log_rejects_operations() {
        let dir = tempdir().unwrap();
        let log = TransactionLog::create(dir.path().join("tx.log"), false).unwrap();
        log.commit(kvs(&[("a", "1")])).unwrap();
        log.close().unwrap();
        log.close().unwrap();

        assert!(log.is_closed());
        assert!(matches!(log.commit(kvs(&[("a", "2")])), Err(Error::Closed)));
        assert!(matches!(log.get(b"a", None), Err(Error::Closed)));
    }

    #[test]
    fn test_concurrent_commits_have_no_gaps() {
        let dir = tempdir().unwrap();
        let log = Arc::new(TransactionLog::create(dir.path().join("tx.log"), false).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|i| {
                            let key = format!("thread-{}-{}", t, i);
                            log.commit(vec![KeyValue::new(key, "v")]).unwrap().id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=200).collect::<Vec<_>>());
        assert_eq!(log.check_integrity().unwrap().tx_id, 200);
    }
}
