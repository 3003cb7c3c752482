//! Single-file, append-only transaction record store
//!
//! File format:
//! ```text
//! [HEADER: 64 bytes]
//!   - magic: 8 bytes ("IMMULOG\0")
//!   - version: 4 bytes (u32 LE)
//!   - flags: 4 bytes
//!   - tx_count: 8 bytes (u64 LE, rewritten after each append)
//!   - reserved: 40 bytes
//!
//! [RECORDS: variable]
//!   - u32 LE payload length, then the payload (type byte + zstd data)
//!   - one record per transaction, in id order
//! ```
//!
//! The records are the only source of truth: the audit tree and the key
//! index are rebuilt from them on open. The header count is written after
//! the record it counts, so it may lag the records by one but never lead
//! them. A file holding fewer complete records than its header claims has
//! lost data and is refused rather than truncated.

use crate::model::Tx;
use crate::store::record::{payload_len, Record, FRAME_HEADER_SIZE};
use crate::{Error, Result, MAGIC, VERSION};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HEADER_SIZE: u64 = 64;

struct Inner {
    file: File,
    /// End of the last complete record
    write_offset: u64,
    tx_count: u64,
}

/// Append-only store of transaction records backed by a single file
pub struct TxStore {
    path: PathBuf,
    inner: Mutex<Inner>,
    sync_on_append: bool,
}

impl TxStore {
    /// Create a new, empty log file. Fails if the file exists.
    pub fn create(path: impl AsRef<Path>, sync_on_append: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::AlreadyExists(path.display().to_string()),
                _ => Error::Io(e),
            })?;

        let mut header = [0u8; HEADER_SIZE as usize];
        header[0..8].copy_from_slice(MAGIC);
        header[8..12].copy_from_slice(&VERSION.to_le_bytes());
        // flags: 0
        // tx_count: 0
        file.write_all(&header)?;
        file.sync_all()?;

        Ok(TxStore {
            path,
            inner: Mutex::new(Inner {
                file,
                write_offset: HEADER_SIZE,
                tx_count: 0,
            }),
            sync_on_append,
        })
    }

    /// Open an existing log file and load every complete record
    ///
    /// A torn record at the tail (a crash mid-append) is cut off; the file
    /// is truncated back to the last complete record. Damage anywhere else
    /// is an `IntegrityViolation` and leaves the file untouched.
    pub fn open(path: impl AsRef<Path>, sync_on_append: bool) -> Result<(Self, Vec<Tx>)> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::DatabaseNotFound(path.display().to_string()),
                _ => Error::Io(e),
            })?;

        let recorded = read_header(&mut file)?;
        let body = read_body(&mut file)?;
        let (txs, consumed) = load_records(&body, recorded)?;
        let write_offset = HEADER_SIZE + consumed;

        let file_len = HEADER_SIZE + body.len() as u64;
        if file_len > write_offset {
            warn!(
                path = %path.display(),
                dropped = file_len - write_offset,
                "truncating torn record at end of log"
            );
            file.set_len(write_offset)?;
            file.sync_all()?;
        }

        debug!(path = %path.display(), txs = txs.len(), "loaded transaction log");

        let store = TxStore {
            path,
            inner: Mutex::new(Inner {
                file,
                write_offset,
                tx_count: txs.len() as u64,
            }),
            sync_on_append,
        };
        Ok((store, txs))
    }

    /// Durably append one transaction record
    ///
    /// On failure the file is cut back to where it was, so a failed append
    /// leaves no partial record behind.
    pub fn append(&self, tx: &Tx) -> Result<()> {
        let framed = Record::from_tx(tx)?.frame()?;

        let mut inner = self.inner.lock();
        let offset = inner.write_offset;

        let tx_count = inner.tx_count + 1;
        let written = write_at(&mut inner.file, offset, &framed, self.sync_on_append)
            .and_then(|()| write_at(&mut inner.file, 16, &tx_count.to_le_bytes(), false));
        if let Err(e) = written {
            if let Err(rollback) = inner.file.set_len(offset) {
                warn!(
                    path = %self.path.display(),
                    offset,
                    error = %rollback,
                    "failed to roll back partial record"
                );
            }
            return Err(e);
        }

        inner.write_offset = offset + framed.len() as u64;
        inner.tx_count = tx_count;
        Ok(())
    }

    /// Decode every record from the file again, ignoring what `open` loaded
    ///
    /// The file must still end exactly at the last appended record; anything
    /// else means it was changed behind this store.
    pub fn read_all(&self) -> Result<Vec<Tx>> {
        let mut inner = self.inner.lock();
        let changed = |e: Error| Error::IntegrityViolation(format!("log file changed: {}", e));

        let recorded = read_header(&mut inner.file).map_err(changed)?;
        let body = read_body(&mut inner.file)?;
        let (txs, consumed) = load_records(&body, recorded)?;

        let file_len = HEADER_SIZE + body.len() as u64;
        if HEADER_SIZE + consumed != inner.write_offset || file_len != inner.write_offset {
            return Err(Error::IntegrityViolation(format!(
                "log file spans {} bytes of records, expected {}",
                file_len - HEADER_SIZE,
                inner.write_offset - HEADER_SIZE
            )));
        }
        Ok(txs)
    }

    /// Number of records in the file
    pub fn tx_count(&self) -> u64 {
        self.inner.lock().tx_count
    }

    /// Flush the header and all data to disk
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let tx_count = inner.tx_count;
        inner.file.seek(SeekFrom::Start(16))?;
        inner.file.write_all(&tx_count.to_le_bytes())?;
        inner.file.sync_all()?;
        Ok(())
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TxStore {
    fn drop(&mut self) {
        // Best-effort sync on drop
        let _ = self.sync();
    }
}

fn write_at(file: &mut File, offset: u64, bytes: &[u8], sync: bool) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

/// Check the header and return the record count it holds
fn read_header(file: &mut File) -> Result<u64> {
    let mut header = [0u8; HEADER_SIZE as usize];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut header)
        .map_err(|_| Error::InvalidFile("Truncated header".into()))?;

    if &header[0..8] != MAGIC {
        return Err(Error::InvalidFile("Invalid magic bytes".into()));
    }

    let version = u32::from_le_bytes(read_array(&header[8..12]));
    if version != VERSION {
        return Err(Error::VersionMismatch {
            expected: VERSION,
            found: version,
        });
    }

    Ok(u64::from_le_bytes(read_array(&header[16..24])))
}

fn read_body(file: &mut File) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    file.seek(SeekFrom::Start(HEADER_SIZE))?;
    file.read_to_end(&mut body)?;
    Ok(body)
}

/// Decode consecutive frames; returns the transactions and the number of
/// bytes they span.
///
/// Only the frame after the last counted record may be incomplete. An empty
/// frame, or a short frame that leaves fewer records than `recorded`, is a
/// corrupted log.
fn load_records(mut buf: &[u8], recorded: u64) -> Result<(Vec<Tx>, u64)> {
    let mut txs = Vec::new();
    let mut consumed = 0u64;

    while let Some(len) = payload_len(buf) {
        let end = FRAME_HEADER_SIZE + len;
        if len == 0 {
            return Err(Error::IntegrityViolation(format!(
                "empty record #{} at offset {}",
                txs.len() + 1,
                HEADER_SIZE + consumed
            )));
        }
        if buf.len() < end {
            break;
        }

        let tx = Record::unframe(&buf[FRAME_HEADER_SIZE..end])
            .and_then(|record| record.to_tx())
            .map_err(|e| {
                Error::IntegrityViolation(format!(
                    "unreadable record #{} at offset {}: {}",
                    txs.len() + 1,
                    HEADER_SIZE + consumed,
                    e
                ))
            })?;

        txs.push(tx);
        consumed += end as u64;
        buf = &buf[end..];
    }

    if (txs.len() as u64) < recorded {
        return Err(Error::IntegrityViolation(format!(
            "log holds {} complete records, header records {}; record #{} at offset {} is damaged",
            txs.len(),
            recorded,
            txs.len() + 1,
            HEADER_SIZE + consumed
        )));
    }

    Ok((txs, consumed))
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes[..N]);
    arr
}
