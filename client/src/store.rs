//! Record store persisted to a single file.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bincode::config::standard;
use mescrow_core::{MemoryStore, RecordStore};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

const STORE_MAGIC: &[u8; 4] = b"MESC";

type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

/// Record store backed by a file.
///
/// Writes stay in memory until [`FileStore::flush`], which replaces the
/// file in one rename. Every flush bumps the file's generation; a flush from
/// a store opened at an older generation is refused, so two processes can
/// never both commit a transition of the same snapshot.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    generation: u64,
    records: MemoryStore,
}

impl FileStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (generation, records) = read_store(&path)?;
        debug!(
            path = %path.display(),
            generation,
            records = records.len(),
            "Opened record store"
        );
        Ok(Self {
            path,
            generation,
            records,
        })
    }

    /// Drops uncommitted writes and reloads the file.
    pub fn reload(&mut self) -> Result<()> {
        let (generation, records) = read_store(&self.path)?;
        self.generation = generation;
        self.records = records;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &MemoryStore {
        &self.records
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Writes all records to disk.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::StoreBusy`] while another flush holds the lock,
    /// and [`ClientError::StaleStore`] if the file was committed by someone
    /// else since this store was opened. Nothing is written in either case.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _lock = FlushLock::acquire(&self.path)?;

        let (found, _) = read_store(&self.path)?;
        if found != self.generation {
            return Err(ClientError::StaleStore {
                expected: self.generation,
                found,
            });
        }

        let generation = self.generation + 1;
        let entries: Entries = self.records.clone().into();
        let mut bytes = STORE_MAGIC.to_vec();
        bytes.extend(bincode::encode_to_vec((generation, &entries), standard())?);

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        self.generation = generation;
        debug!(
            path = %self.path.display(),
            generation,
            records = entries.len(),
            "Flushed record store"
        );
        Ok(())
    }
}

/// Sidecar `<store>.lock` file held for the duration of a flush.
struct FlushLock {
    path: PathBuf,
}

impl FlushLock {
    fn acquire(store: &Path) -> Result<Self> {
        let path = store.with_extension("lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(ClientError::StoreBusy(path)),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for FlushLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %err, "Failed to release store lock");
        }
    }
}

fn read_store(path: &Path) -> Result<(u64, MemoryStore)> {
    match std::fs::read(path) {
        Ok(bytes) => decode(&bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok((0, MemoryStore::new())),
        Err(e) => Err(e.into()),
    }
}

fn decode(bytes: &[u8]) -> Result<(u64, MemoryStore)> {
    let body = bytes
        .strip_prefix(STORE_MAGIC.as_slice())
        .ok_or_else(|| ClientError::Store("not a mescrow store file".to_string()))?;
    let ((generation, entries), read): ((u64, Entries), usize) =
        bincode::decode_from_slice(body, standard())?;
    if read != body.len() {
        return Err(ClientError::Store("trailing bytes in store file".to_string()));
    }
    Ok((generation, entries.into()))
}

impl RecordStore for FileStore {
    fn get(&self, id: &[u8]) -> Option<Vec<u8>> {
        self.records.get(id)
    }

    fn put(&mut self, id: &[u8], bytes: Vec<u8>) {
        self.records.put(id, bytes);
    }

    fn delete(&mut self, id: &[u8]) {
        self.records.delete(id);
    }
}
