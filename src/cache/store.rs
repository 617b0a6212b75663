//! Snapshot storage backends.
//!
//! A store holds one opaque byte blob per key and reports when it was last
//! written. The cache judges freshness from that timestamp, never from the
//! blob's contents.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use super::{CacheError, Clock};

pub trait SnapshotStore: Send + Sync {
    /// Last write time of `key`, or `None` if nothing is stored.
    fn modified_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, CacheError>;

    fn read(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Replaces the blob for `key` whole. Readers see the old or the new
    /// contents, never a mix.
    fn write(&self, key: &str, contents: &[u8]) -> Result<(), CacheError>;
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// One `<key>.json` file per source under a cache directory.
///
/// The directory is created on first write. Writes go to a temporary file
/// in the same directory which is then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Store {
        path: path.to_path_buf(),
        source,
    }
}

impl SnapshotStore for FileStore {
    fn modified_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, CacheError> {
        let path = self.path_for(key);
        match fs::metadata(&path) {
            Ok(meta) => {
                let modified = meta.modified().map_err(|e| io_error(&path, e))?;
                Ok(Some(DateTime::<Utc>::from(modified)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.path_for(key);
        fs::read(&path).map_err(|e| io_error(&path, e))
    }

    fn write(&self, key: &str, contents: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        tmp.write_all(contents).map_err(|e| io_error(tmp.path(), e))?;
        tmp.flush().map_err(|e| io_error(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| io_error(&path, e.error))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// In-process store; write times come from the injected clock.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (DateTime<Utc>, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `contents` with an explicit write time.
    pub fn insert_at(&self, key: &str, contents: Vec<u8>, modified_at: DateTime<Utc>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), (modified_at, contents));
    }
}

impl SnapshotStore for MemoryStore {
    fn modified_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).map(|(modified, _)| *modified))
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| CacheError::Store {
                path: PathBuf::from(key),
                source: std::io::Error::new(ErrorKind::NotFound, "no snapshot stored"),
            })
    }

    fn write(&self, key: &str, contents: &[u8]) -> Result<(), CacheError> {
        self.insert_at(key, contents.to_vec(), self.clock.now());
        Ok(())
    }
}
