//! Key-value storage for the persistence layer
//!
//! The application keeps its whole state under a handful of string keys.
//! [`FileKeyValueStore`] maps each key to a file inside a data directory and
//! guards writes with an advisory lock so two running instances never tear a
//! file. [`MemoryKeyValueStore`] keeps everything in memory and can be told to
//! reject reads or writes, which is how tests exercise a locked or full store.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// File is locked by another process
    #[error("{0:?} is locked by another process")]
    FileLocked(PathBuf),
    /// Other IO error
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The store refused the write
    #[error("storage quota exceeded while writing '{0}'")]
    QuotaExceeded(String),
    /// In-memory state was poisoned by a panicking writer
    #[error("storage state is poisoned")]
    Poisoned,
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A flat string-keyed store
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing what was there
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(100);

/// Stores each key as a file inside a directory
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `root`. The directory must already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.lock", key))
    }

    /// Acquire an exclusive lock for writing `key`.
    /// The returned handle must be held for the duration of the write.
    fn acquire_write_lock(&self, key: &str) -> Result<File, StorageError> {
        let lock_path = self.lock_path(key);
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| StorageError::io(&lock_path, e))?;

        let start = Instant::now();
        loop {
            match lock_file.try_lock_exclusive() {
                Ok(()) => return Ok(lock_file),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        return Err(StorageError::FileLocked(self.value_path(key)));
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(StorageError::io(&lock_path, e)),
            }
        }
    }

    /// Acquire a shared lock for reading `key`, if anyone has ever written it
    fn acquire_read_lock(&self, key: &str) -> Result<Option<File>, StorageError> {
        let lock_path = self.lock_path(key);
        if !lock_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&lock_path)
            .map_err(|e| StorageError::io(&lock_path, e))?;

        let start = Instant::now();
        loop {
            match FileExt::try_lock_shared(&lock_file) {
                Ok(()) => return Ok(Some(lock_file)),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        return Err(StorageError::FileLocked(self.value_path(key)));
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(StorageError::io(&lock_path, e)),
            }
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.value_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let _lock = self.acquire_read_lock(key)?;
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| StorageError::io(&path, e))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut lock_file = self.acquire_write_lock(key)?;

        // Lock holder info, for debugging stuck locks
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        let path = self.value_path(key);
        fs::write(&path, value).map_err(|e| StorageError::io(&path, e))
        // Lock is released when lock_file is dropped
    }
}

/// In-memory store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    reject_reads: Arc<AtomicBool>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every `get` fails as if the key were locked elsewhere
    pub fn set_reject_reads(&self, reject: bool) {
        self.reject_reads.store(reject, Ordering::SeqCst);
    }

    /// When set, every `set` fails with [`StorageError::QuotaExceeded`]
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.reject_reads.load(Ordering::SeqCst) {
            return Err(StorageError::FileLocked(PathBuf::from(key)));
        }
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::QuotaExceeded(key.to_string()));
        }
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path());

        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn test_file_store_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path());

        store.set("greeting", "hello").unwrap();
        store.set("greeting", "hello again").unwrap();

        assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello again"));
        assert!(temp_dir.path().join("greeting").exists());
        assert!(temp_dir.path().join("greeting.lock").exists());
    }

    #[test]
    fn test_file_store_shared_between_instances() {
        let temp_dir = TempDir::new().unwrap();
        let first = FileKeyValueStore::new(temp_dir.path());
        let second = FileKeyValueStore::new(temp_dir.path());

        first.set("key", "from first").unwrap();
        assert_eq!(second.get("key").unwrap().as_deref(), Some("from first"));

        // Last write wins
        second.set("key", "from second").unwrap();
        assert_eq!(first.get("key").unwrap().as_deref(), Some("from second"));
    }

    #[test]
    fn test_file_store_missing_root_fails_write() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path().join("gone"));

        let err = store.set("key", "value").unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryKeyValueStore::new();
        let view = store.clone();

        store.set("a", "1").unwrap();

        assert_eq!(view.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_memory_store_rejects_writes() {
        let store = MemoryKeyValueStore::new();
        store.set("a", "1").unwrap();
        store.set_reject_writes(true);

        let err = store.set("a", "2").unwrap_err();

        assert!(matches!(err, StorageError::QuotaExceeded(ref key) if key == "a"));
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }
}
