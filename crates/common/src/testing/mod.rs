//! Test fixtures for crates that depend on the storage layer
//!
//! Enabled with the `test-utils` feature.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tempfile::TempDir;

use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageResult};

/// Create a [`FileStore`] inside a fresh temporary directory
///
/// The directory is removed when the returned `TempDir` is dropped.
///
/// # Errors
/// Propagates I/O errors from creating the directory.
pub fn temp_file_store() -> StorageResult<(TempDir, FileStore)> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::open(dir.path().join("session.json"))?;
    Ok((dir, store))
}

/// In-memory store that counts writes and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
    removes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `set`/`remove` calls fail with a keychain error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    fn check(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Keychain("write rejected by test store".into()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for RecordingStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.check()?;
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_store_counts_and_fails() {
        let store = RecordingStore::new();
        store.set("token", "a").unwrap();
        store.remove("token").unwrap();
        assert_eq!((store.writes(), store.removes()), (1, 1));

        store.fail_writes(true);
        assert!(store.set("token", "b").is_err());
        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn temp_file_store_round_trips() {
        let (_dir, store) = temp_file_store().unwrap();
        store.set("refreshToken", "r").unwrap();
        assert_eq!(store.get("refreshToken").unwrap().as_deref(), Some("r"));
    }
}
