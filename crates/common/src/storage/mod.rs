//! Durable key/value storage for session state
//!
//! The token manager persists credentials through [`KeyValueStore`]. Three
//! backends ship here:
//! - [`MemoryStore`]: process-local, for tests and ephemeral sessions
//! - [`FileStore`]: a JSON object on disk, rewritten atomically on change
//! - `KeychainStore` (`platform` feature): the OS credential store

pub mod error;
pub mod file;
#[cfg(feature = "platform")]
pub mod keychain;
pub mod memory;

use std::sync::Arc;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
#[cfg(feature = "platform")]
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

/// String key/value store
///
/// Implementations must be safe to call from any thread; calls are short and
/// synchronous.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}
