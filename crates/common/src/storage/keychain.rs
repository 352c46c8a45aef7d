//! Platform keychain store
//!
//! Each key becomes one keychain entry under the configured service name
//! (macOS Keychain Access, Windows Credential Manager, Linux Secret Service).
//!
//! ```no_run
//! use propdesk_common::storage::{KeyValueStore, KeychainStore};
//!
//! let store = KeychainStore::new("PropDesk.session");
//! store.set("token", "access-token")?;
//! assert_eq!(store.get("token")?.as_deref(), Some("access-token"));
//! # Ok::<(), propdesk_common::storage::StorageError>(())
//! ```

use keyring::Entry;
use tracing::debug;

use super::{KeyValueStore, StorageError, StorageResult};

/// Store backed by the OS credential manager
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    /// Create a store for a specific service (e.g. `"PropDesk.session"`)
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> StorageResult<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            StorageError::Keychain(format!("Failed to open entry for {key}: {e}"))
        })
    }
}

impl KeyValueStore for KeychainStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "reading keychain entry");
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Keychain(format!("Failed to read {key}: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "writing keychain entry");
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::Keychain(format!("Failed to store {key}: {e}")))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "deleting keychain entry");
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::Keychain(format!("Failed to delete {key}: {e}"))),
        }
    }
}
