//! Credential store selection

use std::sync::Arc;

use propdesk_common::{FileStore, KeyValueStore, MemoryStore};
use propdesk_domain::StorageConfig;
use tracing::debug;

use crate::errors::ApiError;

/// Open the credential store described by `config`
///
/// # Errors
/// Returns [`ApiError::Storage`] if a file store cannot be opened, and
/// [`ApiError::Config`] for the keychain backend when the `keychain`
/// feature is disabled.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, ApiError> {
    match config {
        StorageConfig::Memory => {
            debug!("using in-memory credential store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageConfig::File { path } => {
            debug!(path = %path.display(), "using file credential store");
            Ok(Arc::new(FileStore::open(path.clone())?))
        }
        #[cfg(feature = "keychain")]
        StorageConfig::Keychain { service } => {
            debug!(service = %service, "using keychain credential store");
            Ok(Arc::new(propdesk_common::KeychainStore::new(service.clone())))
        }
        #[cfg(not(feature = "keychain"))]
        StorageConfig::Keychain { .. } => Err(ApiError::Config(
            "keychain storage requires the `keychain` feature".to_string(),
        )),
    }
}
