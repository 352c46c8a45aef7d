//! Storage error types

use thiserror::Error;

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Corrupt storage file {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            Self::Keychain(_) => true,
            Self::Corrupt { .. } | Self::SerdeJson(_) => false,
        }
    }
}
