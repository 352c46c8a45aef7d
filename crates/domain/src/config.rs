//! Client configuration structures
//!
//! Loaded by `propdesk-infra::config::loader` from environment variables or
//! a TOML/JSON file; every field has a default so partial files are valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_CACHE_TTL_MS, DEFAULT_REALTIME_PATH, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};
use crate::errors::{PropDeskError, Result};
use crate::utils::serde::duration_millis;

/// Top-level configuration for an API client instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every endpoint is appended to (e.g. `http://localhost:5000/api`)
    pub base_url: String,

    /// Per-attempt request timeout
    #[serde(with = "duration_millis", rename = "timeout_ms")]
    pub timeout: Duration,

    /// Total attempts per request (initial try + retries)
    pub retry_attempts: u32,

    /// Base delay for linear backoff (`retry_delay * attempt`)
    #[serde(with = "duration_millis", rename = "retry_delay_ms")]
    pub retry_delay: Duration,

    /// Default TTL for cached GET responses
    #[serde(with = "duration_millis", rename = "cache_ttl_ms")]
    pub cache_ttl: Duration,

    pub realtime: RealtimeConfig,

    pub storage: StorageConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            realtime: RealtimeConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given base URL with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retry attempts and the linear backoff base delay
    #[must_use]
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Set the default cache TTL
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the realtime reconnect delay
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.realtime.reconnect_delay = delay;
        self
    }

    /// Base URL without a trailing slash
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `PropDeskError::Config` when the base URL is empty or not an
    /// http(s) URL, or when `retry_attempts` is zero.
    pub fn validate(&self) -> Result<()> {
        let base = self.normalized_base_url();
        if base.is_empty() {
            return Err(PropDeskError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(PropDeskError::Config(format!(
                "base_url must use http or https: {base}"
            )));
        }
        if self.retry_attempts == 0 {
            return Err(PropDeskError::Config("retry_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Realtime channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Path appended to the base URL for the WebSocket endpoint
    pub path: String,

    /// Fixed delay before reconnecting after an unexpected close
    #[serde(with = "duration_millis", rename = "reconnect_delay_ms")]
    pub reconnect_delay: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_REALTIME_PATH.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }
}

/// Where credentials are persisted between sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// In-process only; credentials are lost on exit
    #[default]
    Memory,
    /// JSON file on disk
    File { path: PathBuf },
    /// Platform keychain under the given service name
    Keychain { service: String },
}
