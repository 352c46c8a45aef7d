//! Per-call options

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::http::ProgressFn;

/// Options for a JSON request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Serve and store GET responses through the cache
    pub use_cache: bool,
    /// TTL for the cached response, overriding the client default
    pub cache_ttl: Option<Duration>,
    /// Per-attempt timeout, overriding the client default
    pub timeout: Option<Duration>,
    /// Extra headers; an `Authorization` header here suppresses the bearer token
    pub headers: BTreeMap<String, String>,
    /// Abort the call when this token is cancelled
    pub cancel: Option<CancellationToken>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_ttl: None,
            timeout: None,
            headers: BTreeMap::new(),
            cancel: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bypass the cache for this call
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Options for [`ApiClient::upload_file`](super::ApiClient::upload_file)
#[derive(Clone, Default)]
pub struct UploadOptions {
    /// Text fields sent next to the file
    pub additional_data: BTreeMap<String, String>,
    pub on_progress: Option<ProgressFn>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_data.insert(name.into(), value.into());
        self
    }

    /// Report progress as a fraction in `0.0..=1.0`
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("additional_data", &self.additional_data)
            .field("on_progress", &self.on_progress.is_some())
            .field("timeout", &self.timeout)
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}
