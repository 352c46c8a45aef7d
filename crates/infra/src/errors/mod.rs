//! Client-facing error taxonomy
//!
//! Every public operation of the access layer fails with an [`ApiError`]. The
//! variants follow the recovery policy: transient failures are retried inside
//! the transport, expired credentials go through the refresh protocol, and
//! everything else is terminal and reaches the caller unchanged.

pub mod conversions;

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401 / 403 and failed refreshes
    Authentication,
    /// 429
    RateLimit,
    /// 5xx - retryable
    Server,
    /// Other 4xx - non-retryable
    Client,
    /// Connection failures and timeouts - retryable
    Network,
    /// Local misconfiguration, storage or decode failures
    Config,
    /// Caller-initiated abort
    Cancelled,
}

/// API operation errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Non-2xx reply that is not an authentication failure
    #[error("{message}")]
    Http { status: u16, message: String, body: Value },

    /// 401 that the refresh protocol can recover from; callers of the facade
    /// only see this when a refresh was not attempted
    #[error("Access token expired")]
    AuthExpired,

    /// 401 without a usable refresh, or 403
    #[error("{message}")]
    AuthDenied { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    RefreshFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Realtime error: {0}")]
    Realtime(String),
}

impl ApiError {
    /// Build the error for a non-2xx reply.
    ///
    /// The message is the `message` field of a JSON error body when present,
    /// otherwise `HTTP <status>: <reason>`. 401 and 403 are authentication
    /// denials; everything else is an [`ApiError::Http`].
    pub fn from_response(status: u16, reason: &str, body_text: &str) -> Self {
        let body = if body_text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body_text).unwrap_or_else(|_| Value::String(body_text.to_string()))
        };

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| format!("HTTP {status}: {reason}"), str::to_string);

        match status {
            401 | 403 => Self::AuthDenied { status, message },
            _ => Self::Http { status, message, body },
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::AuthDenied { status, .. } => Some(*status),
            Self::AuthExpired => Some(401),
            _ => None,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Http { status: 429, .. } => ApiErrorCategory::RateLimit,
            Self::Http { status, .. } if *status >= 500 => ApiErrorCategory::Server,
            Self::Http { .. } => ApiErrorCategory::Client,
            Self::AuthExpired | Self::AuthDenied { .. } | Self::RefreshFailed(_) => {
                ApiErrorCategory::Authentication
            }
            Self::Cancelled => ApiErrorCategory::Cancelled,
            Self::Config(_) | Self::Storage(_) | Self::Decode(_) | Self::Realtime(_) => {
                ApiErrorCategory::Config
            }
        }
    }

    /// Check if the transport should retry this error
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ApiErrorCategory::Network | ApiErrorCategory::Server)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for connection failures and timeouts
    pub fn is_network(&self) -> bool {
        self.category() == ApiErrorCategory::Network
    }

    /// Server-provided (or synthesised) message
    pub fn message(&self) -> String {
        match self {
            Self::Http { message, .. } | Self::AuthDenied { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
