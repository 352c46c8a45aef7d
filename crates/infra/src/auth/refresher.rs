//! Token refresh call
//!
//! The refresh endpoint is called with a plain HTTP client, outside the
//! interceptor pipeline, so a 401 from it can never re-enter the protocol.

use std::time::Duration;

use async_trait::async_trait;
use propdesk_domain::constants::AUTH_REFRESH_PATH;
use propdesk_domain::{AuthResponse, RefreshRequest};
use reqwest::Client as ReqwestClient;
use tracing::debug;

use crate::errors::ApiError;

/// Exchanges a refresh token for new credentials
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ApiError>;
}

/// `POST {base}/auth/refresh` with body `{refreshToken}`
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    client: ReqwestClient,
    endpoint: String,
}

impl HttpTokenRefresher {
    /// # Errors
    /// Returns [`ApiError::Config`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|err| ApiError::Config(format!("failed to build refresh client: {err}")))?;

        Ok(Self { client, endpoint: format!("{}{AUTH_REFRESH_PATH}", base_url.trim_end_matches('/')) })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ApiError> {
        debug!(endpoint = %self.endpoint, "requesting token refresh");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RefreshRequest { refresh_token: refresh_token.to_string() })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                &body,
            ));
        }

        Ok(serde_json::from_str(&body)?)
    }
}
