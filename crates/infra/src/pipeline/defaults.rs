//! Interceptors installed by every client

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    ErrorContext, ErrorInterceptor, RequestInterceptor, ResponseContext, ResponseInterceptor,
    ResponseVerdict,
};
use crate::auth::TokenManager;
use crate::errors::ApiError;
use crate::events::{ClientEvent, EventBus};
use crate::http::RequestDescriptor;

/// Adds `Authorization: Bearer <token>` unless the caller set one
#[derive(Debug, Clone)]
pub struct BearerAuthInterceptor {
    tokens: Arc<TokenManager>,
}

impl BearerAuthInterceptor {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl RequestInterceptor for BearerAuthInterceptor {
    async fn on_request(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor, ApiError> {
        if !request.has_authorization() {
            if let Some(token) = self.tokens.access_token() {
                request.set_bearer(&token)?;
            }
        }
        Ok(request)
    }
}

/// Routes a first 401 to the refresh protocol when a refresh token exists
#[derive(Debug, Clone)]
pub struct RefreshOn401Interceptor {
    tokens: Arc<TokenManager>,
}

impl RefreshOn401Interceptor {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl ResponseInterceptor for RefreshOn401Interceptor {
    async fn on_response(&self, response: &ResponseContext) -> ResponseVerdict {
        if response.status == 401 && !response.is_retry_attempt && self.tokens.has_refresh_token() {
            debug!(request_id = %response.request_id, endpoint = %response.endpoint, "401 routed to token refresh");
            return ResponseVerdict::RefreshAndRetry;
        }
        ResponseVerdict::Continue
    }
}

/// Publishes `network:error` for connection failures and timeouts
#[derive(Debug, Clone)]
pub struct NetworkErrorInterceptor {
    events: EventBus,
}

impl NetworkErrorInterceptor {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

#[async_trait]
impl ErrorInterceptor for NetworkErrorInterceptor {
    async fn on_error(&self, error: &ErrorContext) {
        if error.error.is_network() {
            self.events.publish(ClientEvent::NetworkError {
                message: error.error.to_string(),
                status: error.error.status(),
            });
        }
    }
}
