//! Session helpers: login, register, current user and logout

use propdesk_domain::constants::{AUTH_LOGIN_PATH, AUTH_LOGOUT_PATH, AUTH_ME_PATH, AUTH_REGISTER_PATH};
use propdesk_domain::{AuthResponse, LoginRequest, RegisterRequest, User};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, RequestOptions};
use crate::errors::ApiError;

/// `/auth/me` replies either `{ "user": {...} }` or the bare user
#[derive(Deserialize)]
#[serde(untagged)]
enum MeResponse {
    Wrapped { user: User },
    Bare(User),
}

impl ApiClient {
    /// Log in and store the returned credentials
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = LoginRequest { email: email.to_string(), password: password.to_string() };
        let response: AuthResponse =
            self.post_as(AUTH_LOGIN_PATH, &request, RequestOptions::default()).await?;
        self.set_token(&response.token, response.refresh_token.as_deref())?;
        info!("logged in");
        Ok(response)
    }

    /// Register an account and store the returned credentials
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse =
            self.post_as(AUTH_REGISTER_PATH, request, RequestOptions::default()).await?;
        self.set_token(&response.token, response.refresh_token.as_deref())?;
        Ok(response)
    }

    /// Fetch the signed-in user; never served from the cache
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let reply: MeResponse = self
            .get_as(AUTH_ME_PATH, &Default::default(), RequestOptions::default().no_cache())
            .await?;
        Ok(match reply {
            MeResponse::Wrapped { user } | MeResponse::Bare(user) => user,
        })
    }

    /// End the session
    ///
    /// The server is told on a best-effort basis; local credentials, the cache
    /// and the realtime channel are cleared whatever the outcome.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let body = json!({ "refreshToken": self.tokens().refresh_token() });
        if let Err(err) = self.post(AUTH_LOGOUT_PATH, Some(body), RequestOptions::default()).await {
            warn!(error = %err, "server logout failed, clearing local session anyway");
        }

        self.close_websocket().await;
        self.clear_cache(None);
        self.clear_token()
    }
}
