//! Authentication payloads

use serde::{Deserialize, Serialize};

use super::user::{User, UserRole};

/// Session credentials held by the token manager
///
/// `access_token` is never empty for an authenticated session. Sessions
/// without silent renewal have no refresh token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token }
    }
}

// Tokens must not end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Body of `POST /auth/refresh`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response of login, register and refresh
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse").field("user", &self.user).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_tokens() {
        let creds = Credentials::new("secret-access", Some("secret-refresh".into()));
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn refresh_request_uses_camel_case() {
        let body = serde_json::to_value(RefreshRequest { refresh_token: "r1".into() }).unwrap();
        assert_eq!(body, serde_json::json!({ "refreshToken": "r1" }));
    }

    #[test]
    fn auth_response_without_refresh_token() {
        let resp: AuthResponse = serde_json::from_str(r#"{"token":"t1"}"#).unwrap();
        assert_eq!(resp.token, "t1");
        assert!(resp.refresh_token.is_none());
        assert!(resp.user.is_none());
    }
}
