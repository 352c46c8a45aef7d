//! Conversions between infrastructure errors and [`ApiError`].

use propdesk_common::StorageError;
use propdesk_domain::PropDeskError;

use super::ApiError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ApiError::Network(format!("request timed out: {err}"));
        }
        if err.is_connect() || err.is_request() {
            return ApiError::Network(format!("connection failed: {err}"));
        }
        if err.is_decode() || err.is_body() {
            return ApiError::Decode(err.to_string());
        }
        if err.is_builder() {
            return ApiError::Config(format!("invalid request: {err}"));
        }
        if let Some(status) = err.status() {
            return ApiError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                "",
            );
        }
        ApiError::Network(err.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → ApiError */
/* -------------------------------------------------------------------------- */

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* PropDeskError ↔ ApiError */
/* -------------------------------------------------------------------------- */

impl From<PropDeskError> for ApiError {
    fn from(err: PropDeskError) -> Self {
        match err {
            PropDeskError::Config(msg) | PropDeskError::InvalidInput(msg) => ApiError::Config(msg),
            PropDeskError::Storage(msg) => ApiError::Storage(msg),
            PropDeskError::Network(msg) => ApiError::Network(msg),
            PropDeskError::Auth(msg) => ApiError::RefreshFailed(msg),
            PropDeskError::NotFound(msg) => {
                ApiError::Http { status: 404, message: msg, body: serde_json::Value::Null }
            }
            PropDeskError::Internal(msg) => ApiError::Decode(msg),
        }
    }
}

impl From<ApiError> for PropDeskError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(_) | ApiError::Timeout(_) | ApiError::Realtime(_) => {
                PropDeskError::Network(err.to_string())
            }
            ApiError::Http { status: 404, message, .. } => PropDeskError::NotFound(message),
            ApiError::Http { status, message, .. } if status < 500 => {
                PropDeskError::InvalidInput(message)
            }
            ApiError::Http { message, .. } => PropDeskError::Network(message),
            ApiError::AuthExpired | ApiError::RefreshFailed(_) => {
                PropDeskError::Auth(err.to_string())
            }
            ApiError::AuthDenied { message, .. } => PropDeskError::Auth(message),
            ApiError::Config(msg) => PropDeskError::Config(msg),
            ApiError::Storage(msg) => PropDeskError::Storage(msg),
            ApiError::Cancelled | ApiError::Decode(_) => PropDeskError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn storage_errors_map_to_storage() {
        let err: ApiError = StorageError::Io(io::Error::new(io::ErrorKind::Other, "disk")).into();
        assert!(matches!(err, ApiError::Storage(msg) if msg.contains("disk")));
    }

    #[test]
    fn json_errors_map_to_decode() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ApiError = parse.into();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn api_errors_round_trip_into_domain() {
        let not_found = ApiError::from_response(404, "Not Found", r#"{"message":"Property not found"}"#);
        assert_eq!(PropDeskError::from(not_found), PropDeskError::NotFound("Property not found".into()));

        let denied = ApiError::from_response(403, "Forbidden", "");
        assert_eq!(PropDeskError::from(denied), PropDeskError::Auth("HTTP 403: Forbidden".into()));

        let server = ApiError::from_response(500, "Internal Server Error", "");
        assert!(matches!(PropDeskError::from(server), PropDeskError::Network(_)));
    }

    #[tokio::test]
    async fn connect_failures_are_network_errors() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::get(format!("http://{addr}")).await.unwrap_err();
        let api: ApiError = err.into();
        assert!(api.is_network(), "got {api:?}");
        assert!(api.is_retryable());
    }
}
