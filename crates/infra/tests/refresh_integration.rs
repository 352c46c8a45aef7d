//! Integration tests for the 401 refresh protocol
//!
//! **Coverage:**
//! - Concurrent 401s share one `/auth/refresh` call and all replay
//! - Replays after a shared refresh settle independently of each other
//! - A replay that is rejected again surfaces as an auth error
//! - Refresh failure ends the session and emits `auth:logout`
//! - 403 and token-less 401 never trigger a refresh

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::time::Duration;

use futures::future::join_all;
use propdesk_common::KeyValueStore;
use propdesk_domain::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use propdesk_domain::QueryParams;
use propdesk_infra::api::RequestOptions;
use propdesk_infra::auth::RefreshPhase;
use propdesk_infra::{ApiError, ClientEvent};
use serde_json::json;
use support::{next_event, test_client};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// 200 for the fresh token, 401 for anything else
struct AcceptsToken(&'static str);

impl Respond for AcceptsToken {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let expected = format!("Bearer {}", self.0);
        let authorized = request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == expected);

        if authorized {
            ResponseTemplate::new(200).set_body_json(json!([]))
        } else {
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" }))
        }
    }
}

/// 401 for the stale token, 500 once the fresh token arrives
struct BrokenAfterRefresh;

impl Respond for BrokenAfterRefresh {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let fresh = request
            .headers
            .get("authorization")
            .is_some_and(|value| value == "Bearer fresh");

        if fresh {
            ResponseTemplate::new(500).set_body_json(json!({ "message": "Database unavailable" }))
        } else {
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" }))
        }
    }
}

async fn mount_refresh(server: &MockServer, reply: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-0" })))
        .respond_with(reply)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(AcceptsToken("fresh"))
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "token": "fresh", "refreshToken": "refresh-1" }))
            .set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let (client, store) = test_client(&server.uri());
    client.set_token("stale", Some("refresh-0")).unwrap();

    let calls = (0..5).map(|_| {
        let client = client.clone();
        async move { client.get("/bookings", &QueryParams::new(), RequestOptions::new().no_cache()).await }
    });
    let results = join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap(), json!([]));
    }
    assert_eq!(client.tokens().refresh_count(), 1);
    assert_eq!(client.tokens().phase(), RefreshPhase::Idle);
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), Some("fresh".to_string()));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), Some("refresh-1".to_string()));

    let requests = server.received_requests().await.unwrap();
    let replays = requests
        .iter()
        .filter(|r| r.url.path() == "/bookings")
        .filter(|r| r.headers.get("authorization").is_some_and(|v| v == "Bearer fresh"))
        .count();
    assert_eq!(replays, 5);
}

#[tokio::test]
async fn replays_settle_independently_after_shared_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(AcceptsToken("fresh"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(BrokenAfterRefresh)
        .expect(4)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "token": "fresh", "refreshToken": "refresh-1" }))
            .set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let (client, _) = test_client(&server.uri());
    client.set_token("stale", Some("refresh-0")).unwrap();

    let query = QueryParams::new();
    let (bookings, users) = tokio::join!(
        client.get("/bookings", &query, RequestOptions::new().no_cache()),
        client.get("/users", &query, RequestOptions::new().no_cache()),
    );

    assert_eq!(bookings.unwrap(), json!([]));
    let err = users.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 500, .. }), "unexpected error: {err:?}");
    assert_eq!(client.tokens().refresh_count(), 1);
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn replay_rejected_again_is_not_refreshed_twice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "token": "fresh" })),
        1,
    )
    .await;

    let (client, _) = test_client(&server.uri());
    client.set_token("stale", Some("refresh-0")).unwrap();

    let err = client.list_bookings().await.unwrap_err();
    assert!(matches!(err, ApiError::AuthDenied { status: 401, .. }));
    assert_eq!(client.tokens().refresh_count(), 1);
    // Refresh without a new refresh token keeps the old one.
    assert_eq!(client.tokens().refresh_token(), Some("refresh-0".to_string()));
}

#[tokio::test]
async fn refresh_failure_logs_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid refresh token" })),
        1,
    )
    .await;

    let (client, store) = test_client(&server.uri());
    client.set_token("stale", Some("refresh-0")).unwrap();
    let mut events = client.subscribe();

    let err = client.list_bookings().await.unwrap_err();
    assert!(matches!(err, ApiError::RefreshFailed(ref msg) if msg.contains("Invalid refresh token")));

    assert!(!client.is_authenticated());
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
    match next_event(&mut events).await {
        ClientEvent::AuthLogout { .. } => {}
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn forbidden_is_terminal_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Admin access required" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let (client, _) = test_client(&server.uri());
    client.set_token("valid", Some("refresh-0")).unwrap();

    let err = client.list_users(None, None).await.unwrap_err();
    assert!(matches!(err, ApiError::AuthDenied { status: 403, ref message } if message == "Admin access required"));
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn unauthorized_without_refresh_token_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let (client, _) = test_client(&server.uri());
    client.set_token("only-access", None).unwrap();

    let err = client.list_bookings().await.unwrap_err();
    assert!(matches!(err, ApiError::AuthDenied { status: 401, .. }));
    assert_eq!(client.tokens().refresh_count(), 0);
}
