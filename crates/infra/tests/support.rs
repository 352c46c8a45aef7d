use std::sync::Arc;
use std::time::Duration;

use propdesk_common::MemoryStore;
use propdesk_domain::ClientConfig;
use propdesk_infra::{ApiClient, ClientEvent};
use tokio::sync::broadcast;

/// Configuration pointing at a mock server with fast retries
pub fn fast_config(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url)
        .with_timeout(Duration::from_secs(2))
        .with_retry(3, Duration::from_millis(10))
}

/// Client over an in-memory store; the store is returned for inspection
pub fn test_client(base_url: &str) -> (ApiClient, Arc<MemoryStore>) {
    client_with(fast_config(base_url))
}

pub fn client_with(config: ClientConfig) -> (ApiClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let client = ApiClient::new(config, store.clone()).expect("client should build");
    (client, store)
}

/// Next event on the bus, failing the test after one second
pub async fn next_event(rx: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("event should arrive in time")
        .expect("event bus should stay open")
}

pub fn user_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "_id": id,
        "name": "Jane Admin",
        "email": "admin@example.com",
        "role": "admin"
    })
}
