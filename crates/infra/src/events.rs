//! Client-wide event bus
//!
//! UI collaborators react to session-level conditions (forced logout, network
//! trouble, realtime pushes) by subscribing here rather than by inspecting
//! individual call results.

use propdesk_domain::constants::{
    EVENT_AUTH_LOGOUT, EVENT_NETWORK_ERROR, EVENT_WS_CONNECTED, EVENT_WS_DISCONNECTED,
    EVENT_WS_MESSAGE,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// Events published by the client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Credentials were dropped after an unrecoverable refresh failure
    AuthLogout { reason: String },
    /// A request failed at the network level
    NetworkError { message: String, status: Option<u16> },
    RealtimeConnected { user_id: String },
    RealtimeDisconnected { user_id: String },
    /// Decoded inbound realtime frame
    RealtimeMessage(Value),
}

impl ClientEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthLogout { .. } => EVENT_AUTH_LOGOUT,
            Self::NetworkError { .. } => EVENT_NETWORK_ERROR,
            Self::RealtimeConnected { .. } => EVENT_WS_CONNECTED,
            Self::RealtimeDisconnected { .. } => EVENT_WS_DISCONNECTED,
            Self::RealtimeMessage(_) => EVENT_WS_MESSAGE,
        }
    }
}

/// Broadcast fan-out of [`ClientEvent`]s
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: ClientEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => trace!(event = name, receivers, "event published"),
            Err(_) => trace!(event = name, "event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn event_names_match_wire_names() {
        assert_eq!(ClientEvent::AuthLogout { reason: "x".into() }.name(), "auth:logout");
        assert_eq!(
            ClientEvent::NetworkError { message: "x".into(), status: None }.name(),
            "network:error"
        );
        assert_eq!(ClientEvent::RealtimeMessage(json!({})).name(), "ws:message");
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish(ClientEvent::AuthLogout { reason: "expired".into() });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(ClientEvent::RealtimeConnected { user_id: "u1".into() });
        bus.publish(ClientEvent::RealtimeMessage(json!({"type": "booking:new"})));

        assert_eq!(rx.recv().await.unwrap(), ClientEvent::RealtimeConnected { user_id: "u1".into() });
        assert_eq!(
            rx.recv().await.unwrap(),
            ClientEvent::RealtimeMessage(json!({"type": "booking:new"}))
        );
    }
}
