//! WebSocket channel bound to one user session
//!
//! A background task owns the socket. Inbound JSON frames are republished on
//! the [`EventBus`] as `ws:message`; the channel keeps no business state. Any
//! close that was not requested through [`RealtimeChannel::close`] schedules a
//! reconnect after the configured fixed delay, forever.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use propdesk_domain::RealtimeConfig;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::TokenManager;
use crate::errors::ApiError;
use crate::events::{ClientEvent, EventBus};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state of a [`RealtimeChannel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeState {
    Disconnected,
    Connected,
}

/// Build the realtime URL from the HTTP base URL
///
/// `http` becomes `ws` and `https` becomes `wss`; the realtime path is
/// appended to the base path and the query carries `token` (when a session
/// exists) and `userId`.
///
/// # Errors
/// Returns [`ApiError::Config`] for a base URL that is not http(s).
pub fn realtime_url(
    base_url: &str,
    path: &str,
    token: Option<&str>,
    user_id: &str,
) -> Result<Url, ApiError> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(ApiError::Config(format!("base URL must be http(s): {base_url}")));
    };

    let path = if path.starts_with('/') { path.to_string() } else { format!("/{path}") };
    let mut url = Url::parse(&format!("{ws_base}{path}"))
        .map_err(|err| ApiError::Config(format!("invalid realtime URL: {err}")))?;

    {
        let mut query = url.query_pairs_mut();
        if let Some(token) = token {
            query.append_pair("token", token);
        }
        query.append_pair("userId", user_id);
    }

    Ok(url)
}

struct Worker {
    config: RealtimeConfig,
    base_url: String,
    user_id: String,
    tokens: Arc<TokenManager>,
    events: EventBus,
    cancel: CancellationToken,
    state: watch::Sender<RealtimeState>,
    attempts: Arc<AtomicU64>,
    outbound: mpsc::UnboundedReceiver<Message>,
}

/// Handle to a running realtime channel
///
/// Dropping the handle tears the channel down like [`RealtimeChannel::close`]
/// without waiting for the task.
pub struct RealtimeChannel {
    user_id: String,
    cancel: CancellationToken,
    state: watch::Receiver<RealtimeState>,
    attempts: Arc<AtomicU64>,
    outbound: mpsc::UnboundedSender<Message>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeChannel {
    /// Start the channel for `user_id`; the first connection attempt begins
    /// immediately on a background task.
    pub fn connect(
        config: RealtimeConfig,
        base_url: impl Into<String>,
        user_id: impl Into<String>,
        tokens: Arc<TokenManager>,
        events: EventBus,
    ) -> Self {
        let user_id = user_id.into();
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(RealtimeState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            config,
            base_url: base_url.into(),
            user_id: user_id.clone(),
            tokens,
            events,
            cancel: cancel.clone(),
            state: state_tx,
            attempts: Arc::clone(&attempts),
            outbound: outbound_rx,
        };
        let task = tokio::spawn(worker.run());

        Self {
            user_id,
            cancel,
            state: state_rx,
            attempts,
            outbound: outbound_tx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> RealtimeState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == RealtimeState::Connected
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<RealtimeState> {
        self.state.clone()
    }

    /// Connection attempts made so far, including the first
    pub fn connection_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Send a JSON message over the open socket
    ///
    /// # Errors
    /// Returns [`ApiError::Realtime`] when the channel is not connected.
    pub fn send_json(&self, value: &Value) -> Result<(), ApiError> {
        if !self.is_connected() {
            return Err(ApiError::Realtime("channel is not connected".into()));
        }
        self.outbound
            .send(Message::Text(value.to_string()))
            .map_err(|_| ApiError::Realtime("channel is closed".into()))
    }

    /// Tear the channel down: cancel any pending reconnect, send a close
    /// frame if connected, and wait for the background task to finish.
    pub async fn close(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "realtime task ended abnormally");
            }
        }
        info!(user_id = %self.user_id, "realtime channel closed");
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("user_id", &self.user_id)
            .field("state", &self.state())
            .field("attempts", &self.connection_attempts())
            .finish_non_exhaustive()
    }
}

impl Worker {
    async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let token = self.tokens.access_token();
            let url = match realtime_url(&self.base_url, &self.config.path, token.as_deref(), &self.user_id) {
                Ok(url) => url,
                Err(err) => {
                    warn!(error = %err, "cannot build realtime URL, giving up");
                    break;
                }
            };

            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(attempt, user_id = %self.user_id, "opening realtime connection");

            let connected = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = connect_async(url.as_str()) => result,
            };

            match connected {
                Ok((socket, _)) => {
                    self.state.send_replace(RealtimeState::Connected);
                    info!(attempt, user_id = %self.user_id, "realtime channel connected");
                    self.events.publish(ClientEvent::RealtimeConnected { user_id: self.user_id.clone() });

                    let closed_locally = self.pump(socket).await;

                    self.state.send_replace(RealtimeState::Disconnected);
                    self.events
                        .publish(ClientEvent::RealtimeDisconnected { user_id: self.user_id.clone() });
                    if closed_locally {
                        break;
                    }
                }
                Err(err) => warn!(attempt, error = %err, "realtime connection failed"),
            }

            let delay = self.config.reconnect_delay;
            warn!(
                user_id = %self.user_id,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "realtime channel down, reconnect scheduled"
            );
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.state.send_replace(RealtimeState::Disconnected);
        debug!(user_id = %self.user_id, "realtime task stopped");
    }

    /// Pump one connection; `true` when it ended because of a local close
    async fn pump(&mut self, mut socket: Socket) -> bool {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    if let Err(err) = socket.close(None).await {
                        debug!(error = %err, "close frame not delivered");
                    }
                    return true;
                }
                Some(message) = self.outbound.recv() => {
                    if let Err(err) = socket.send(message).await {
                        warn!(error = %err, "realtime send failed");
                        return false;
                    }
                }
                frame = socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.as_bytes()),
                    Some(Ok(Message::Binary(bytes))) => self.dispatch(&bytes),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "server closed realtime channel");
                        return false;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "realtime channel error");
                        return false;
                    }
                    None => return false,
                },
            }
        }
    }

    fn dispatch(&self, payload: &[u8]) {
        match serde_json::from_slice::<Value>(payload) {
            Ok(value) => self.events.publish(ClientEvent::RealtimeMessage(value)),
            Err(err) => warn!(error = %err, bytes = payload.len(), "dropping undecodable realtime frame"),
        }
    }
}
