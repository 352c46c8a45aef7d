//! Credential ownership and the single-flight refresh protocol
//!
//! ## Refresh protocol
//! The manager is either `Idle` or `Refreshing`. The first caller of
//! [`TokenManager::refresh`] moves it to `Refreshing` and spawns the one
//! refresh call; every caller, the first included, parks a oneshot waiter in
//! the queue. When the call finishes the new credentials are persisted (or
//! cleared on failure), the state returns to `Idle`, and the queue is drained
//! in enqueue order with the shared outcome.
//!
//! The refresh runs on its own task, so a caller that gives up (timeout,
//! cancellation) drops only its receiver and never aborts the shared call.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use propdesk_common::KeyValueStore;
use propdesk_domain::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use propdesk_domain::Credentials;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::refresher::TokenRefresher;
use crate::errors::ApiError;
use crate::events::{ClientEvent, EventBus};

type Waiter = oneshot::Sender<Result<(), ApiError>>;

enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

/// Observable refresh state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

/// Owns the session credentials
pub struct TokenManager {
    store: Arc<dyn KeyValueStore>,
    refresher: Arc<dyn TokenRefresher>,
    events: EventBus,
    credentials: RwLock<Option<Credentials>>,
    state: Mutex<RefreshState>,
    refresh_count: AtomicU64,
}

impl TokenManager {
    /// Create a manager, loading persisted credentials
    ///
    /// A stored refresh token without an access token is ignored: the
    /// session counts as unauthenticated.
    ///
    /// # Errors
    /// Returns [`ApiError::Storage`] if the store cannot be read.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        refresher: Arc<dyn TokenRefresher>,
        events: EventBus,
    ) -> Result<Self, ApiError> {
        let access = store.get(ACCESS_TOKEN_KEY)?.filter(|token| !token.is_empty());
        let refresh = store.get(REFRESH_TOKEN_KEY)?.filter(|token| !token.is_empty());
        let credentials = access.map(|access| Credentials::new(access, refresh));

        debug!(authenticated = credentials.is_some(), "loaded persisted credentials");

        Ok(Self {
            store,
            refresher,
            events,
            credentials: RwLock::new(credentials),
            state: Mutex::new(RefreshState::Idle),
            refresh_count: AtomicU64::new(0),
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.credentials.read().as_ref().map(|c| c.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.credentials.read().as_ref().and_then(|c| c.refresh_token.clone())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.credentials.read().as_ref().is_some_and(|c| c.refresh_token.is_some())
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.read().is_some()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().clone()
    }

    /// Store new credentials
    ///
    /// `refresh_token: None` keeps the current refresh token.
    ///
    /// # Errors
    /// [`ApiError::Config`] for an empty access token, [`ApiError::Storage`]
    /// when persisting fails (in-memory credentials are left unchanged).
    pub fn set_token(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), ApiError> {
        if access_token.is_empty() {
            return Err(ApiError::Config("access token must not be empty".into()));
        }

        self.store.set(ACCESS_TOKEN_KEY, access_token)?;
        if let Some(refresh) = refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh)?;
        }

        let mut credentials = self.credentials.write();
        let refresh = refresh_token
            .map(str::to_string)
            .or_else(|| credentials.as_ref().and_then(|c| c.refresh_token.clone()));
        *credentials = Some(Credentials::new(access_token, refresh));
        Ok(())
    }

    /// Drop both tokens from memory and storage
    ///
    /// # Errors
    /// Returns [`ApiError::Storage`] if a key cannot be removed; memory is
    /// cleared regardless.
    pub fn clear(&self) -> Result<(), ApiError> {
        *self.credentials.write() = None;
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        Ok(())
    }

    pub fn phase(&self) -> RefreshPhase {
        match &*self.state.lock() {
            RefreshState::Idle => RefreshPhase::Idle,
            RefreshState::Refreshing { .. } => RefreshPhase::Refreshing,
        }
    }

    /// Callers parked on the in-flight refresh
    pub fn pending_waiters(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Number of refresh calls started so far
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// Join (or start) the shared refresh and wait for its outcome
    ///
    /// # Errors
    /// Returns [`ApiError::RefreshFailed`] when the refresh fails; by then
    /// credentials are cleared and `auth:logout` has been published.
    pub async fn refresh(self: &Arc<Self>) -> Result<(), ApiError> {
        let (tx, rx) = oneshot::channel();

        let leader = {
            let mut state = self.state.lock();
            match &mut *state {
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing { waiters: vec![tx] };
                    true
                }
                RefreshState::Refreshing { waiters } => {
                    waiters.push(tx);
                    debug!(queued = waiters.len(), "joined in-flight token refresh");
                    false
                }
            }
        };

        if leader {
            tokio::spawn(Arc::clone(self).run_refresh());
        }

        rx.await.unwrap_or_else(|_| Err(ApiError::RefreshFailed("refresh task ended unexpectedly".into())))
    }

    async fn run_refresh(self: Arc<Self>) {
        let attempt = self.refresh_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, "refreshing access token");

        let outcome = match self.refresh_token() {
            None => Err(ApiError::RefreshFailed("no refresh token available".into())),
            Some(token) => {
                // Isolated so a panicking refresher still drains the queue.
                let refresher = Arc::clone(&self.refresher);
                match tokio::spawn(async move { refresher.refresh(&token).await }).await {
                    Ok(Ok(response)) => self
                        .set_token(&response.token, response.refresh_token.as_deref())
                        .map_err(|err| ApiError::RefreshFailed(err.to_string())),
                    Ok(Err(err)) => Err(ApiError::RefreshFailed(err.message())),
                    Err(join_err) => Err(ApiError::RefreshFailed(format!("refresh call aborted: {join_err}"))),
                }
            }
        };

        match &outcome {
            Ok(()) => info!(attempt, "access token refreshed"),
            Err(err) => {
                error!(attempt, error = %err, "token refresh failed, ending session");
                if let Err(clear_err) = self.clear() {
                    warn!(error = %clear_err, "failed to clear persisted credentials");
                }
                self.events.publish(ClientEvent::AuthLogout { reason: err.to_string() });
            }
        }

        let waiters = match std::mem::replace(&mut *self.state.lock(), RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        };

        debug!(waiters = waiters.len(), "draining refresh queue");
        for waiter in waiters {
            // A dropped receiver is a caller that gave up; nothing to deliver.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &*self.credentials.read())
            .field("phase", &self.phase())
            .field("refresh_count", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use propdesk_common::testing::RecordingStore;
    use propdesk_common::MemoryStore;
    use propdesk_domain::AuthResponse;
    use tokio::sync::Notify;

    use super::*;

    /// Refresher that blocks until released and counts calls
    struct GatedRefresher {
        calls: AtomicUsize,
        gate: Notify,
        succeed: bool,
    }

    impl GatedRefresher {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), gate: Notify::new(), succeed })
        }
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            if self.succeed {
                Ok(AuthResponse {
                    token: format!("access-after-{refresh_token}"),
                    refresh_token: Some("refresh-2".into()),
                    user: None,
                })
            } else {
                Err(ApiError::from_response(401, "Unauthorized", r#"{"message":"expired"}"#))
            }
        }
    }

    struct PanickingRefresher;

    #[async_trait]
    impl TokenRefresher for PanickingRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<AuthResponse, ApiError> {
            panic!("refresher blew up");
        }
    }

    fn manager(store: Arc<MemoryStore>, refresher: Arc<GatedRefresher>) -> Arc<TokenManager> {
        Arc::new(TokenManager::new(store, refresher, EventBus::default()).unwrap())
    }

    async fn wait_for_waiters(tokens: &TokenManager, expected: usize) {
        for _ in 0..200 {
            if tokens.pending_waiters() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {expected} waiters, saw {}", tokens.pending_waiters());
    }

    #[test]
    fn loads_persisted_credentials() {
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN_KEY, "a-1").unwrap();
        store.set(REFRESH_TOKEN_KEY, "r-1").unwrap();

        let tokens = manager(store, GatedRefresher::new(true));
        assert!(tokens.is_authenticated());
        assert_eq!(tokens.access_token().as_deref(), Some("a-1"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r-1"));
    }

    #[test]
    fn refresh_token_alone_is_not_a_session() {
        let store = Arc::new(MemoryStore::new());
        store.set(REFRESH_TOKEN_KEY, "r-1").unwrap();

        let tokens = manager(store, GatedRefresher::new(true));
        assert!(!tokens.is_authenticated());
        assert!(!tokens.has_refresh_token());
    }

    #[test]
    fn set_token_keeps_refresh_token_when_omitted() {
        let store = Arc::new(MemoryStore::new());
        let tokens = manager(Arc::clone(&store), GatedRefresher::new(true));

        tokens.set_token("a-1", Some("r-1")).unwrap();
        tokens.set_token("a-2", None).unwrap();

        assert_eq!(tokens.access_token().as_deref(), Some("a-2"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r-1"));
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("a-2"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r-1"));
    }

    #[test]
    fn empty_access_token_is_rejected() {
        let tokens = manager(Arc::new(MemoryStore::new()), GatedRefresher::new(true));
        assert!(matches!(tokens.set_token("", None), Err(ApiError::Config(_))));
        assert!(!tokens.is_authenticated());
    }

    #[test]
    fn clear_removes_both_keys() {
        let store = Arc::new(MemoryStore::new());
        let tokens = manager(Arc::clone(&store), GatedRefresher::new(true));
        tokens.set_token("a-1", Some("r-1")).unwrap();

        tokens.clear().unwrap();

        assert!(!tokens.is_authenticated());
        assert!(store.is_empty());
    }

    #[test]
    fn storage_failure_leaves_memory_untouched() {
        let store = Arc::new(RecordingStore::new());
        let tokens =
            TokenManager::new(Arc::clone(&store) as Arc<dyn KeyValueStore>, GatedRefresher::new(true), EventBus::default())
                .unwrap();
        tokens.set_token("a-1", Some("r-1")).unwrap();
        assert_eq!(store.writes(), 2);

        store.fail_writes(true);
        let err = tokens.set_token("a-2", Some("r-2")).unwrap_err();

        assert!(matches!(err, ApiError::Storage(_)));
        assert_eq!(tokens.access_token().as_deref(), Some("a-1"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r-1"));
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn clear_empties_memory_even_when_storage_fails() {
        let store = Arc::new(RecordingStore::new());
        let tokens =
            TokenManager::new(Arc::clone(&store) as Arc<dyn KeyValueStore>, GatedRefresher::new(true), EventBus::default())
                .unwrap();
        tokens.set_token("a-1", Some("r-1")).unwrap();

        store.fail_writes(true);
        assert!(tokens.clear().is_err());
        assert!(!tokens.is_authenticated());
        assert_eq!(store.removes(), 0);
    }

    #[tokio::test]
    async fn concurrent_refreshes_share_one_call() {
        let store = Arc::new(MemoryStore::new());
        let refresher = GatedRefresher::new(true);
        let tokens = manager(store, Arc::clone(&refresher));
        tokens.set_token("a-1", Some("r-1")).unwrap();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let tokens = Arc::clone(&tokens);
                tokio::spawn(async move { tokens.refresh().await })
            })
            .collect();

        wait_for_waiters(&tokens, 5).await;
        assert_eq!(tokens.phase(), RefreshPhase::Refreshing);
        refresher.gate.notify_one();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.refresh_count(), 1);
        assert_eq!(tokens.phase(), RefreshPhase::Idle);
        assert_eq!(tokens.access_token().as_deref(), Some("access-after-r-1"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn failed_refresh_rejects_everyone_and_logs_out() {
        let store = Arc::new(MemoryStore::new());
        let refresher = GatedRefresher::new(false);
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let tokens = Arc::new(
            TokenManager::new(Arc::clone(&store) as Arc<dyn KeyValueStore>, refresher.clone(), events)
                .unwrap(),
        );
        tokens.set_token("a-1", Some("r-1")).unwrap();

        let first = tokio::spawn({
            let tokens = Arc::clone(&tokens);
            async move { tokens.refresh().await }
        });
        let second = tokio::spawn({
            let tokens = Arc::clone(&tokens);
            async move { tokens.refresh().await }
        });

        wait_for_waiters(&tokens, 2).await;
        refresher.gate.notify_one();

        assert!(matches!(first.await.unwrap(), Err(ApiError::RefreshFailed(_))));
        assert!(matches!(second.await.unwrap(), Err(ApiError::RefreshFailed(_))));
        assert!(!tokens.is_authenticated());
        assert!(store.is_empty());
        assert!(matches!(rx.recv().await.unwrap(), ClientEvent::AuthLogout { .. }));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_waiter_does_not_abort_shared_refresh() {
        let refresher = GatedRefresher::new(true);
        let tokens = manager(Arc::new(MemoryStore::new()), Arc::clone(&refresher));
        tokens.set_token("a-1", Some("r-1")).unwrap();

        let impatient = tokio::spawn({
            let tokens = Arc::clone(&tokens);
            async move { tokens.refresh().await }
        });
        wait_for_waiters(&tokens, 1).await;
        impatient.abort();

        let patient = tokio::spawn({
            let tokens = Arc::clone(&tokens);
            async move { tokens.refresh().await }
        });
        wait_for_waiters(&tokens, 2).await;
        refresher.gate.notify_one();

        patient.await.unwrap().unwrap();
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.access_token().as_deref(), Some("access-after-r-1"));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails() {
        let refresher = GatedRefresher::new(true);
        let tokens = manager(Arc::new(MemoryStore::new()), Arc::clone(&refresher));
        tokens.set_token("a-1", None).unwrap();

        let err = tokens.refresh().await.unwrap_err();
        assert!(matches!(err, ApiError::RefreshFailed(_)));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_refresher_rejects_waiters_and_resets_state() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let tokens = Arc::new(
            TokenManager::new(Arc::new(MemoryStore::new()), Arc::new(PanickingRefresher), events).unwrap(),
        );
        tokens.set_token("a-1", Some("r-1")).unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), tokens.refresh())
            .await
            .expect("refresh should settle after a panic");
        assert!(matches!(first, Err(ApiError::RefreshFailed(_))));
        assert_eq!(tokens.phase(), RefreshPhase::Idle);
        assert_eq!(tokens.pending_waiters(), 0);
        assert!(!tokens.is_authenticated());
        assert!(matches!(rx.recv().await.unwrap(), ClientEvent::AuthLogout { .. }));

        // The queue is usable again for the next attempt.
        tokens.set_token("a-2", Some("r-2")).unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), tokens.refresh())
            .await
            .expect("second refresh should settle");
        assert!(matches!(second, Err(ApiError::RefreshFailed(_))));
        assert_eq!(tokens.refresh_count(), 2);
    }
}
