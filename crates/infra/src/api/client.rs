//! API client facade
//!
//! Composes the transport, interceptor pipeline, token manager, cache and
//! realtime channel behind one explicitly constructed client. Cloning is
//! cheap; clones share all state.

use std::fmt;
use std::sync::Arc;

use propdesk_common::{cache_key, resource_family, CacheStats, KeyValueStore, TtlCache};
use propdesk_domain::{ClientConfig, QueryParams};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::options::{RequestOptions, UploadOptions};
use crate::auth::{HttpTokenRefresher, TokenManager, TokenRefresher};
use crate::config::open_store;
use crate::errors::ApiError;
use crate::events::{ClientEvent, EventBus};
use crate::http::{FormData, HttpMethod, HttpTransport, RequestBody, RequestDescriptor, UploadFile};
use crate::pipeline::{
    BearerAuthInterceptor, ErrorContext, ErrorInterceptor, InterceptorHandle, InterceptorPipeline,
    NetworkErrorInterceptor, RefreshOn401Interceptor, RequestInterceptor, ResponseInterceptor,
};
use crate::realtime::{RealtimeChannel, RealtimeState};

struct ClientInner {
    config: ClientConfig,
    transport: HttpTransport,
    pipeline: InterceptorPipeline,
    tokens: Arc<TokenManager>,
    cache: TtlCache<Value>,
    events: EventBus,
    realtime: Mutex<Option<RealtimeChannel>>,
}

/// Authenticated, cached, retried access to the PropDesk API
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Create a client persisting credentials in `store`
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] for an invalid configuration and
    /// [`ApiError::Storage`] if persisted credentials cannot be read.
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        Self::builder().config(config).store(store).build()
    }

    /// Create a client using the store named by `config.storage`
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        Self::builder().config(config).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.inner.tokens
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Subscribe to `auth:logout`, `network:error` and realtime events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /* ---------------------------------------------------------------------- */
    /* Generic verbs */
    /* ---------------------------------------------------------------------- */

    /// GET with query parameters, served from the cache when fresh
    ///
    /// # Errors
    /// Any terminal [`ApiError`] of the request.
    #[instrument(skip(self, params, options), fields(endpoint = %endpoint))]
    pub async fn get(
        &self,
        endpoint: &str,
        params: &QueryParams,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let key = cache_key(endpoint, params);
        if options.use_cache {
            if let Some(hit) = self.inner.cache.get(&key) {
                debug!(%key, "cache hit");
                return Ok(hit);
            }
        }

        let descriptor = self.descriptor(HttpMethod::Get, endpoint, &options)?.with_query(params.clone());
        let value = self.dispatch(descriptor, options.cancel.as_ref()).await?;

        if options.use_cache {
            let ttl = options.cache_ttl.unwrap_or_else(|| self.inner.cache.default_ttl());
            self.inner.cache.set(key, value.clone(), ttl);
        }
        Ok(value)
    }

    /// Typed [`get`](Self::get)
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        decode(self.get(endpoint, params, options).await?)
    }

    #[instrument(skip(self, body, options), fields(endpoint = %endpoint))]
    pub async fn post(
        &self,
        endpoint: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        self.mutate(HttpMethod::Post, endpoint, body.map(RequestBody::Json), options).await
    }

    #[instrument(skip(self, body, options), fields(endpoint = %endpoint))]
    pub async fn put(
        &self,
        endpoint: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        self.mutate(HttpMethod::Put, endpoint, body.map(RequestBody::Json), options).await
    }

    #[instrument(skip(self, body, options), fields(endpoint = %endpoint))]
    pub async fn patch(
        &self,
        endpoint: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        self.mutate(HttpMethod::Patch, endpoint, body.map(RequestBody::Json), options).await
    }

    #[instrument(skip(self, options), fields(endpoint = %endpoint))]
    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<Value, ApiError> {
        self.mutate(HttpMethod::Delete, endpoint, None, options).await
    }

    /// Typed [`post`](Self::post)
    pub async fn post_as<B, T>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(self.post(endpoint, Some(serde_json::to_value(body)?), options).await?)
    }

    /// Typed [`put`](Self::put)
    pub async fn put_as<B, T>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(self.put(endpoint, Some(serde_json::to_value(body)?), options).await?)
    }

    /// Typed [`patch`](Self::patch)
    pub async fn patch_as<B, T>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(self.patch(endpoint, Some(serde_json::to_value(body)?), options).await?)
    }

    /// Typed [`delete`](Self::delete)
    pub async fn delete_as<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T, ApiError> {
        decode(self.delete(endpoint, options).await?)
    }

    /// Send a multipart form with a mutating verb
    pub(crate) async fn send_form(
        &self,
        method: HttpMethod,
        endpoint: &str,
        form: FormData,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        self.mutate(method, endpoint, Some(RequestBody::Form(form)), options).await
    }

    /// Run a caller-built descriptor through the pipeline and transport
    ///
    /// Timeout and headers from `options` override the descriptor's. No
    /// caching or cache invalidation is applied.
    pub async fn request(
        &self,
        mut descriptor: RequestDescriptor,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        if let Some(timeout) = options.timeout {
            descriptor = descriptor.with_timeout(timeout);
        }
        for (name, value) in &options.headers {
            descriptor = descriptor.with_header(name, value)?;
        }
        self.dispatch(descriptor, options.cancel.as_ref()).await
    }

    /// Upload a file as the `file` field of a multipart POST
    ///
    /// Single attempt: uploads are neither retried nor routed through the
    /// refresh protocol.
    #[instrument(skip(self, file, options), fields(endpoint = %endpoint, file = file.file_name()))]
    pub async fn upload_file(
        &self,
        endpoint: &str,
        file: UploadFile,
        options: UploadOptions,
    ) -> Result<Value, ApiError> {
        let form = options
            .additional_data
            .iter()
            .fold(FormData::new(), |form, (name, value)| form.text(name, value));
        let descriptor = RequestDescriptor::new(HttpMethod::Post, endpoint)
            .with_timeout(options.timeout.unwrap_or(self.inner.config.timeout))
            .with_form(form);

        let family = resource_family(endpoint);
        self.inner.cache.invalidate(Some(family));

        let outcome = match self.inner.pipeline.apply_request(descriptor.clone()).await {
            Ok(prepared) => {
                self.inner
                    .transport
                    .upload(&prepared, file, options.on_progress.clone(), options.cancel.as_ref())
                    .await
            }
            Err(err) => Err(err),
        };
        let result = self.report(&descriptor, outcome).await;

        if result.is_ok() {
            self.inner.cache.invalidate(Some(family));
        }
        result
    }

    /* ---------------------------------------------------------------------- */
    /* Session */
    /* ---------------------------------------------------------------------- */

    /// Store credentials; `refresh_token: None` keeps the current one
    pub fn set_token(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), ApiError> {
        self.inner.tokens.set_token(access_token, refresh_token)
    }

    pub fn clear_token(&self) -> Result<(), ApiError> {
        self.inner.tokens.clear()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.tokens.is_authenticated()
    }

    /// Drop cached responses whose key contains `pattern`, or all of them
    ///
    /// Returns the number of entries removed.
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        self.inner.cache.invalidate(pattern)
    }

    /// Open the realtime channel for `user_id`, closing any existing one
    #[instrument(skip(self))]
    pub async fn setup_websocket(&self, user_id: &str) {
        let mut slot = self.inner.realtime.lock().await;
        if let Some(existing) = slot.take() {
            existing.close().await;
        }

        info!(user_id, "starting realtime channel");
        *slot = Some(RealtimeChannel::connect(
            self.inner.config.realtime.clone(),
            self.inner.config.normalized_base_url(),
            user_id,
            Arc::clone(&self.inner.tokens),
            self.inner.events.clone(),
        ));
    }

    /// Close the realtime channel and cancel any pending reconnect
    pub async fn close_websocket(&self) {
        let channel = self.inner.realtime.lock().await.take();
        if let Some(channel) = channel {
            channel.close().await;
        }
    }

    /// State of the realtime channel, `None` when none is open
    pub async fn realtime_state(&self) -> Option<RealtimeState> {
        self.inner.realtime.lock().await.as_ref().map(RealtimeChannel::state)
    }

    /// Send a JSON message over the realtime channel
    pub async fn send_realtime(&self, message: &Value) -> Result<(), ApiError> {
        match self.inner.realtime.lock().await.as_ref() {
            Some(channel) => channel.send_json(message),
            None => Err(ApiError::Realtime("no realtime channel is open".into())),
        }
    }

    /* ---------------------------------------------------------------------- */
    /* Interceptors */
    /* ---------------------------------------------------------------------- */

    pub fn add_request_interceptor(&self, interceptor: Arc<dyn RequestInterceptor>) -> InterceptorHandle {
        self.inner.pipeline.add_request(interceptor)
    }

    pub fn add_response_interceptor(&self, interceptor: Arc<dyn ResponseInterceptor>) -> InterceptorHandle {
        self.inner.pipeline.add_response(interceptor)
    }

    pub fn add_error_interceptor(&self, interceptor: Arc<dyn ErrorInterceptor>) -> InterceptorHandle {
        self.inner.pipeline.add_error(interceptor)
    }

    /// Remove an interceptor; `false` if it was already removed
    pub fn remove_interceptor(&self, handle: InterceptorHandle) -> bool {
        self.inner.pipeline.remove(handle)
    }

    pub fn pipeline(&self) -> &InterceptorPipeline {
        &self.inner.pipeline
    }

    /* ---------------------------------------------------------------------- */
    /* Internals */
    /* ---------------------------------------------------------------------- */

    fn descriptor(
        &self,
        method: HttpMethod,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<RequestDescriptor, ApiError> {
        let mut descriptor = RequestDescriptor::new(method, endpoint)
            .with_timeout(options.timeout.unwrap_or(self.inner.config.timeout));
        for (name, value) in &options.headers {
            descriptor = descriptor.with_header(name, value)?;
        }
        Ok(descriptor)
    }

    /// Mutating call: invalidates the resource family before sending and
    /// again once the call succeeds
    async fn mutate(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let family = resource_family(endpoint);
        self.inner.cache.invalidate(Some(family));

        let mut descriptor = self.descriptor(method, endpoint, &options)?;
        descriptor = match body {
            Some(RequestBody::Json(value)) => descriptor.with_json(value),
            Some(RequestBody::Form(form)) => descriptor.with_form(form),
            None => descriptor,
        };

        let value = self.dispatch(descriptor, options.cancel.as_ref()).await?;
        self.inner.cache.invalidate(Some(family));
        Ok(value)
    }

    async fn dispatch(
        &self,
        descriptor: RequestDescriptor,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ApiError> {
        let outcome = self.execute_with_refresh(&descriptor, cancel).await;
        self.report(&descriptor, outcome).await
    }

    /// Pipeline pass plus transport, with one replay after a token refresh
    async fn execute_with_refresh(
        &self,
        original: &RequestDescriptor,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ApiError> {
        let inner = &self.inner;
        let prepared = inner.pipeline.apply_request(original.clone()).await?;

        match inner.transport.execute(&prepared, &inner.pipeline, cancel).await {
            Err(ApiError::AuthExpired) => {
                debug!(request_id = %original.request_id, "waiting for token refresh");
                self.await_refresh(cancel).await?;

                let replay = inner.pipeline.apply_request(original.as_retry_attempt()).await?;
                match inner.transport.execute(&replay, &inner.pipeline, cancel).await {
                    Err(ApiError::AuthExpired) => Err(ApiError::AuthDenied {
                        status: 401,
                        message: "access token rejected after refresh".into(),
                    }),
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn await_refresh(&self, cancel: Option<&CancellationToken>) -> Result<(), ApiError> {
        match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(ApiError::Cancelled),
                result = self.inner.tokens.refresh() => result,
            },
            None => self.inner.tokens.refresh().await,
        }
    }

    /// Hand terminal errors to the error interceptors; cancellations are
    /// discarded silently
    async fn report(
        &self,
        descriptor: &RequestDescriptor,
        outcome: Result<Value, ApiError>,
    ) -> Result<Value, ApiError> {
        if let Err(err) = &outcome {
            if !err.is_cancelled() {
                let context = ErrorContext {
                    request_id: descriptor.request_id,
                    endpoint: descriptor.endpoint.clone(),
                    method: descriptor.method,
                    error: err.clone(),
                };
                self.inner.pipeline.notify_error(&context).await;
            }
        }
        outcome
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(value)?)
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url)
            .field("authenticated", &self.is_authenticated())
            .field("cache_entries", &self.inner.cache.len())
            .field("pipeline", &self.inner.pipeline)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    store: Option<Arc<dyn KeyValueStore>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    events: Option<EventBus>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Persist credentials here instead of the store named by the config
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the HTTP refresh call
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Publish on an existing event bus
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the API client
    ///
    /// # Errors
    /// Returns error if the configuration is invalid, the store cannot be
    /// opened, or the HTTP client cannot be created
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = match self.store {
            Some(store) => store,
            None => open_store(&config.storage)?,
        };
        let refresher: Arc<dyn TokenRefresher> = match self.refresher {
            Some(refresher) => refresher,
            None => Arc::new(HttpTokenRefresher::new(config.normalized_base_url(), config.timeout)?),
        };
        let events = self.events.unwrap_or_default();

        let mut transport = HttpTransport::builder()
            .base_url(config.normalized_base_url())
            .max_attempts(config.retry_attempts)
            .retry_delay(config.retry_delay);
        if let Some(agent) = self.user_agent {
            transport = transport.user_agent(agent);
        }
        let transport = transport.build()?;

        let tokens = Arc::new(TokenManager::new(store, refresher, events.clone())?);

        let pipeline = InterceptorPipeline::new();
        pipeline.add_request(Arc::new(BearerAuthInterceptor::new(Arc::clone(&tokens))));
        pipeline.add_response(Arc::new(RefreshOn401Interceptor::new(Arc::clone(&tokens))));
        pipeline.add_error(Arc::new(NetworkErrorInterceptor::new(events.clone())));

        info!(base_url = %config.normalized_base_url(), authenticated = tokens.is_authenticated(), "API client ready");

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                cache: TtlCache::new(config.cache_ttl),
                config,
                transport,
                pipeline,
                tokens,
                events,
                realtime: Mutex::new(None),
            }),
        })
    }
}
