//! Interceptor pipeline
//!
//! Three ordered chains, one per stage:
//! - request interceptors transform the [`RequestDescriptor`] before it is sent
//! - response interceptors inspect a reply before its body is decoded and may
//!   route it to the refresh protocol or reject it
//! - error interceptors observe terminal errors for side effects only
//!
//! Interceptors can run more than once for one logical call (retries and the
//! post-refresh replay), so their side effects must tolerate re-invocation.

pub mod defaults;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use uuid::Uuid;

pub use self::defaults::{BearerAuthInterceptor, NetworkErrorInterceptor, RefreshOn401Interceptor};
use crate::errors::ApiError;
use crate::http::{HttpMethod, RequestDescriptor};

/// Pipeline stage an interceptor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorStage {
    Request,
    Response,
    Error,
}

/// Handle returned on registration, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorHandle {
    pub stage: InterceptorStage,
    id: u64,
}

/// What a response interceptor decided about a reply
#[derive(Debug, Clone)]
pub enum ResponseVerdict {
    /// Hand the reply on to body decoding
    Continue,
    /// Expired access token; run the refresh protocol and replay once
    RefreshAndRetry,
    /// Fail the attempt with this error
    Reject(ApiError),
}

/// Reply metadata seen by response interceptors
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub request_id: Uuid,
    pub endpoint: String,
    pub method: HttpMethod,
    pub status: u16,
    pub headers: HeaderMap,
    pub is_retry_attempt: bool,
}

/// Terminal error seen by error interceptors
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: Uuid,
    pub endpoint: String,
    pub method: HttpMethod,
    pub error: ApiError,
}

#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor, ApiError>;
}

#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn on_response(&self, response: &ResponseContext) -> ResponseVerdict;
}

#[async_trait]
pub trait ErrorInterceptor: Send + Sync {
    async fn on_error(&self, error: &ErrorContext);
}

type Chain<T> = RwLock<Vec<(u64, Arc<T>)>>;

/// Ordered, mutable interceptor chains
#[derive(Default)]
pub struct InterceptorPipeline {
    next_id: AtomicU64,
    request: Chain<dyn RequestInterceptor>,
    response: Chain<dyn ResponseInterceptor>,
    error: Chain<dyn ErrorInterceptor>,
}

impl InterceptorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&self, stage: InterceptorStage) -> InterceptorHandle {
        InterceptorHandle { stage, id: self.next_id.fetch_add(1, Ordering::Relaxed) }
    }

    pub fn add_request(&self, interceptor: Arc<dyn RequestInterceptor>) -> InterceptorHandle {
        let handle = self.next_handle(InterceptorStage::Request);
        self.request.write().push((handle.id, interceptor));
        handle
    }

    pub fn add_response(&self, interceptor: Arc<dyn ResponseInterceptor>) -> InterceptorHandle {
        let handle = self.next_handle(InterceptorStage::Response);
        self.response.write().push((handle.id, interceptor));
        handle
    }

    pub fn add_error(&self, interceptor: Arc<dyn ErrorInterceptor>) -> InterceptorHandle {
        let handle = self.next_handle(InterceptorStage::Error);
        self.error.write().push((handle.id, interceptor));
        handle
    }

    /// Remove a registered interceptor; `false` if it was already gone
    pub fn remove(&self, handle: InterceptorHandle) -> bool {
        fn remove_from<T: ?Sized>(chain: &Chain<T>, id: u64) -> bool {
            let mut chain = chain.write();
            let before = chain.len();
            chain.retain(|(existing, _)| *existing != id);
            chain.len() != before
        }

        match handle.stage {
            InterceptorStage::Request => remove_from(&self.request, handle.id),
            InterceptorStage::Response => remove_from(&self.response, handle.id),
            InterceptorStage::Error => remove_from(&self.error, handle.id),
        }
    }

    pub fn len(&self, stage: InterceptorStage) -> usize {
        match stage {
            InterceptorStage::Request => self.request.read().len(),
            InterceptorStage::Response => self.response.read().len(),
            InterceptorStage::Error => self.error.read().len(),
        }
    }

    /// Run request interceptors in registration order
    pub async fn apply_request(
        &self,
        mut request: RequestDescriptor,
    ) -> Result<RequestDescriptor, ApiError> {
        let chain = snapshot(&self.request);
        for interceptor in chain {
            request = interceptor.on_request(request).await?;
        }
        Ok(request)
    }

    /// Run response interceptors; the first verdict other than `Continue` wins
    pub async fn apply_response(&self, response: &ResponseContext) -> ResponseVerdict {
        let chain = snapshot(&self.response);
        for interceptor in chain {
            match interceptor.on_response(response).await {
                ResponseVerdict::Continue => {}
                verdict => return verdict,
            }
        }
        ResponseVerdict::Continue
    }

    /// Notify every error interceptor; the error itself is never suppressed
    pub async fn notify_error(&self, error: &ErrorContext) {
        let chain = snapshot(&self.error);
        for interceptor in chain {
            interceptor.on_error(error).await;
        }
    }
}

impl fmt::Debug for InterceptorPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorPipeline")
            .field("request", &self.len(InterceptorStage::Request))
            .field("response", &self.len(InterceptorStage::Response))
            .field("error", &self.len(InterceptorStage::Error))
            .finish()
    }
}

// Clone the Arcs so no lock is held across an await.
fn snapshot<T: ?Sized>(chain: &Chain<T>) -> Vec<Arc<T>> {
    chain.read().iter().map(|(_, interceptor)| Arc::clone(interceptor)).collect()
}

/* -------------------------------------------------------------------------- */
/* Closure adapters */
/* -------------------------------------------------------------------------- */

struct FnRequest<F>(F);
struct FnResponse<F>(F);
struct FnError<F>(F);

#[async_trait]
impl<F> RequestInterceptor for FnRequest<F>
where
    F: Fn(RequestDescriptor) -> Result<RequestDescriptor, ApiError> + Send + Sync,
{
    async fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor, ApiError> {
        (self.0)(request)
    }
}

#[async_trait]
impl<F> ResponseInterceptor for FnResponse<F>
where
    F: Fn(&ResponseContext) -> ResponseVerdict + Send + Sync,
{
    async fn on_response(&self, response: &ResponseContext) -> ResponseVerdict {
        (self.0)(response)
    }
}

#[async_trait]
impl<F> ErrorInterceptor for FnError<F>
where
    F: Fn(&ErrorContext) + Send + Sync,
{
    async fn on_error(&self, error: &ErrorContext) {
        (self.0)(error);
    }
}

/// Wrap a synchronous closure as a request interceptor
pub fn request_fn<F>(f: F) -> Arc<dyn RequestInterceptor>
where
    F: Fn(RequestDescriptor) -> Result<RequestDescriptor, ApiError> + Send + Sync + 'static,
{
    Arc::new(FnRequest(f))
}

/// Wrap a synchronous closure as a response interceptor
pub fn response_fn<F>(f: F) -> Arc<dyn ResponseInterceptor>
where
    F: Fn(&ResponseContext) -> ResponseVerdict + Send + Sync + 'static,
{
    Arc::new(FnResponse(f))
}

/// Wrap a synchronous closure as an error interceptor
pub fn error_fn<F>(f: F) -> Arc<dyn ErrorInterceptor>
where
    F: Fn(&ErrorContext) + Send + Sync + 'static,
{
    Arc::new(FnError(f))
}
