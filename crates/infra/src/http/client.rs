use std::time::Duration;

use propdesk_domain::constants::{DEFAULT_BASE_URL, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, Request};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::request::{RequestBody, RequestDescriptor};
use crate::errors::ApiError;
use crate::pipeline::{InterceptorPipeline, ResponseContext, ResponseVerdict};

/// HTTP transport with per-attempt timeout and linear-backoff retry.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Absolute URL for an endpoint; absolute endpoints are used as-is
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }

    pub(crate) fn client(&self) -> &ReqwestClient {
        &self.client
    }

    /// Execute a descriptor with retry semantics.
    ///
    /// Network failures, timeouts and 5xx replies are retried up to the
    /// attempt budget, sleeping `retry_delay * attempt` in between. Other
    /// errors, including 401/403 and `AuthExpired` verdicts from the response
    /// interceptors, return at once. Cancellation returns
    /// [`ApiError::Cancelled`] without consuming further attempts.
    pub async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        pipeline: &InterceptorPipeline,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ApiError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(descriptor, pipeline, cancel, attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= attempts {
                debug!(
                    attempt,
                    request_id = %descriptor.request_id,
                    method = %descriptor.method,
                    endpoint = %descriptor.endpoint,
                    error = %err,
                    "request failed"
                );
                return Err(err);
            }

            let delay = self.retry_delay.saturating_mul(attempt);
            warn!(
                attempt,
                max_attempts = attempts,
                request_id = %descriptor.request_id,
                method = %descriptor.method,
                endpoint = %descriptor.endpoint,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "request failed, retrying"
            );
            sleep_or_cancel(delay, cancel).await?;
        }
    }

    async fn attempt(
        &self,
        descriptor: &RequestDescriptor,
        pipeline: &InterceptorPipeline,
        cancel: Option<&CancellationToken>,
        attempt: u32,
    ) -> Result<Value, ApiError> {
        with_deadline(descriptor.timeout, cancel, self.send_once(descriptor, pipeline, attempt)).await
    }

    async fn send_once(
        &self,
        descriptor: &RequestDescriptor,
        pipeline: &InterceptorPipeline,
        attempt: u32,
    ) -> Result<Value, ApiError> {
        let request = self.build_request(descriptor).await?;
        debug!(
            attempt,
            request_id = %descriptor.request_id,
            method = %descriptor.method,
            url = %request.url(),
            "sending HTTP request"
        );

        let response = self.client.execute(request).await?;
        let status = response.status();
        debug!(attempt, request_id = %descriptor.request_id, %status, "received HTTP response");

        let context = ResponseContext {
            request_id: descriptor.request_id,
            endpoint: descriptor.endpoint.clone(),
            method: descriptor.method,
            status: status.as_u16(),
            headers: response.headers().clone(),
            is_retry_attempt: descriptor.is_retry_attempt,
        };
        match pipeline.apply_response(&context).await {
            ResponseVerdict::Continue => {}
            ResponseVerdict::RefreshAndRetry => return Err(ApiError::AuthExpired),
            ResponseVerdict::Reject(err) => return Err(err),
        }

        let text = response.text().await?;
        if status.is_success() {
            parse_body(&text)
        } else {
            Err(ApiError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                &text,
            ))
        }
    }

    async fn build_request(&self, descriptor: &RequestDescriptor) -> Result<Request, ApiError> {
        let mut headers = descriptor.headers.clone();
        if descriptor.is_multipart() {
            headers.remove(CONTENT_TYPE);
        }

        let mut builder = self
            .client
            .request(descriptor.method.into(), self.url_for(&descriptor.endpoint))
            .headers(headers);

        if !descriptor.query.is_empty() {
            builder = builder.query(&descriptor.query);
        }

        builder = match &descriptor.body {
            Some(RequestBody::Json(value)) => builder.body(serde_json::to_vec(value)?),
            Some(RequestBody::Form(form)) => builder.multipart(form.to_multipart().await?),
            None => builder,
        };

        Ok(builder.build()?)
    }
}

/// Bound a future by a timeout and an optional cancellation token.
pub(crate) async fn with_deadline<F>(
    timeout: Duration,
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Result<Value, ApiError>
where
    F: std::future::Future<Output = Result<Value, ApiError>>,
{
    let timed = async {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    };

    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(ApiError::Cancelled),
            result = timed => result,
        },
        None => timed.await,
    }
}

async fn sleep_or_cancel(delay: Duration, cancel: Option<&CancellationToken>) -> Result<(), ApiError> {
    if delay.is_zero() {
        return match cancel {
            Some(token) if token.is_cancelled() => Err(ApiError::Cancelled),
            _ => Ok(()),
        };
    }

    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(ApiError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        },
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

/// Empty bodies decode to `null`.
pub(crate) fn parse_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    base_url: String,
    max_attempts: u32,
    retry_delay: Duration,
    user_agent: Option<String>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            user_agent: None,
        }
    }
}

impl HttpTransportBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Base delay; the wait before retry `n` is `retry_delay * n`.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpTransport, ApiError> {
        let mut builder = ReqwestClient::builder().no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|err| ApiError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpTransport {
            client,
            base_url: self.base_url,
            max_attempts: self.max_attempts.max(1),
            retry_delay: self.retry_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::HttpMethod;
    use crate::pipeline::response_fn;

    fn transport(server: &MockServer, attempts: u32, delay_ms: u64) -> HttpTransport {
        HttpTransport::builder()
            .base_url(server.uri())
            .retry_delay(Duration::from_millis(delay_ms))
            .max_attempts(attempts)
            .build()
            .expect("transport")
    }

    #[tokio::test]
    async fn returns_json_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/properties"))
            .and(query_param("location", "Lisbon"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"_id": "p1"}])))
            .expect(1)
            .mount(&server)
            .await;

        let mut descriptor = RequestDescriptor::get("/properties");
        descriptor.query.insert("location".into(), "Lisbon".into());

        let value = transport(&server, 3, 10)
            .execute(&descriptor, &InterceptorPipeline::new(), None)
            .await
            .expect("response");

        assert_eq!(value, json!([{"_id": "p1"}]));
    }

    #[tokio::test]
    async fn json_body_is_serialized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bookings"))
            .and(body_json(json!({"guests": 2})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "b1"})))
            .expect(1)
            .mount(&server)
            .await;

        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/bookings").with_json(json!({"guests": 2}));
        let value = transport(&server, 1, 0)
            .execute(&descriptor, &InterceptorPipeline::new(), None)
            .await
            .unwrap();
        assert_eq!(value["_id"], "b1");
    }

    #[tokio::test]
    async fn empty_body_decodes_to_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let descriptor = RequestDescriptor::new(HttpMethod::Delete, "/users/u1");
        let value = transport(&server, 1, 0)
            .execute(&descriptor, &InterceptorPipeline::new(), None)
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                let current = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    ResponseTemplate::new(500)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"ok": true}))
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let value = transport(&server, 3, 5)
            .execute(&RequestDescriptor::get("/stats"), &InterceptorPipeline::new(), None)
            .await
            .expect("response");

        assert_eq!(value, json!({"ok": true}));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn persistent_503_exhausts_budget_with_linear_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "maintenance window"})))
            .expect(3)
            .mount(&server)
            .await;

        let started = Instant::now();
        let err = transport(&server, 3, 40)
            .execute(&RequestDescriptor::get("/properties"), &InterceptorPipeline::new(), None)
            .await
            .unwrap_err();

        // 40ms * 1 + 40ms * 2 between the three attempts
        assert!(started.elapsed() >= Duration::from_millis(120));
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.message(), "maintenance window");
    }

    #[tokio::test]
    async fn does_not_retry_auth_or_client_errors() {
        for status in [400_u16, 401, 403, 404, 429] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .expect(1)
                .mount(&server)
                .await;

            let err = transport(&server, 3, 5)
                .execute(&RequestDescriptor::get("/users"), &InterceptorPipeline::new(), None)
                .await
                .unwrap_err();

            assert_eq!(err.status(), Some(status));
            let requests = server.received_requests().await.unwrap();
            assert_eq!(requests.len(), 1, "status {status} must not be retried");
        }
    }

    #[tokio::test]
    async fn refresh_verdict_surfaces_as_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = InterceptorPipeline::new();
        pipeline.add_response(response_fn(|ctx| {
            if ctx.status == 401 {
                ResponseVerdict::RefreshAndRetry
            } else {
                ResponseVerdict::Continue
            }
        }));

        let err = transport(&server, 3, 5)
            .execute(&RequestDescriptor::get("/auth/me"), &pipeline, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AuthExpired));
    }

    #[tokio::test]
    async fn slow_attempts_time_out_and_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let descriptor = RequestDescriptor::get("/slow").with_timeout(Duration::from_millis(50));
        let err = transport(&server, 2, 1)
            .execute(&descriptor, &InterceptorPipeline::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn cancellation_stops_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = transport(&server, 3, 5)
            .execute(&RequestDescriptor::get("/slow"), &InterceptorPipeline::new(), Some(&token))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn retries_on_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED

        let transport = HttpTransport::builder()
            .base_url(format!("http://{addr}"))
            .retry_delay(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .expect("transport");

        let err = transport
            .execute(&RequestDescriptor::get("/properties"), &InterceptorPipeline::new(), None)
            .await
            .unwrap_err();
        assert!(err.is_network(), "expected network error, got {err:?}");
    }

    #[test]
    fn url_joining() {
        let transport = HttpTransport::builder().base_url("http://api.test/api/").build().unwrap();
        assert_eq!(transport.url_for("/properties"), "http://api.test/api/properties");
        assert_eq!(transport.url_for("bookings/1"), "http://api.test/api/bookings/1");
        assert_eq!(transport.url_for("https://cdn.test/x"), "https://cdn.test/x");
    }
}
