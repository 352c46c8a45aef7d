//! Concurrent batches and paginated listings

use futures::future::join_all;
use propdesk_domain::constants::{DEFAULT_PAGE, DEFAULT_PAGE_LIMIT};
use propdesk_domain::{Page, QueryParams};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::client::{decode, ApiClient};
use super::options::RequestOptions;
use crate::errors::ApiError;
use crate::http::HttpMethod;

/// One request of a [`ApiClient::batch`] call
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub params: QueryParams,
    pub body: Option<Value>,
    pub options: RequestOptions,
}

impl BatchRequest {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            params: QueryParams::new(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, endpoint).with_body(body)
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, endpoint).with_body(body)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

impl ApiClient {
    /// Run every request concurrently
    ///
    /// Returns one result per request in input order. A failing request does
    /// not affect the others.
    pub async fn batch(&self, requests: Vec<BatchRequest>) -> Vec<Result<Value, ApiError>> {
        debug!(count = requests.len(), "running request batch");
        join_all(requests.into_iter().map(|request| self.run_batched(request))).await
    }

    async fn run_batched(&self, request: BatchRequest) -> Result<Value, ApiError> {
        let BatchRequest { method, endpoint, params, body, options } = request;
        match method {
            HttpMethod::Get => self.get(&endpoint, &params, options).await,
            HttpMethod::Post => self.post(&endpoint, body, options).await,
            HttpMethod::Put => self.put(&endpoint, body, options).await,
            HttpMethod::Patch => self.patch(&endpoint, body, options).await,
            HttpMethod::Delete => self.delete(&endpoint, options).await,
        }
    }

    /// Fetch one page of a paginated listing
    ///
    /// `page` and `limit` default to 1 and 10 and are sent alongside `params`.
    pub async fn paginate<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<T>, ApiError> {
        let mut query = params.clone();
        query.insert("page".into(), page.unwrap_or(DEFAULT_PAGE).to_string());
        query.insert("limit".into(), limit.unwrap_or(DEFAULT_PAGE_LIMIT).to_string());

        decode(self.get(endpoint, &query, RequestOptions::default()).await?)
    }
}
