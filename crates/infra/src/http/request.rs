//! Request descriptors and request bodies
//!
//! A [`RequestDescriptor`] is built fresh for every logical call and is only
//! mutated by request interceptors. Bodies are owned and cloneable so the
//! transport can rebuild the wire request for each attempt.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use propdesk_domain::constants::DEFAULT_TIMEOUT_MS;
use propdesk_domain::QueryParams;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::ApiError;

/// HTTP verbs used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Mutating verbs invalidate cached reads of their resource family
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request payload
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Form(FormData),
}

/// Description of one logical request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub endpoint: String,
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub query: QueryParams,
    pub body: Option<RequestBody>,
    /// Bound on each individual attempt
    pub timeout: Duration,
    /// Set on the single replay that follows a token refresh
    pub is_retry_attempt: bool,
    pub request_id: Uuid,
}

impl RequestDescriptor {
    /// New descriptor with the default `Content-Type: application/json`
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            endpoint: endpoint.into(),
            method,
            headers,
            query: QueryParams::new(),
            body: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            is_retry_attempt: false,
            request_id: Uuid::now_v7(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Attach a multipart body; the JSON content type is dropped so the
    /// multipart boundary header can be negotiated by the transport
    pub fn with_form(mut self, form: FormData) -> Self {
        self.headers.remove(CONTENT_TYPE);
        self.body = Some(RequestBody::Form(form));
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add or replace a header
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] for an invalid header name or value.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| ApiError::Config(format!("invalid header name {name:?}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| ApiError::Config(format!("invalid value for header {name}: {err}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Set `Authorization: Bearer <token>`, marked sensitive
    pub fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::Config("access token is not a valid header value".into()))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Copy of this descriptor marked as the post-refresh replay
    pub fn as_retry_attempt(&self) -> Self {
        let mut replay = self.clone();
        replay.is_retry_attempt = true;
        replay
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, Some(RequestBody::Form(_)))
    }
}

/// One field of a multipart form
#[derive(Debug, Clone)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file: UploadFile },
}

/// Owned multipart description, turned into a [`Form`] per attempt
#[derive(Debug, Clone, Default)]
pub struct FormData {
    parts: Vec<FormPart>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text { name: name.into(), value: value.into() });
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: UploadFile) -> Self {
        self.parts.push(FormPart::File { name: name.into(), file });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Build the wire form, reading file parts from disk
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] when a file cannot be read.
    pub async fn to_multipart(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File { name, file } => {
                    let bytes = file.read().await?;
                    let part = Part::bytes(bytes)
                        .file_name(file.file_name().to_string())
                        .mime_str(file.mime())?;
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

#[derive(Debug, Clone)]
enum UploadSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// File attached to an upload or multipart form
#[derive(Debug, Clone)]
pub struct UploadFile {
    source: UploadSource,
    file_name: String,
    mime: String,
}

impl UploadFile {
    /// File on disk; name and MIME type come from the path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        let mime = guess_mime(&path);
        Self { source: UploadSource::Path(path), file_name, mime }
    }

    /// In-memory file contents
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = guess_mime(Path::new(&file_name));
        Self { source: UploadSource::Bytes(bytes), file_name, mime }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub(crate) async fn read(&self) -> Result<Vec<u8>, ApiError> {
        match &self.source {
            UploadSource::Bytes(bytes) => Ok(bytes.clone()),
            UploadSource::Path(path) => tokio::fs::read(path).await.map_err(|err| {
                ApiError::Config(format!("cannot read upload file {}: {err}", path.display()))
            }),
        }
    }
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string()
}
