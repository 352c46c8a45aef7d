//! Multipart file upload with progress reporting
//!
//! Uploads are a single attempt: no retry and no refresh routing. The file is
//! streamed in fixed-size chunks and the callback receives the fraction of
//! file bytes handed to the connection so far.

use std::sync::Arc;

use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::client::{parse_body, with_deadline, HttpTransport};
use super::request::{FormPart, RequestBody, RequestDescriptor, UploadFile};
use crate::errors::ApiError;

/// Progress callback, called with a value in `0.0..=1.0`
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

const CHUNK_SIZE: usize = 64 * 1024;

/// Field name of the uploaded file
pub const FILE_FIELD: &str = "file";

impl HttpTransport {
    /// Upload `file` as the `file` field of a multipart POST.
    ///
    /// Text parts of a `Form` body on the descriptor are sent alongside the
    /// file. Resolves with the decoded reply on 2xx and fails with the status
    /// error otherwise.
    pub async fn upload(
        &self,
        descriptor: &RequestDescriptor,
        file: UploadFile,
        on_progress: Option<ProgressFn>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ApiError> {
        let send = self.send_upload(descriptor, file, on_progress);
        with_deadline(descriptor.timeout, cancel, send).await
    }

    async fn send_upload(
        &self,
        descriptor: &RequestDescriptor,
        file: UploadFile,
        on_progress: Option<ProgressFn>,
    ) -> Result<Value, ApiError> {
        let mut form = Form::new();
        if let Some(RequestBody::Form(fields)) = &descriptor.body {
            for part in fields.parts() {
                if let FormPart::Text { name, value } = part {
                    form = form.text(name.clone(), value.clone());
                }
            }
        }

        let bytes = file.read().await?;
        let total = bytes.len() as u64;
        let part = Part::stream_with_length(progress_body(bytes, on_progress), total)
            .file_name(file.file_name().to_string())
            .mime_str(file.mime())?;
        form = form.part(FILE_FIELD, part);

        let mut headers = descriptor.headers.clone();
        headers.remove(reqwest::header::CONTENT_TYPE);

        let url = self.url_for(&descriptor.endpoint);
        debug!(request_id = %descriptor.request_id, %url, file = file.file_name(), bytes = total, "uploading file");

        let response = self
            .client()
            .request(descriptor.method.into(), url)
            .headers(headers)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                &text,
            ));
        }

        info!(request_id = %descriptor.request_id, %status, "upload complete");
        parse_body(&text)
    }
}

fn progress_body(bytes: Vec<u8>, on_progress: Option<ProgressFn>) -> Body {
    let total = bytes.len();
    if total == 0 {
        if let Some(callback) = &on_progress {
            callback(1.0);
        }
    }

    let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
    let mut sent = 0_usize;
    let stream = stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len();
        if let Some(callback) = &on_progress {
            #[allow(clippy::cast_precision_loss)]
            callback(sent as f64 / total as f64);
        }
        Ok::<_, std::io::Error>(chunk)
    }));

    Body::wrap_stream(stream)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::{FormData, HttpMethod};

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::builder().base_url(server.uri()).max_attempts(3).build().unwrap()
    }

    #[tokio::test]
    async fn uploads_file_with_fields_and_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/properties/p1/images"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"url": "/uploads/a.png"})))
            .expect(1)
            .mount(&server)
            .await;

        let seen = Arc::new(Mutex::new(Vec::<f64>::new()));
        let seen_clone = Arc::clone(&seen);
        let progress: ProgressFn = Arc::new(move |fraction| seen_clone.lock().push(fraction));

        let mut descriptor = RequestDescriptor::new(HttpMethod::Post, "/properties/p1/images")
            .with_form(FormData::new().text("caption", "Sea view"));
        descriptor.set_bearer("a-1").unwrap();

        let file = UploadFile::from_bytes("a.png", vec![7_u8; CHUNK_SIZE * 2 + 10]);
        let value = transport(&server).upload(&descriptor, file, Some(progress), None).await.unwrap();
        assert_eq!(value["url"], "/uploads/a.png");

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).into_owned();
        assert!(body.contains("name=\"caption\""));
        assert!(body.contains("Sea view"));
        assert!(body.contains("name=\"file\"; filename=\"a.png\""));

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!((seen[2] - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_upload_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/uploads");
        let err = transport(&server)
            .upload(&descriptor, UploadFile::from_bytes("doc.pdf", b"%PDF".to_vec()), None, None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(err.message(), "HTTP 500: Internal Server Error");
    }

    #[tokio::test]
    async fn upload_respects_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let descriptor =
            RequestDescriptor::new(HttpMethod::Post, "/uploads").with_timeout(Duration::from_millis(50));
        let err = transport(&server)
            .upload(&descriptor, UploadFile::from_bytes("a.txt", b"hi".to_vec()), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Timeout(_)));
    }
}
