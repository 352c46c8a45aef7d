//! HTTP transport
//!
//! [`HttpTransport`] executes a [`RequestDescriptor`] with a per-attempt
//! timeout and linear-backoff retries; uploads go through a separate
//! single-attempt path with progress reporting.

pub mod client;
pub mod request;
pub mod upload;

pub use client::{HttpTransport, HttpTransportBuilder};
pub use request::{FormData, FormPart, HttpMethod, RequestBody, RequestDescriptor, UploadFile};
pub use upload::ProgressFn;
