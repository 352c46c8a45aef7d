//! # PropDesk Infrastructure
//!
//! HTTP and WebSocket access to the PropDesk API.
//!
//! This crate contains:
//! - The [`ApiClient`] facade with typed resource helpers
//! - A retrying HTTP transport with multipart upload progress
//! - The request/response/error interceptor pipeline
//! - Token persistence with single-flight refresh
//! - A reconnecting realtime channel
//! - Configuration loading from the environment or a file
//!
//! ## Architecture
//! - Domain types and configuration come from `propdesk-domain`
//! - Cache and credential storage come from `propdesk-common`
//! - Contains all I/O: network, files and the platform keychain

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod http;
pub mod pipeline;
pub mod realtime;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, BatchRequest, RequestOptions, UploadOptions};
pub use auth::{TokenManager, TokenRefresher};
pub use errors::{ApiError, ApiErrorCategory};
pub use events::{ClientEvent, EventBus};
pub use http::{FormData, HttpMethod, RequestDescriptor, UploadFile};
pub use pipeline::{InterceptorHandle, InterceptorPipeline, ResponseVerdict};
pub use realtime::{RealtimeChannel, RealtimeState};
