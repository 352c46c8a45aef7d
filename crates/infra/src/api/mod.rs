//! API client facade and resource helpers

pub mod batch;
pub mod client;
pub mod options;
pub mod resources;

pub use batch::BatchRequest;
pub use client::{ApiClient, ApiClientBuilder};
pub use options::{RequestOptions, UploadOptions};
