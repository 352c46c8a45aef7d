//! Reusable runtime pieces shared across PropDesk crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: serde, error and URL-encoding dependencies
//! - `runtime`: TTL cache, clock abstraction, in-memory and file storage
//! - `platform`: platform keychain storage
//! - `observability`: tracing (pulled in by `runtime`)
//! - `test-utils`: temp-dir backed fixtures for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod storage;
#[cfg(feature = "runtime")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use cache::{cache_key, resource_family, CacheStats, TtlCache};
#[cfg(feature = "platform")]
pub use storage::KeychainStore;
#[cfg(feature = "runtime")]
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageResult};
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
