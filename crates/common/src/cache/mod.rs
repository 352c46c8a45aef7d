//! TTL response cache
//!
//! Holds decoded GET responses keyed by request signature. Entries carry
//! their own TTL and are purged lazily on read; there is no background
//! sweep. Mutations invalidate by substring match on the key, so clearing
//! `"properties"` drops every cached read under `/properties`.
//!
//! # Example
//! ```
//! use std::time::Duration;
//!
//! use propdesk_common::cache::{cache_key, resource_family, TtlCache};
//!
//! let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(300));
//! let key = cache_key("/properties", [("location", "Aspen")]);
//! cache.insert(key.clone(), "cached".to_string());
//! assert_eq!(cache.get(&key), Some("cached".to_string()));
//!
//! cache.invalidate(Some(resource_family("/properties/42")));
//! assert!(cache.get(&key).is_none());
//! ```

mod core;
pub mod key;
mod stats;

pub use self::core::TtlCache;
pub use key::{cache_key, resource_family};
pub use stats::CacheStats;
