//! # PropDesk Domain
//!
//! Business domain types and models for the PropDesk API access layer.
//!
//! This crate contains:
//! - Resource DTOs exchanged with the backend (properties, bookings, ...)
//! - Domain error types and Result definitions
//! - Client configuration structures
//! - Domain constants (storage keys, defaults, event names)
//!
//! ## Architecture
//! - No dependencies on other PropDesk crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::serde::duration_millis;
