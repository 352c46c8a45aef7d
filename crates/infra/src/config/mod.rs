//! Configuration loading and management
//!
//! This module provides utilities for loading client configuration from
//! environment variables and files, and for opening the credential store the
//! configuration names.

pub mod loader;
pub mod storage;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
pub use storage::open_store;
