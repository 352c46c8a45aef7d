//! Session credentials and the single-flight refresh protocol

pub mod refresher;
pub mod token_manager;

pub use refresher::{HttpTokenRefresher, TokenRefresher};
pub use token_manager::{RefreshPhase, TokenManager};
