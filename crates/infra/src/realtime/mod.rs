//! Reconnecting realtime push channel

pub mod channel;

pub use channel::{realtime_url, RealtimeChannel, RealtimeState};
