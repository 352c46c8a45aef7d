//! Time abstractions
//!
//! - **[`clock`]**: real and mock clocks so TTL logic can be tested without
//!   sleeping

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
