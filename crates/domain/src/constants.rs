//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! client.

// Persisted credential keys
pub const ACCESS_TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

// Transport defaults
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

// Cache defaults
pub const DEFAULT_CACHE_TTL_MS: u64 = 5 * 60 * 1_000;

// Realtime defaults
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
pub const DEFAULT_REALTIME_PATH: &str = "/ws";

// Pagination defaults
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

// Auth endpoints
pub const AUTH_LOGIN_PATH: &str = "/auth/login";
pub const AUTH_REGISTER_PATH: &str = "/auth/register";
pub const AUTH_ME_PATH: &str = "/auth/me";
pub const AUTH_REFRESH_PATH: &str = "/auth/refresh";
pub const AUTH_LOGOUT_PATH: &str = "/auth/logout";

// Event names published to UI subscribers
pub const EVENT_AUTH_LOGOUT: &str = "auth:logout";
pub const EVENT_NETWORK_ERROR: &str = "network:error";
pub const EVENT_WS_CONNECTED: &str = "ws:connected";
pub const EVENT_WS_DISCONNECTED: &str = "ws:disconnected";
pub const EVENT_WS_MESSAGE: &str = "ws:message";
