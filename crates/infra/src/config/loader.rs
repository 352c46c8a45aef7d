//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `PROPDESK_API_URL` is not set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `PROPDESK_API_URL`: Base URL of the REST API (required)
//! - `PROPDESK_TIMEOUT_MS`: Per-attempt request timeout
//! - `PROPDESK_RETRY_ATTEMPTS`: Total attempts per request
//! - `PROPDESK_RETRY_DELAY_MS`: Linear backoff base delay
//! - `PROPDESK_CACHE_TTL_MS`: Default TTL of cached GET responses
//! - `PROPDESK_WS_RECONNECT_MS`: Realtime reconnect delay
//! - `PROPDESK_STORAGE_PATH`: Persist credentials to this JSON file
//! - `PROPDESK_USE_KEYCHAIN`: Persist credentials in the platform keychain
//!   (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./propdesk.toml` or `./propdesk.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use propdesk_domain::{ClientConfig, PropDeskError, Result, StorageConfig};

const CONFIG_FILE_NAMES: [&str; 4] = ["propdesk.toml", "propdesk.json", "config.toml", "config.json"];
const KEYCHAIN_SERVICE: &str = "propdesk";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the base URL
/// variable is missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `PropDeskError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value is out of range
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `PROPDESK_API_URL` is required; every other variable falls back to the
/// default value when unset.
///
/// # Errors
/// Returns `PropDeskError::Config` if the base URL is missing or a value
/// cannot be parsed.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::new(env_var("PROPDESK_API_URL")?);

    if let Some(ms) = env_parse::<u64>("PROPDESK_TIMEOUT_MS")? {
        config.timeout = Duration::from_millis(ms);
    }
    if let Some(attempts) = env_parse::<u32>("PROPDESK_RETRY_ATTEMPTS")? {
        config.retry_attempts = attempts;
    }
    if let Some(ms) = env_parse::<u64>("PROPDESK_RETRY_DELAY_MS")? {
        config.retry_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = env_parse::<u64>("PROPDESK_CACHE_TTL_MS")? {
        config.cache_ttl = Duration::from_millis(ms);
    }
    if let Some(ms) = env_parse::<u64>("PROPDESK_WS_RECONNECT_MS")? {
        config.realtime.reconnect_delay = Duration::from_millis(ms);
    }

    if let Ok(path) = std::env::var("PROPDESK_STORAGE_PATH") {
        config.storage = StorageConfig::File { path: PathBuf::from(path) };
    } else if env_bool("PROPDESK_USE_KEYCHAIN", false) {
        config.storage = StorageConfig::Keychain { service: KEYCHAIN_SERVICE.to_string() };
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `PropDeskError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The parsed configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PropDeskError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PropDeskError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PropDeskError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PropDeskError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PropDeskError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(PropDeskError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent and grandparent, then
/// the executable's directory and its parents, trying each name in
/// `propdesk.{toml,json}`, `config.{toml,json}` order.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend(exe_dir.ancestors().take(3).map(Path::to_path_buf));
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `PropDeskError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| PropDeskError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `PropDeskError::Config` if the variable is set but malformed.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| PropDeskError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
