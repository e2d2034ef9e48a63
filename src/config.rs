//! Runtime configuration from environment variables
//!
//! `API_KEY` and `API_ENDPOINT` are required. Everything else has a default
//! matching a scan of the latest 100 blocks with 10 attempts per block fetch.

use crate::retry::RetryPolicy;
use reqwest::header::HeaderValue;
use std::env;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const DEFAULT_BLOCK_WINDOW: u64 = 100;
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_FETCH_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_BACKOFF_MAX_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_ID: &str = "getblock.io";

/// Expected transactions per block used to size the event channel.
pub const EXPECTED_TXS_PER_BLOCK: usize = 50;

/// Largest capacity a tokio mpsc channel accepts.
pub const MAX_EVENT_BUFFER: usize = Semaphore::MAX_PERMITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for one scan run
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential sent in the `x-api-key` header
    pub api_key: String,

    /// JSON-RPC endpoint URL
    pub api_endpoint: String,

    /// Number of most recent blocks to scan
    pub block_window: u64,

    /// Per-request timeout
    pub rpc_timeout: Duration,

    /// Total attempts allowed per RPC call (first call included)
    pub max_fetch_attempts: u32,

    /// Initial delay between attempts; zero disables backoff
    pub retry_backoff: Duration,

    /// Upper bound for the doubled backoff delay
    pub retry_backoff_max: Duration,

    /// Capacity of the worker -> aggregator event channel
    pub event_buffer: usize,

    /// `id` field of outgoing JSON-RPC requests
    pub request_id: String,

    pub output_format: OutputFormat,
}

/// Settings the scan pipeline needs, detached from transport credentials.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub window: u64,
    pub event_buffer: usize,
    pub retry: RetryPolicy,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Call `dotenv::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Environment variables:
    /// - `API_KEY` (required)
    /// - `API_ENDPOINT` (required, http:// or https://)
    /// - `BLOCK_WINDOW` (default: 100)
    /// - `RPC_TIMEOUT_SECS` (default: 30)
    /// - `MAX_FETCH_ATTEMPTS` (default: 10)
    /// - `RETRY_BACKOFF_MS` (default: 0, no delay between attempts)
    /// - `RETRY_BACKOFF_MAX_MS` (default: 5000)
    /// - `EVENT_CHANNEL_BUFFER` (default: 50 * 2 * BLOCK_WINDOW, capped at `MAX_EVENT_BUFFER`)
    /// - `RPC_REQUEST_ID` (default: getblock.io)
    /// - `OUTPUT_FORMAT` (text | json, default: text)
    ///
    /// `RUST_LOG` is read by env_logger directly.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, "API_KEY")?;
        if HeaderValue::from_str(&api_key).is_err() {
            return Err(ConfigError::InvalidValue(
                "API_KEY contains characters not allowed in an HTTP header".to_string(),
            ));
        }
        let api_endpoint = required(&lookup, "API_ENDPOINT")?;

        if !api_endpoint.starts_with("http://") && !api_endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "API_ENDPOINT must start with http:// or https://".to_string(),
            ));
        }

        let block_window = parse_or(&lookup, "BLOCK_WINDOW", DEFAULT_BLOCK_WINDOW)?;
        if block_window == 0 {
            return Err(ConfigError::InvalidValue(
                "BLOCK_WINDOW must be greater than zero".to_string(),
            ));
        }

        let rpc_timeout_secs = parse_or(&lookup, "RPC_TIMEOUT_SECS", DEFAULT_RPC_TIMEOUT_SECS)?;
        if rpc_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RPC_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let max_fetch_attempts =
            parse_or(&lookup, "MAX_FETCH_ATTEMPTS", DEFAULT_MAX_FETCH_ATTEMPTS)?;
        if max_fetch_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_FETCH_ATTEMPTS must be greater than zero".to_string(),
            ));
        }

        let retry_backoff_ms: u64 = parse_or(&lookup, "RETRY_BACKOFF_MS", 0)?;
        let retry_backoff_max_ms =
            parse_or(&lookup, "RETRY_BACKOFF_MAX_MS", DEFAULT_RETRY_BACKOFF_MAX_MS)?;

        let default_buffer = default_event_buffer(block_window);
        let event_buffer = parse_or(&lookup, "EVENT_CHANNEL_BUFFER", default_buffer)?;
        if event_buffer == 0 || event_buffer > MAX_EVENT_BUFFER {
            return Err(ConfigError::InvalidValue(format!(
                "EVENT_CHANNEL_BUFFER must be between 1 and {}",
                MAX_EVENT_BUFFER
            )));
        }

        let request_id = optional(&lookup, "RPC_REQUEST_ID")
            .unwrap_or_else(|| DEFAULT_REQUEST_ID.to_string());

        let output_format = match optional(&lookup, "OUTPUT_FORMAT")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            None | Some("text") => OutputFormat::Text,
            Some("json") => OutputFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "OUTPUT_FORMAT must be text or json, got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            api_key,
            api_endpoint,
            block_window,
            rpc_timeout: Duration::from_secs(rpc_timeout_secs),
            max_fetch_attempts,
            retry_backoff: Duration::from_millis(retry_backoff_ms),
            retry_backoff_max: Duration::from_millis(retry_backoff_max_ms),
            event_buffer,
            request_id,
            output_format,
        })
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            window: self.block_window,
            event_buffer: self.event_buffer,
            retry: RetryPolicy {
                max_attempts: self.max_fetch_attempts,
                initial_delay: self.retry_backoff,
                max_delay: self.retry_backoff_max,
            },
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            window: DEFAULT_BLOCK_WINDOW,
            event_buffer: default_event_buffer(DEFAULT_BLOCK_WINDOW),
            retry: RetryPolicy::default(),
        }
    }
}

/// Two events per transaction, `EXPECTED_TXS_PER_BLOCK` transactions per block.
pub fn default_event_buffer(block_window: u64) -> usize {
    let window = usize::try_from(block_window).unwrap_or(usize::MAX);
    EXPECTED_TXS_PER_BLOCK
        .saturating_mul(2)
        .saturating_mul(window)
        .min(MAX_EVENT_BUFFER)
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match optional(lookup, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{} has invalid value '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_KEY", "secret"),
            ("API_ENDPOINT", "https://go.getblock.io/mainnet"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "secret");
        assert_eq!(config.block_window, 100);
        assert_eq!(config.rpc_timeout, Duration::from_secs(30));
        assert_eq!(config.max_fetch_attempts, 10);
        assert_eq!(config.retry_backoff, Duration::ZERO);
        assert_eq!(config.event_buffer, 10_000);
        assert_eq!(config.request_id, "getblock.io");
        assert_eq!(config.output_format, OutputFormat::Text);
    }

    #[test]
    fn test_custom_config() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_KEY", "secret"),
            ("API_ENDPOINT", "http://localhost:8545"),
            ("BLOCK_WINDOW", "20"),
            ("MAX_FETCH_ATTEMPTS", "3"),
            ("RETRY_BACKOFF_MS", "250"),
            ("OUTPUT_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.block_window, 20);
        // Buffer follows the window unless set explicitly
        assert_eq!(config.event_buffer, 2_000);

        let settings = config.scan_settings();
        assert_eq!(settings.window, 20);
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_missing_credentials() {
        let err = Config::from_lookup(lookup_from(&[("API_ENDPOINT", "https://x")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVariable("API_KEY".to_string()));

        // Empty counts as missing
        let err = Config::from_lookup(lookup_from(&[("API_KEY", "k"), ("API_ENDPOINT", "  ")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingVariable("API_ENDPOINT".to_string()));
    }

    #[test]
    fn test_invalid_values() {
        let base = [("API_KEY", "k"), ("API_ENDPOINT", "https://x")];

        let err = Config::from_lookup(lookup_from(&[base[0], ("API_ENDPOINT", "ftp://x")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));

        let err = Config::from_lookup(lookup_from(&[base[0], base[1], ("BLOCK_WINDOW", "0")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));

        let err = Config::from_lookup(lookup_from(&[base[0], base[1], ("BLOCK_WINDOW", "ten")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));

        let err = Config::from_lookup(lookup_from(&[base[0], base[1], ("OUTPUT_FORMAT", "xml")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_huge_window_caps_channel_buffer() {
        let base = [("API_KEY", "k"), ("API_ENDPOINT", "https://x")];

        let config = Config::from_lookup(lookup_from(&[
            base[0],
            base[1],
            ("BLOCK_WINDOW", "100000000000000000"),
        ]))
        .unwrap();
        assert_eq!(config.event_buffer, MAX_EVENT_BUFFER);

        let too_big = (MAX_EVENT_BUFFER as u128 + 1).to_string();
        let err = Config::from_lookup(lookup_from(&[
            base[0],
            base[1],
            ("EVENT_CHANNEL_BUFFER", too_big.as_str()),
        ]));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));

        let limit = MAX_EVENT_BUFFER.to_string();
        let config = Config::from_lookup(lookup_from(&[
            base[0],
            base[1],
            ("EVENT_CHANNEL_BUFFER", limit.as_str()),
        ]))
        .unwrap();
        assert_eq!(config.event_buffer, MAX_EVENT_BUFFER);
    }

    #[test]
    fn test_api_key_must_be_header_safe() {
        // Trailing whitespace is trimmed, so put the newline inside the key
        let err = Config::from_lookup(lookup_from(&[
            ("API_KEY", "abc\ndef"),
            ("API_ENDPOINT", "https://x"),
        ]));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));

        let scan_err = crate::error::ScanError::from(err.unwrap_err());
        assert!(scan_err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_dotenv_file_loading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "API_KEY=from-file").unwrap();
        writeln!(file, "API_ENDPOINT=https://eth.example.org").unwrap();
        writeln!(file, "BLOCK_WINDOW=5").unwrap();

        let vars: HashMap<String, String> = dotenv::from_path_iter(file.path())
            .unwrap()
            .map(|item| item.unwrap())
            .collect();

        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.api_endpoint, "https://eth.example.org");
        assert_eq!(config.block_window, 5);
    }
}
