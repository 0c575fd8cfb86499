//! Store and client configuration
//!
//! Values come from the environment with fixed defaults; nothing here is
//! persisted.

use std::path::PathBuf;
use std::time::Duration;

/// File name of the persisted connection document inside the data directory
pub const CONNECTIONS_FILE: &str = "connections.json";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Timeouts and retry policy applied to every cluster client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    /// Upper bound for a single request
    pub request_timeout: Duration,
    /// Upper bound for a ping
    pub ping_timeout: Duration,
    /// Retries after a transport failure (HTTP error statuses are never retried)
    pub max_retries: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            ping_timeout: Duration::from_millis(DEFAULT_PING_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ClientSettings {
    /// Read `ES_REQUEST_TIMEOUT`, `ES_PING_TIMEOUT` (milliseconds) and
    /// `ES_MAX_RETRIES`. Missing or unparseable values keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        Self {
            request_timeout: Duration::from_millis(millis(
                "ES_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )),
            ping_timeout: Duration::from_millis(millis("ES_PING_TIMEOUT", DEFAULT_PING_TIMEOUT_MS)),
            max_retries: lookup("ES_MAX_RETRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_RETRIES),
        }
    }
}

/// Configuration for a [`crate::ConnectionStore`]
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the connections file
    pub data_dir: PathBuf,
    /// Settings for clients built from stored profiles
    pub client: ClientSettings,
}

impl StoreConfig {
    /// Create a config rooted at `data_dir` with default client settings
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            client: ClientSettings::default(),
        }
    }

    /// Resolve the data directory and client settings from the environment
    ///
    /// Priority for the data directory:
    /// 1. `$ESM_HOME`
    /// 2. `$HOME/.esm` (`$USERPROFILE/.esm` on Windows)
    /// 3. The platform data directory
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            data_dir: default_data_dir(),
            client: ClientSettings::from_env(),
        }
    }

    /// Replace the client settings
    #[must_use]
    pub fn with_client_settings(mut self, client: ClientSettings) -> Self {
        self.client = client;
        self
    }

    /// Path of the persisted connection document
    #[must_use]
    pub fn connections_file(&self) -> PathBuf {
        self.data_dir.join(CONNECTIONS_FILE)
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ESM_HOME") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".esm");
    }

    dirs::data_dir()
        .map(|d| d.join("esm"))
        .unwrap_or_else(|| std::env::temp_dir().join("esm-data"))
}
