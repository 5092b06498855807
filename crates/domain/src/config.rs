//! Configuration management

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BASE_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS};
use crate::types::FailurePolicy;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub core: CoreConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Configuration pointing at `base_url` with every other section
    /// defaulted.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            core: CoreConfig { base_url: base_url.into(), username: None, password: None },
            http: HttpConfig::default(),
            batch: BatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Core service connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Scheme, host and port of the core service, e.g. `http://localhost:8080/`
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outbound HTTP settings shared by every request to the core service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Total connection attempts per request (initial try + retries after a
    /// failed connect); a delivered request is never resent
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
        }
    }
}

/// Batcher defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub failure_policy: FailurePolicy,
    /// Run the local validation pass before submitting
    pub validate: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { failure_policy: FailurePolicy::default(), validate: true }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
