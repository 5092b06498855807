//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads an optional `.env` file into the process environment
//! 2. Attempts to load from environment variables
//! 3. If `BATCHWIRE_CORE_URL` is missing, falls back to a config file
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `BATCHWIRE_CORE_URL`: Core service base URL (required)
//! - `BATCHWIRE_CORE_USERNAME` / `BATCHWIRE_CORE_PASSWORD`: Basic auth
//!   credentials
//! - `BATCHWIRE_HTTP_TIMEOUT_SECS`: Request timeout in seconds
//! - `BATCHWIRE_HTTP_MAX_ATTEMPTS`: Total connection attempts per request
//! - `BATCHWIRE_BATCH_FAILURE_POLICY`: `raise_on_commit`, `raise_on_access`
//!   or `never_raise`
//! - `BATCHWIRE_BATCH_VALIDATE`: Run local validation before commit
//!   (true/false)
//! - `BATCHWIRE_LOG_LEVEL`: Default log filter
//! - `BATCHWIRE_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader probes `config.{toml,json}` and `batchwire.{toml,json}` in the
//! current working directory, its parent, and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use batchwire_domain::{BatchwireError, ClientConfig, FailurePolicy, Result};
use tracing::{debug, info};

use crate::api::batch_endpoint;
use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 4] =
    ["config.toml", "config.json", "batchwire.toml", "batchwire.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `BatchwireError::Config` if configuration cannot be loaded from
/// either source or the resulting base URL is invalid.
pub fn load() -> Result<ClientConfig> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => debug!(error = %err, "ignoring unreadable .env file"),
    }

    if optional_env("BATCHWIRE_CORE_URL").is_none() {
        debug!("BATCHWIRE_CORE_URL not set, trying config file");
        return load_from_file(None);
    }

    let config = load_from_env()?;
    info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `BATCHWIRE_CORE_URL` is required; every other setting keeps its
/// default when unset.
///
/// # Errors
/// Returns `BatchwireError::Config` if the URL is missing or any variable
/// has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::for_base_url(env_var("BATCHWIRE_CORE_URL")?);

    config.core.username = optional_env("BATCHWIRE_CORE_USERNAME");
    config.core.password = optional_env("BATCHWIRE_CORE_PASSWORD");

    if let Some(timeout) = env_parse::<u64>("BATCHWIRE_HTTP_TIMEOUT_SECS")? {
        config.http.timeout_secs = timeout;
    }
    if let Some(attempts) = env_parse::<usize>("BATCHWIRE_HTTP_MAX_ATTEMPTS")? {
        config.http.max_attempts = attempts;
    }
    if let Some(policy) = env_parse::<FailurePolicy>("BATCHWIRE_BATCH_FAILURE_POLICY")? {
        config.batch.failure_policy = policy;
    }
    if let Some(validate) = env_bool("BATCHWIRE_BATCH_VALIDATE")? {
        config.batch.validate = validate;
    }

    if let Some(level) = optional_env("BATCHWIRE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env_bool("BATCHWIRE_LOG_JSON")? {
        config.logging.json = json;
    }

    validate(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by extension.
///
/// # Errors
/// Returns `BatchwireError::Config` if the file is missing, unreadable, or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) if !p.exists() => {
            return Err(BatchwireError::Config(format!("Config file not found: {}", p.display())));
        }
        Some(p) => p,
        None => probe_config_paths().ok_or_else(|| {
            BatchwireError::Config(
                "BATCHWIRE_CORE_URL is not set and no config file was found".to_string(),
            )
        })?,
    };

    info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BatchwireError::Config(format!("Failed to read config file: {}", e)))?;

    validate(parse_config(&contents, &config_path)?)
}

fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents).map_err(|e| {
            BatchwireError::Config(format!("Invalid JSON format: {}", e))
        }),
        _ => Err(BatchwireError::Config(format!("Unsupported config format: {}", extension))),
    }
}

fn validate(config: ClientConfig) -> Result<ClientConfig> {
    batch_endpoint(&config.core.base_url)?;
    if config.core.password.is_some() && config.core.username.is_none() {
        return Err(BatchwireError::Config("core password set without a username".to_string()));
    }
    Ok(config)
}

/// Probe the standard locations for a config file
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join(".."));
        dirs.insert(0, cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        BatchwireError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Value of `key`, treating an empty string as unset
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| BatchwireError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// An unset or empty variable yields `None`; any other spelling is rejected.
fn env_bool(key: &str) -> Result<Option<bool>> {
    optional_env(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(BatchwireError::Config(format!(
                "Invalid value for {}: expected a boolean, got '{}'",
                key, other
            ))),
        })
        .transpose()
}
