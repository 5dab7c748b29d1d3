//! Configuration loader
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory (or a parent) is applied to the
//!    process environment, without overriding variables already set
//! 2. `AUTHTREE_*` environment variables are read
//! 3. If a required variable is missing, the standard config file locations
//!    are searched instead
//!
//! ## Environment Variables
//! Required:
//! - `AUTHTREE_URL`: server base URL, e.g. `https://am.example.com/am`
//! - `AUTHTREE_CLIENT_ID`: OAuth2 client id
//! - `AUTHTREE_REDIRECT_URI`: OAuth2 redirect URI
//!
//! Optional:
//! - `AUTHTREE_REALM` (default `root`)
//! - `AUTHTREE_TREE`: tree started by default
//! - `AUTHTREE_SCOPE`: space separated scopes
//! - `AUTHTREE_COOKIE_NAME` (default `iPlanetDirectoryPro`)
//! - `AUTHTREE_CACHE_INTERVAL_MS` (default `0`, cache disabled)
//! - `AUTHTREE_THRESHOLD_SECS` (default `30`)
//! - `AUTHTREE_SSO_ENABLED` (default `true`)
//! - `AUTHTREE_LOG_LEVEL` (default `info`)
//! - `AUTHTREE_LOG_FORMAT`: `pretty` or `json`
//!
//! ## File Locations
//! `authtree.toml`, `authtree.json`, `config.toml` and `config.json` are
//! looked up in the working directory and its two parents, then next to the
//! executable. The format follows the file extension.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use authtree_domain::{AuthConfig, AuthError, LogFormat, Result};

use crate::errors::InfraError;

const FILE_NAMES: [&str; 4] = ["authtree.toml", "authtree.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `AuthError::Config` if no source yields a valid configuration.
pub fn load() -> Result<AuthConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "applied .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `AUTHTREE_*` environment variables
///
/// # Errors
/// Returns `AuthError::Config` if a required variable is missing, a value
/// does not parse, or the result does not validate.
pub fn load_from_env() -> Result<AuthConfig> {
    let mut config = AuthConfig::default();

    config.server.url = env_var("AUTHTREE_URL")?;
    config.oauth2.client_id = env_var("AUTHTREE_CLIENT_ID")?;
    config.oauth2.redirect_uri = env_var("AUTHTREE_REDIRECT_URI")?;

    if let Some(realm) = env_opt("AUTHTREE_REALM") {
        config.server.realm = realm;
    }
    if let Some(cookie_name) = env_opt("AUTHTREE_COOKIE_NAME") {
        config.server.cookie_name = cookie_name;
    }
    if let Some(scope) = env_opt("AUTHTREE_SCOPE") {
        config.oauth2.scope = scope;
    }
    config.tree = env_opt("AUTHTREE_TREE");
    if let Some(interval) = env_parse::<u64>("AUTHTREE_CACHE_INTERVAL_MS")? {
        config.store.cache_interval_ms = interval;
    }
    if let Some(threshold) = env_parse::<u64>("AUTHTREE_THRESHOLD_SECS")? {
        config.store.threshold_secs = threshold;
    }
    config.store.sso_enabled = env_bool("AUTHTREE_SSO_ENABLED", true);
    if let Some(level) = env_opt("AUTHTREE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env_opt("AUTHTREE_LOG_FORMAT") {
        config.logging.format = parse_log_format(&format)?;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations.
///
/// # Errors
/// Returns `AuthError::Config` if the file is missing, does not parse, or
/// does not validate.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AuthConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthError::config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            AuthError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthError::config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AuthConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| AuthError::from(InfraError::from(e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthError::config(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.extend([exe_dir.to_path_buf(), exe_dir.join("..")]);
        }
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(AuthError::config(format!("Invalid log format: {other}"))),
    }
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key)
        .ok_or_else(|| AuthError::config(format!("Missing required environment variable: {key}")))
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| AuthError::config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
