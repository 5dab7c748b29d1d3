//! Tracing bootstrap
//!
//! Installs the global `tracing` subscriber once per process. The filter
//! comes from `RUST_LOG` when set, otherwise from the configured level.

use authtree_domain::{AuthError, LogFormat, LoggingConfig, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber described by `config`.
///
/// Returns `Ok(true)` when this call installed it and `Ok(false)` when a
/// subscriber was already installed, so libraries and tests can call it
/// freely.
///
/// # Errors
/// Returns `AuthError::Config` when the configured level is not a valid
/// filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| AuthError::config(format!("invalid log level '{}': {e}", config.level)))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match config.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    };

    if installed {
        tracing::debug!(level = %config.level, format = ?config.format, "tracing initialised");
    }
    Ok(installed)
}
