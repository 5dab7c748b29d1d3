//! Explicit runtime context shared by every engine.

use std::sync::Arc;

use authtree_common::time::{Clock, SystemClock};
use authtree_domain::{AuthConfig, CallbackRegistry, Result};
use chrono::{DateTime, Utc};

/// Validated configuration, callback registry and clock for one client.
///
/// Built once at startup and shared behind an `Arc`; nothing in the engines
/// reads process-wide state.
pub struct AuthContext {
    pub config: AuthConfig,
    pub registry: CallbackRegistry,
    pub clock: Arc<dyn Clock>,
}

impl AuthContext {
    pub fn new(config: AuthConfig) -> Result<Self> {
        Self::with_parts(config, CallbackRegistry::with_defaults(), Arc::new(SystemClock))
    }

    pub fn with_parts(
        config: AuthConfig,
        registry: CallbackRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, registry, clock })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Wall clock now, for token and cookie expiry.
    pub fn now_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.clock.system_time())
    }

    /// Storage key under the configured namespace.
    pub fn storage_key(&self, name: &str) -> String {
        self.config.store.key(name)
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
