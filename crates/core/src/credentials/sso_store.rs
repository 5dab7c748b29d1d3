//! SSO token store

use std::sync::Arc;

use authtree_common::cache::TtlCache;
use authtree_common::time::Clock;
use authtree_domain::constants::SSO_TOKEN_KEY;
use authtree_domain::{Result, SsoToken};
use tokio::sync::Mutex;
use tracing::debug;

use crate::context::AuthContext;
use crate::storage::{set_with_retry, SecureStorage};

/// Persists the SSO session token.
///
/// Only the raw token value is stored. With `sso_enabled = false` the store
/// is permanently empty and writes are dropped.
pub struct SsoStore {
    storage: Arc<dyn SecureStorage>,
    key: String,
    enabled: bool,
    cache: TtlCache<(), SsoToken, Arc<dyn Clock>>,
    write_lock: Mutex<()>,
}

impl SsoStore {
    pub fn new(context: &AuthContext, storage: Arc<dyn SecureStorage>) -> Self {
        let store = &context.config.store;
        Self {
            storage,
            key: context.storage_key(SSO_TOKEN_KEY),
            enabled: store.sso_enabled,
            cache: TtlCache::with_clock(store.cache_interval(), Arc::clone(&context.clock)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn persist(&self, token: &SsoToken) -> Result<()> {
        if !self.enabled {
            debug!("SSO store disabled, not persisting session token");
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        set_with_retry(self.storage.as_ref(), &self.key, &token.value).await?;
        self.cache.insert((), SsoToken::new(token.value.clone()));
        Ok(())
    }

    pub async fn get(&self) -> Result<Option<Arc<SsoToken>>> {
        if !self.enabled {
            return Ok(None);
        }
        if let Some(cached) = self.cache.get(&()) {
            return Ok(Some(cached));
        }
        let generation = self.cache.generation();
        let value = self.storage.get(&self.key).await?;
        Ok(value
            .filter(|v| !v.is_empty())
            .map(|v| self.cache.insert_if_generation((), SsoToken::new(v), generation)))
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let removed = self.storage.remove(&self.key).await;
        self.cache.clear();
        Ok(removed?)
    }
}

impl std::fmt::Debug for SsoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoStore")
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
