//! Cookie jar engine

use std::sync::Arc;

use authtree_common::cache::TtlCache;
use authtree_common::time::Clock;
use authtree_domain::constants::COOKIES_KEY;
use authtree_domain::{AuthError, Cookie, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::context::AuthContext;
use crate::storage::{set_with_retry, SecureStorage};

/// Persistent cookie jar with a per-URL read cache.
///
/// Cookies are merged by `(name, domain, path)`. Mutations are serialized by
/// an async mutex and always invalidate the whole read cache, so a cached
/// answer never outlives the jar state it was computed from.
pub struct CookieJarEngine {
    context: Arc<AuthContext>,
    storage: Arc<dyn SecureStorage>,
    key: String,
    cache: TtlCache<String, Vec<Cookie>, Arc<dyn Clock>>,
    write_lock: Mutex<()>,
}

/// Jar contents as loaded, plus whether loading dropped anything.
struct Loaded {
    cookies: Vec<Cookie>,
    pruned: bool,
}

impl CookieJarEngine {
    pub fn new(context: Arc<AuthContext>, storage: Arc<dyn SecureStorage>) -> Self {
        let cache =
            TtlCache::with_clock(context.config.store.cache_interval(), Arc::clone(&context.clock));
        let key = context.storage_key(COOKIES_KEY);
        Self { context, storage, key, cache, write_lock: Mutex::new(()) }
    }

    /// Merge the `Set-Cookie` headers received from `url`.
    ///
    /// A cookie that arrives already expired deletes its stored counterpart
    /// and is not stored itself.
    pub async fn on_response(&self, url: &Url, set_cookie_headers: &[String]) -> Result<()> {
        if set_cookie_headers.is_empty() {
            return Ok(());
        }
        let now = self.context.now_utc();
        let _guard = self.write_lock.lock().await;
        let Loaded { mut cookies, pruned } = self.load(now).await?;
        let mut changed = pruned;

        for header in set_cookie_headers {
            let Some(cookie) = Cookie::parse(header, url, now) else {
                debug!(url = %url, "ignoring unusable Set-Cookie header");
                continue;
            };
            let key = cookie.key();
            let before = cookies.len();
            cookies.retain(|existing| existing.key() != key);
            changed |= cookies.len() != before;
            if !cookie.is_expired(now) {
                debug!(name = %cookie.name, domain = %cookie.domain, "storing cookie");
                cookies.push(cookie);
                changed = true;
            }
        }

        if changed {
            self.save(&cookies).await?;
        }
        Ok(())
    }

    /// Cookies to send with a request to `url`.
    ///
    /// Within the cache interval repeated calls for the same URL return the
    /// same `Arc`.
    pub async fn for_request(&self, url: &Url) -> Result<Arc<Vec<Cookie>>> {
        let cache_key = url.as_str().to_string();
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }
        let now = self.context.now_utc();
        let generation = self.cache.generation();
        let cookies = self.live_cookies(now).await?;
        let matching: Vec<Cookie> = cookies.into_iter().filter(|c| c.matches(url, now)).collect();
        Ok(self.cache.insert_if_generation(cache_key, matching, generation))
    }

    /// Every live cookie in the jar.
    pub async fn cookies(&self) -> Result<Vec<Cookie>> {
        self.live_cookies(self.context.now_utc()).await
    }

    /// Delete every cookie and drop cached answers.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let removed = self.storage.remove(&self.key).await;
        self.cache.clear();
        removed?;
        debug!("cookie jar cleared");
        Ok(())
    }

    /// Delete the cookies that would be sent to `url`, keeping the rest.
    pub async fn clear_for(&self, url: &Url) -> Result<usize> {
        let now = self.context.now_utc();
        let _guard = self.write_lock.lock().await;
        let Loaded { mut cookies, pruned } = self.load(now).await?;
        let before = cookies.len();
        cookies.retain(|cookie| !cookie.matches(url, now));
        let removed = before - cookies.len();
        if removed > 0 || pruned {
            self.save(&cookies).await?;
        }
        Ok(removed)
    }

    async fn live_cookies(&self, now: DateTime<Utc>) -> Result<Vec<Cookie>> {
        let loaded = self.load(now).await?;
        if loaded.pruned {
            let _guard = self.write_lock.lock().await;
            // re-read under the lock; a writer may have saved in between
            let fresh = self.load(now).await?;
            if fresh.pruned {
                self.save(&fresh.cookies).await?;
            }
            return Ok(fresh.cookies);
        }
        Ok(loaded.cookies)
    }

    async fn load(&self, now: DateTime<Utc>) -> Result<Loaded> {
        let Some(raw) = self.storage.get(&self.key).await? else {
            return Ok(Loaded { cookies: Vec::new(), pruned: false });
        };
        let entries = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "stored cookie jar is unreadable, discarding it");
                return Ok(Loaded { cookies: Vec::new(), pruned: true });
            }
        };
        let total = entries.len();
        let cookies: Vec<Cookie> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<Cookie>(entry).ok())
            .filter(|cookie| !cookie.is_expired(now))
            .collect();
        let pruned = cookies.len() != total;
        if pruned {
            debug!(pruned = total - cookies.len(), "pruning expired or unreadable cookies");
        }
        Ok(Loaded { cookies, pruned })
    }

    async fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let stored = if cookies.is_empty() {
            self.storage.remove(&self.key).await.map_err(AuthError::from)
        } else {
            let serialized = serde_json::to_string(cookies)
                .map_err(|e| AuthError::parse(format!("cannot serialize cookie jar: {e}")))?;
            set_with_retry(self.storage.as_ref(), &self.key, &serialized)
                .await
                .map_err(AuthError::from)
        };
        self.cache.clear();
        stored
    }
}

impl std::fmt::Debug for CookieJarEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJarEngine")
            .field("key", &self.key)
            .field("cache", &self.cache)
            .finish()
    }
}
