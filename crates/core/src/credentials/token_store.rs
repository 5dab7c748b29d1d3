//! Access token store

use std::sync::Arc;

use authtree_common::cache::TtlCache;
use authtree_common::time::Clock;
use authtree_domain::constants::ACCESS_TOKEN_KEY;
use authtree_domain::{AccessToken, AuthError, Result, StorageError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ports::AccessTokenVerifier;
use crate::context::AuthContext;
use crate::oauth2::PkceOAuth2Exchanger;
use crate::storage::{set_with_retry, SecureStorage};

/// Persists the access token and hands out a live one.
///
/// Reads within the configured cache interval return the same `Arc`.
/// A token expiring within the refresh threshold is refreshed before it is
/// returned; concurrent readers wait on one refresh instead of starting
/// their own. A token that cannot be refreshed is never returned.
pub struct TokenStore {
    context: Arc<AuthContext>,
    storage: Arc<dyn SecureStorage>,
    exchanger: Option<Arc<PkceOAuth2Exchanger>>,
    verifier: Option<Arc<dyn AccessTokenVerifier>>,
    key: String,
    cache: TtlCache<(), AccessToken, Arc<dyn Clock>>,
    write_lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(context: Arc<AuthContext>, storage: Arc<dyn SecureStorage>) -> Self {
        let cache =
            TtlCache::with_clock(context.config.store.cache_interval(), Arc::clone(&context.clock));
        let key = context.storage_key(ACCESS_TOKEN_KEY);
        Self {
            context,
            storage,
            exchanger: None,
            verifier: None,
            key,
            cache,
            write_lock: Mutex::new(()),
        }
    }

    /// Enable refresh through `exchanger`.
    pub fn with_exchanger(mut self, exchanger: Arc<PkceOAuth2Exchanger>) -> Self {
        self.exchanger = Some(exchanger);
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn AccessTokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Stamp `expiration = now + expires_in` and store the token.
    pub async fn persist(&self, token: AccessToken) -> Result<Arc<AccessToken>> {
        let _guard = self.write_lock.lock().await;
        self.write(token).await
    }

    /// A live access token, refreshed first when it is about to expire.
    ///
    /// Fails with [`AuthError::AuthRequired`] when there is no token or it
    /// expired and could not be refreshed.
    pub async fn get(&self) -> Result<Arc<AccessToken>> {
        let token = self.require().await?;
        if !self.needs_refresh(&token) {
            return Ok(token);
        }

        let _guard = self.write_lock.lock().await;
        // another caller may have refreshed while this one waited
        let token = self.require().await?;
        if !self.needs_refresh(&token) {
            debug!("reusing token refreshed by a concurrent caller");
            return Ok(token);
        }
        self.refresh_locked(&token).await
    }

    /// The stored token, live or not, without refreshing.
    pub async fn current(&self) -> Result<Option<Arc<AccessToken>>> {
        self.read().await
    }

    /// Forget the token locally.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.clear_locked().await
    }

    /// Clear locally, then revoke server-side.
    ///
    /// The local state is gone even when the remote call fails; the remote
    /// error is still returned.
    pub async fn revoke(&self) -> Result<()> {
        let token = {
            let _guard = self.write_lock.lock().await;
            let token = self.read().await?;
            self.clear_locked().await?;
            token
        };
        match token {
            Some(token) => self.revoke_remote(&token).await,
            None => Ok(()),
        }
    }

    /// Server-side half of [`revoke`](Self::revoke) for a token already
    /// cleared locally.
    ///
    /// Revokes the refresh token when there is one, the access token
    /// otherwise. A token with an ID token that was not minted from an SSO
    /// session also ends the OIDC session, whether or not the revoke
    /// succeeded. The first failure is returned.
    pub async fn revoke_remote(&self, token: &AccessToken) -> Result<()> {
        let Some(exchanger) = &self.exchanger else {
            debug!("no exchanger configured, skipping remote revoke");
            return Ok(());
        };
        let revoked = match token.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            Some(refresh_token) => exchanger.revoke(refresh_token, Some("refresh_token")).await,
            None => exchanger.revoke(&token.value, Some("access_token")).await,
        };
        let ended = match (&token.id_token, &token.session_token) {
            (Some(id_token), None) => exchanger.end_session(id_token).await,
            _ => Ok(()),
        };
        revoked.and(ended)?;
        info!("access token revoked");
        Ok(())
    }

    async fn refresh_locked(&self, token: &AccessToken) -> Result<Arc<AccessToken>> {
        let exchanger = match &self.exchanger {
            Some(exchanger) if token.has_refresh_token() => exchanger,
            _ => {
                return Err(AuthError::auth_required(
                    "access token expired and cannot be refreshed",
                ))
            }
        };
        info!("access token within refresh threshold, refreshing");
        match exchanger.refresh(token).await {
            Ok(refreshed) => self.write(refreshed).await,
            Err(AuthError::InvalidGrant(error)) => {
                warn!(status = error.status, "refresh token rejected, clearing access token");
                self.clear_locked().await?;
                Err(AuthError::auth_required(format!("refresh token rejected: {error}")))
            }
            Err(err) => {
                warn!(error = %err, "access token refresh failed");
                Err(AuthError::auth_required(format!("access token refresh failed: {err}")))
            }
        }
    }

    async fn require(&self) -> Result<Arc<AccessToken>> {
        let token =
            self.read().await?.ok_or_else(|| AuthError::auth_required("no access token stored"))?;
        if let Some(verifier) = &self.verifier {
            if !verifier.is_valid(&token) {
                debug!("stored access token rejected by verifier");
                return Err(AuthError::auth_required("access token rejected by verifier"));
            }
        }
        Ok(token)
    }

    fn needs_refresh(&self, token: &AccessToken) -> bool {
        token.expires_within(self.context.config.store.threshold_secs, self.context.now_utc())
    }

    async fn read(&self) -> Result<Option<Arc<AccessToken>>> {
        if let Some(cached) = self.cache.get(&()) {
            return Ok(Some(cached));
        }
        let generation = self.cache.generation();
        let Some(raw) = self.storage.get(&self.key).await? else {
            return Ok(None);
        };
        let token: AccessToken = serde_json::from_str(&raw)
            .map_err(|e| StorageError::Corrupt(format!("stored access token: {e}")))?;
        Ok(Some(self.cache.insert_if_generation((), token, generation)))
    }

    async fn write(&self, mut token: AccessToken) -> Result<Arc<AccessToken>> {
        token.stamp_expiration(self.context.now_utc());
        let serialized = serde_json::to_string(&token)
            .map_err(|e| AuthError::parse(format!("cannot serialize access token: {e}")))?;
        set_with_retry(self.storage.as_ref(), &self.key, &serialized).await?;
        debug!(expires_in = token.expires_in, "access token persisted");
        Ok(self.cache.insert((), token))
    }

    async fn clear_locked(&self) -> Result<()> {
        let removed = self.storage.remove(&self.key).await;
        // after the remove, so a read that loaded the old value cannot cache it
        self.cache.clear();
        Ok(removed?)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("key", &self.key)
            .field("refresh", &self.exchanger.is_some())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for credentials::token_store.
    use std::time::Duration;

    use authtree_common::time::{MockClock, SystemClock};
    use authtree_domain::{CallbackRegistry, StoreConfig, TokenResponse};
    use futures::future::join_all;

    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::test_support::{config, context_with, token_json, ScriptedTransport};
    use crate::transport::{HttpResponse, Method};

    fn token(value: &str, expires_in: i64) -> AccessToken {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": value,
            "refresh_token": format!("{value}-refresh"),
            "expires_in": expires_in,
            "scope": "openid email",
        }))
        .unwrap();
        AccessToken::from_response(response, None)
    }

    struct Fixture {
        store: TokenStore,
        storage: Arc<InMemoryStorage>,
        transport: Arc<ScriptedTransport>,
        clock: MockClock,
    }

    fn fixture(store: StoreConfig, transport: ScriptedTransport) -> Fixture {
        let clock = MockClock::new();
        let context = context_with(store, &clock);
        let storage = Arc::new(InMemoryStorage::new());
        let transport = Arc::new(transport);
        let exchanger = Arc::new(PkceOAuth2Exchanger::new(Arc::clone(&context), transport.clone()));
        let store = TokenStore::new(context, storage.clone()).with_exchanger(exchanger);
        Fixture { store, storage, transport, clock }
    }

    fn store_config(cache_interval_ms: u64, threshold_secs: u64) -> StoreConfig {
        StoreConfig { cache_interval_ms, threshold_secs, ..StoreConfig::default() }
    }

    /// Validates cache coherence across the cache interval.
    ///
    /// Assertions:
    /// - Ensures two reads inside the interval are reference-equal.
    /// - Ensures reads straddling the interval are not.
    #[tokio::test]
    async fn test_reads_within_interval_are_reference_equal() {
        let f = fixture(store_config(1000, 30), ScriptedTransport::new());
        f.store.persist(token("at-1", 3600)).await.unwrap();
        f.clock.advance_millis(1000);

        let first = f.store.get().await.unwrap();
        let second = f.store.get().await.unwrap();
        f.clock.advance_millis(1001);
        let third = f.store.get().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(*second, *third);
    }

    /// Validates refresh at the threshold with real time passing.
    ///
    /// Assertions:
    /// - Ensures a token with `expires_in=1` read after 2s with a 1s
    ///   threshold comes back refreshed with a new value.
    #[tokio::test]
    async fn test_refresh_after_threshold_real_time() {
        let context = AuthContext::with_parts(
            config(store_config(0, 1)),
            CallbackRegistry::with_defaults(),
            Arc::new(SystemClock),
        )
        .unwrap()
        .shared();
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(Method::Post, "/access_token", token_json("at-2", 3600));
        let exchanger = Arc::new(PkceOAuth2Exchanger::new(Arc::clone(&context), transport.clone()));
        let store =
            TokenStore::new(context, Arc::new(InMemoryStorage::new())).with_exchanger(exchanger);
        let before = store.persist(token("at-1", 1)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let after = store.get().await.unwrap();

        assert_ne!(after.value, before.value);
        assert_eq!(after.value, "at-2");
        assert_eq!(transport.count("/access_token"), 1);
    }

    /// Validates that concurrent readers share one refresh.
    ///
    /// Assertions:
    /// - Ensures exactly one refresh call for eight concurrent `get`s.
    /// - Ensures every caller sees the refreshed token.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_gets_coalesce_refresh() {
        let transport = ScriptedTransport::new().with_delay(Duration::from_millis(50));
        transport.on(Method::Post, "/access_token", token_json("at-2", 3600));
        let f = fixture(store_config(0, 30), transport);
        f.store.persist(token("at-1", 10)).await.unwrap();
        let store = Arc::new(f.store);

        let results = join_all((0..8).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get().await })
        }))
        .await;

        for result in results {
            assert_eq!(result.unwrap().unwrap().value, "at-2");
        }
        assert_eq!(f.transport.count("/access_token"), 1);
    }

    /// Validates a rejected refresh token.
    ///
    /// Assertions:
    /// - Ensures `invalid_grant` clears the store and surfaces `AuthRequired`.
    #[tokio::test]
    async fn test_invalid_grant_clears_store() {
        let transport = ScriptedTransport::new();
        let invalid_grant = HttpResponse::new(400, r#"{"error":"invalid_grant"}"#);
        transport.on(Method::Post, "/access_token", invalid_grant);
        let f = fixture(store_config(0, 30), transport);
        f.store.persist(token("at-1", 10)).await.unwrap();

        let err = f.store.get().await.unwrap_err();

        assert!(matches!(err, AuthError::AuthRequired(_)));
        assert!(f.store.current().await.unwrap().is_none());
    }

    /// Validates that a stale token is never returned.
    ///
    /// Assertions:
    /// - Ensures a server error during refresh surfaces `AuthRequired`.
    /// - Ensures a token without refresh token surfaces `AuthRequired`.
    #[tokio::test]
    async fn test_failed_refresh_never_returns_stale_token() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Post, "/access_token", HttpResponse::new(500, "down"));
        let f = fixture(store_config(0, 30), transport);
        f.store.persist(token("at-1", 10)).await.unwrap();
        assert!(matches!(f.store.get().await, Err(AuthError::AuthRequired(_))));

        let mut no_refresh = token("at-1", 10);
        no_refresh.refresh_token = None;
        f.store.persist(no_refresh).await.unwrap();
        assert!(matches!(f.store.get().await, Err(AuthError::AuthRequired(_))));
    }

    /// Validates the single encryption retry on persist.
    ///
    /// Assertions:
    /// - Ensures one encryption failure is absorbed.
    /// - Ensures a second consecutive failure is surfaced as a storage error.
    #[tokio::test]
    async fn test_persist_retries_encryption_once() {
        let f = fixture(store_config(0, 30), ScriptedTransport::new());

        f.storage.fail_next_writes(1);
        f.store.persist(token("at-1", 3600)).await.unwrap();

        f.storage.fail_next_writes(2);
        let err = f.store.persist(token("at-2", 3600)).await.unwrap_err();
        assert!(err.is_encryption_failure());
        assert_eq!(f.store.get().await.unwrap().value, "at-1");
    }

    #[tokio::test]
    async fn test_persist_stamps_expiration() {
        let f = fixture(store_config(0, 30), ScriptedTransport::new());

        let stored = f.store.persist(token("at-1", 3600)).await.unwrap();

        let expected = f.store.context.now_utc() + chrono::Duration::seconds(3600);
        let drift = (expected - stored.expiration.unwrap()).num_seconds().abs();
        assert!(drift <= 1);
    }

    #[tokio::test]
    async fn test_verifier_rejects_token() {
        let f = fixture(store_config(0, 30), ScriptedTransport::new());
        let store = f.store.with_verifier(Arc::new(|t: &AccessToken| t.value != "revoked"));
        store.persist(token("revoked", 3600)).await.unwrap();

        assert!(matches!(store.get().await, Err(AuthError::AuthRequired(_))));
    }

    /// Validates revoke ordering and target.
    ///
    /// Assertions:
    /// - Ensures local state is cleared even when the remote call fails.
    /// - Ensures the refresh token is what gets revoked.
    #[tokio::test]
    async fn test_revoke_clears_locally_first() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Post, "/token/revoke", HttpResponse::new(503, "unavailable"));
        let f = fixture(store_config(0, 30), transport);
        f.store.persist(token("at-1", 3600)).await.unwrap();

        let result = f.store.revoke().await;

        assert!(result.is_err());
        assert!(f.store.current().await.unwrap().is_none());
        assert!(!f.storage.contains("authtree.access_token"));
        let request = f.transport.last("/token/revoke").unwrap();
        assert_eq!(request.form_value("token"), Some("at-1-refresh"));
    }

    #[tokio::test]
    async fn test_revoke_ends_oidc_session_without_sso() {
        let transport = ScriptedTransport::new();
        transport
            .on(Method::Post, "/token/revoke", HttpResponse::new(200, "{}"))
            .on(Method::Get, "/endSession", HttpResponse::new(204, ""));
        let f = fixture(store_config(0, 30), transport);
        let mut with_id = token("at-1", 3600);
        with_id.id_token = Some("id-1".into());
        f.store.persist(with_id).await.unwrap();

        f.store.revoke().await.unwrap();

        assert_eq!(f.transport.count("/endSession"), 1);
    }

    /// Validates that a failed revoke does not skip ending the OIDC session.
    ///
    /// Assertions:
    /// - Ensures `endSession` is still called.
    /// - Ensures the revoke failure is the error returned.
    #[tokio::test]
    async fn test_failed_revoke_still_ends_oidc_session() {
        let transport = ScriptedTransport::new();
        transport
            .on(Method::Post, "/token/revoke", HttpResponse::new(503, "unavailable"))
            .on(Method::Get, "/endSession", HttpResponse::new(204, ""));
        let f = fixture(store_config(0, 30), transport);
        let mut with_id = token("at-1", 3600);
        with_id.id_token = Some("id-1".into());
        f.store.persist(with_id).await.unwrap();

        let err = f.store.revoke().await.unwrap_err();

        assert_eq!(f.transport.count("/endSession"), 1);
        assert!(matches!(err, AuthError::Api(ref api) if api.status == 503), "{err:?}");
    }

    /// Validates that a read overlapping `clear` cannot repopulate the cache.
    ///
    /// Assertions:
    /// - Ensures the read that loaded before `clear` still completes.
    /// - Ensures the cleared token is not served afterwards.
    #[tokio::test]
    async fn test_read_racing_clear_does_not_cache_cleared_token() {
        let clock = MockClock::new();
        let storage = Arc::new(crate::test_support::GatedStorage::new());
        let context = context_with(store_config(1000, 30), &clock);
        let store = Arc::new(TokenStore::new(context, storage.clone()));
        store.persist(token("at-1", 3600)).await.unwrap();
        clock.advance_millis(1000);

        storage.arm();
        let reader = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.current().await }
        });
        storage.wait_loaded().await;
        store.clear().await.unwrap();
        storage.release();

        assert_eq!(reader.await.unwrap().unwrap().unwrap().value, "at-1");
        assert!(store.current().await.unwrap().is_none());
    }
}
