//! Session manager

use std::sync::Arc;

use authtree_domain::{AccessToken, AuthError, Result, SsoToken};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cookies::CookieJarEngine;
use crate::credentials::{SsoStore, TokenStore};
use crate::oauth2::PkceOAuth2Exchanger;

/// Hands out access tokens backed by the stored SSO session.
///
/// An access token is only returned while it belongs to the current SSO
/// session; one minted from an earlier session is revoked and replaced.
pub struct SessionManager {
    tokens: Arc<TokenStore>,
    sso: Arc<SsoStore>,
    exchanger: Arc<PkceOAuth2Exchanger>,
    cookies: Option<Arc<CookieJarEngine>>,
    mint_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        tokens: Arc<TokenStore>,
        sso: Arc<SsoStore>,
        exchanger: Arc<PkceOAuth2Exchanger>,
    ) -> Self {
        Self { tokens, sso, exchanger, cookies: None, mint_lock: Mutex::new(()) }
    }

    /// Also clear `cookies` on logout.
    pub fn with_cookie_jar(mut self, cookies: Arc<CookieJarEngine>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn sso(&self) -> &Arc<SsoStore> {
        &self.sso
    }

    /// Store the SSO token of a completed tree and mint an access token
    /// from it.
    pub async fn establish(&self, sso_token: &SsoToken) -> Result<Arc<AccessToken>> {
        self.sso.persist(sso_token).await?;
        let _guard = self.mint_lock.lock().await;
        self.discard_foreign_token(sso_token).await?;
        self.mint(sso_token).await
    }

    /// A live access token for the current session.
    ///
    /// Order of preference: the stored token (refreshed if needed) when it
    /// belongs to the stored SSO session, then a token freshly minted from
    /// that SSO session. With neither, [`AuthError::AuthRequired`].
    pub async fn get_access_token(&self) -> Result<Arc<AccessToken>> {
        let sso = self.sso.get().await?;
        match self.tokens.get().await {
            Ok(token) if belongs_to(&token, sso.as_deref()) => return Ok(token),
            Ok(_) => debug!("stored access token belongs to another SSO session"),
            Err(AuthError::AuthRequired(reason)) if sso.is_none() => {
                return Err(AuthError::AuthRequired(reason));
            }
            Err(AuthError::AuthRequired(reason)) => debug!(%reason, "minting from SSO session"),
            Err(err) => return Err(err),
        }
        let Some(sso) = sso else {
            return Err(AuthError::auth_required("no SSO session to mint an access token from"));
        };

        let _guard = self.mint_lock.lock().await;
        // a concurrent caller may already have minted
        if let Some(token) = self.tokens.current().await? {
            let same_session = token.session_token.as_deref() == Some(sso.value.as_str());
            if same_session && !self.is_expiring(&token) {
                return Ok(token);
            }
        }
        self.discard_foreign_token(&sso).await?;
        self.mint(&sso).await
    }

    /// True when an SSO session or an unexpired access token is stored.
    pub async fn has_session(&self) -> Result<bool> {
        if self.sso.get().await?.is_some() {
            return Ok(true);
        }
        let now = self.now();
        Ok(self.tokens.current().await?.is_some_and(|token| !token.is_expired(now)))
    }

    /// Sign out locally and server-side.
    ///
    /// Local state (tokens, SSO token, cookies) is cleared first. The
    /// server-side revocations then run concurrently; their failures are
    /// logged and do not fail the logout. Cookies those calls set are
    /// cleared again afterwards. A local clearing failure is returned after
    /// the remote calls have been attempted.
    pub async fn logout(&self) -> Result<()> {
        let token = self.tokens.current().await.unwrap_or_else(|err| {
            warn!(error = %err, "cannot read access token for revocation");
            None
        });
        let sso = self.sso.get().await.unwrap_or_else(|err| {
            warn!(error = %err, "cannot read SSO token for logout");
            None
        });

        let mut local = Vec::with_capacity(3);
        local.push(self.tokens.clear().await);
        local.push(self.sso.clear().await);
        if let Some(cookies) = &self.cookies {
            local.push(cookies.clear().await);
        }

        let revoke_token = async {
            if let Some(token) = &token {
                if let Err(err) = self.tokens.revoke_remote(token).await {
                    warn!(error = %err, "access token revocation failed");
                }
            }
        };
        let revoke_sso = async {
            if let Some(sso) = &sso {
                if let Err(err) = self.exchanger.logout_session(sso).await {
                    warn!(error = %err, "SSO session logout failed");
                }
            }
        };
        futures::join!(revoke_token, revoke_sso);
        if let Some(cookies) = &self.cookies {
            local.push(cookies.clear().await);
        }
        info!(had_token = token.is_some(), had_sso = sso.is_some(), "signed out");

        local.into_iter().collect::<Result<Vec<()>>>().map(|_| ())
    }

    async fn mint(&self, sso: &SsoToken) -> Result<Arc<AccessToken>> {
        info!("exchanging SSO session for an access token");
        let token = self.exchanger.exchange(sso, &[]).await?;
        self.tokens.persist(token).await
    }

    /// Revoke a stored token minted from a different SSO session.
    /// Revocation is best effort.
    async fn discard_foreign_token(&self, sso: &SsoToken) -> Result<()> {
        let Some(token) = self.tokens.current().await? else {
            return Ok(());
        };
        if token.session_token.as_deref() == Some(sso.value.as_str()) {
            return Ok(());
        }
        if token.session_token.is_some() {
            warn!("discarding access token minted from a previous SSO session");
            if let Err(err) = self.tokens.revoke().await {
                warn!(error = %err, "revoking stale access token failed");
            }
        }
        self.tokens.clear().await
    }

    fn is_expiring(&self, token: &AccessToken) -> bool {
        let context = self.exchanger.context();
        token.expires_within(context.config.store.threshold_secs, context.now_utc())
    }

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.exchanger.context().now_utc()
    }
}

/// A token with no session token was not minted from SSO and is accepted
/// whatever the SSO state.
fn belongs_to(token: &AccessToken, sso: Option<&SsoToken>) -> bool {
    match (&token.session_token, sso) {
        (Some(session), Some(sso)) => *session == sso.value,
        _ => true,
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("tokens", &self.tokens)
            .field("sso", &self.sso)
            .finish_non_exhaustive()
    }
}
