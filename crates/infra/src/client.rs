//! Composition root
//!
//! Wires transport, storage, cookie jar, credential stores, the PKCE
//! exchanger and the session manager around one [`AuthContext`].

use std::sync::Arc;

use authtree_core::cookies::{CookieJarEngine, CookieTransport};
use authtree_core::credentials::{SsoStore, TokenStore};
use authtree_core::journey::{AuthTreeEngine, TreeWalk};
use authtree_core::oauth2::PkceOAuth2Exchanger;
use authtree_core::session::SessionManager;
use authtree_core::storage::SecureStorage;
use authtree_core::transport::HttpTransport;
use authtree_core::AuthContext;
use authtree_domain::{AccessToken, AuthConfig, NextStep, Node, PolicyAdvice, Result, UserInfo};
use tracing::info;
use url::Url;

use crate::http::ReqwestTransport;
use crate::storage::KeychainStorage;

/// Client for one authentication server and OAuth2 registration.
pub struct AuthClient {
    context: Arc<AuthContext>,
    engine: Arc<AuthTreeEngine>,
    exchanger: Arc<PkceOAuth2Exchanger>,
    cookies: Arc<CookieJarEngine>,
    session: Arc<SessionManager>,
}

impl AuthClient {
    /// Reqwest transport and keychain storage under the configured
    /// namespace.
    pub fn from_config(config: AuthConfig) -> Result<Self> {
        let storage = Arc::new(KeychainStorage::new(config.store.namespace.clone()));
        Self::with_storage(config, storage)
    }

    /// Reqwest transport with the caller's storage.
    pub fn with_storage(config: AuthConfig, storage: Arc<dyn SecureStorage>) -> Result<Self> {
        let transport = ReqwestTransport::builder()
            .timeout(config.server.timeout())
            .user_agent(concat!("authtree/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_parts(AuthContext::new(config)?.shared(), Arc::new(transport), storage)
    }

    /// Assemble from explicit parts. Every request goes through the cookie
    /// jar in front of `transport`.
    pub fn with_parts(
        context: Arc<AuthContext>,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn SecureStorage>,
    ) -> Result<Self> {
        let cookies = Arc::new(CookieJarEngine::new(Arc::clone(&context), Arc::clone(&storage)));
        let transport: Arc<dyn HttpTransport> =
            Arc::new(CookieTransport::new(transport, Arc::clone(&cookies)));

        let engine = Arc::new(AuthTreeEngine::new(Arc::clone(&context), Arc::clone(&transport)));
        let exchanger = Arc::new(PkceOAuth2Exchanger::new(Arc::clone(&context), transport));
        let tokens = Arc::new(
            TokenStore::new(Arc::clone(&context), Arc::clone(&storage))
                .with_exchanger(Arc::clone(&exchanger)),
        );
        let sso = Arc::new(SsoStore::new(&context, storage));
        let session = Arc::new(
            SessionManager::new(tokens, sso, Arc::clone(&exchanger))
                .with_cookie_jar(Arc::clone(&cookies)),
        );

        info!(
            server = %context.config.server.url,
            realm = %context.config.server.realm,
            client_id = %context.config.oauth2.client_id,
            "auth client ready"
        );
        Ok(Self { context, engine, exchanger, cookies, session })
    }

    pub fn context(&self) -> &Arc<AuthContext> {
        &self.context
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn exchanger(&self) -> &Arc<PkceOAuth2Exchanger> {
        &self.exchanger
    }

    pub fn cookie_jar(&self) -> &Arc<CookieJarEngine> {
        &self.cookies
    }

    /// A new walk over this client's tree engine.
    pub fn walk(&self) -> TreeWalk {
        TreeWalk::new(Arc::clone(&self.engine))
    }

    /// Start `tree`, or the configured default tree when `None`.
    ///
    /// A tree that completes immediately stores its SSO token.
    pub async fn start_tree(&self, tree: Option<&str>) -> Result<NextStep> {
        let step = match tree {
            Some(tree) => self.engine.start(tree).await?,
            None => self.engine.start_default().await?,
        };
        self.record(step).await
    }

    pub async fn start_with_advice(&self, advice: &PolicyAdvice) -> Result<NextStep> {
        let step = self.engine.start_with_advice(advice).await?;
        self.record(step).await
    }

    /// Continue a suspended tree from its resume link.
    pub async fn resume(&self, resume_uri: &Url) -> Result<NextStep> {
        let step = self.engine.resume(resume_uri).await?;
        self.record(step).await
    }

    /// Submit `node`; a success stores the SSO token.
    pub async fn next(&self, node: &Node) -> Result<NextStep> {
        let step = self.engine.next(node).await?;
        self.record(step).await
    }

    pub async fn access_token(&self) -> Result<Arc<AccessToken>> {
        self.session.get_access_token().await
    }

    pub async fn userinfo(&self) -> Result<UserInfo> {
        let token = self.session.get_access_token().await?;
        self.exchanger.userinfo(&token).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await
    }

    async fn record(&self, step: NextStep) -> Result<NextStep> {
        if let NextStep::Success(sso) = &step {
            self.session.sso().persist(sso).await?;
        }
        Ok(step)
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("server", &self.context.config.server.url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
