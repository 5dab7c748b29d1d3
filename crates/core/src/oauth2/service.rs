//! PKCE authorization-code exchange, refresh, revoke and session logout

use std::sync::Arc;

use authtree_common::auth::PkceChallenge;
use authtree_domain::constants::{
    ACCEPT_API_VERSION, AUTHORIZATION, AUTHORIZE_API_VERSION, INVALID_GRANT, LOCATION,
    SESSION_API_VERSION,
};
use authtree_domain::{
    AccessToken, ApiError, AuthError, AuthorizeError, Result, SsoToken, TokenResponse, UserInfo,
};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::context::AuthContext;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Turns an SSO session into OAuth2 tokens and manages their server-side
/// lifecycle. No call is retried here.
pub struct PkceOAuth2Exchanger {
    context: Arc<AuthContext>,
    transport: Arc<dyn HttpTransport>,
}

impl PkceOAuth2Exchanger {
    pub fn new(context: Arc<AuthContext>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { context, transport }
    }

    pub fn context(&self) -> &Arc<AuthContext> {
        &self.context
    }

    /// Run `/authorize` then `/access_token` with a fresh PKCE pair.
    ///
    /// `extra_params` are appended to the authorize query after the
    /// standard parameters. The returned token is not stamped with an
    /// expiration; that happens when it is persisted.
    pub async fn exchange(
        &self,
        sso_token: &SsoToken,
        extra_params: &[(String, String)],
    ) -> Result<AccessToken> {
        self.exchange_with(sso_token, &PkceChallenge::generate(), extra_params).await
    }

    /// [`exchange`](Self::exchange) with caller-supplied PKCE material.
    pub async fn exchange_with(
        &self,
        sso_token: &SsoToken,
        pkce: &PkceChallenge,
        extra_params: &[(String, String)],
    ) -> Result<AccessToken> {
        let code = self.authorize(sso_token, pkce, extra_params).await?;
        let oauth2 = &self.context.config.oauth2;
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("code_verifier", pkce.code_verifier.as_str()),
            ("client_id", oauth2.client_id.as_str()),
            ("redirect_uri", oauth2.redirect_uri.as_str()),
        ];
        let response = self.post_token(&form).await?;
        if !response.is_success() {
            warn!(status = response.status, "authorization code exchange failed");
            return Err(AuthError::Api(response.api_error()));
        }
        let token =
            AccessToken::from_response(parse_token(&response)?, Some(sso_token.value.clone()));
        info!(scope = %token.scope, expires_in = token.expires_in, "access token issued");
        Ok(token)
    }

    /// `/authorize` leg: returns the authorization code.
    async fn authorize(
        &self,
        sso_token: &SsoToken,
        pkce: &PkceChallenge,
        extra_params: &[(String, String)],
    ) -> Result<String> {
        let server = &self.context.config.server;
        let oauth2 = &self.context.config.oauth2;
        let mut url = server.authorize_url()?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &oauth2.client_id)
            .append_pair("redirect_uri", &oauth2.redirect_uri)
            .append_pair("scope", &oauth2.scope)
            .append_pair("state", &pkce.state)
            .append_pair("code_challenge", &pkce.code_challenge)
            .append_pair("code_challenge_method", pkce.challenge_method())
            .extend_pairs(extra_params);

        let request = HttpRequest::get(url.clone())
            .header(ACCEPT_API_VERSION, AUTHORIZE_API_VERSION)
            .header(server.cookie_name.as_str(), sso_token.value.as_str());
        let response = self.transport.execute(request).await?;

        if !response.is_redirect() {
            warn!(status = response.status, "authorize did not redirect");
            return Err(AuthorizeError::Api(response.api_error()).into());
        }
        let location = response
            .header(LOCATION)
            .ok_or_else(|| AuthorizeError::IllegalState("redirect has no Location header".into()))?;
        let redirect = url
            .join(location)
            .map_err(|e| AuthorizeError::IllegalState(format!("unparseable Location: {e}")))?;
        let param = |name: &str| {
            redirect.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
        };

        if let Some(error) = param("error") {
            warn!(status = response.status, error = %error, "authorize redirected with an error");
            let body = json!({ "error": error, "error_description": param("error_description") });
            let api = ApiError::new(response.status, body.to_string());
            return Err(AuthorizeError::Api(api).into());
        }
        if !pkce.state_matches(param("state").as_deref()) {
            warn!("authorize redirect state does not match the request");
            return Err(AuthorizeError::IllegalState("state mismatch".into()).into());
        }
        let code = param("code")
            .ok_or_else(|| AuthorizeError::IllegalState("redirect carries no code".into()))?;
        debug!("authorization code received");
        Ok(code)
    }

    /// Refresh `token`, keeping its refresh token when the server does not
    /// rotate it and the SSO token it was minted from.
    pub async fn refresh(&self, token: &AccessToken) -> Result<AccessToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::auth_required("access token has no refresh token"))?;
        let mut refreshed = self.refresh_grant(refresh_token).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = token.refresh_token.clone();
        }
        refreshed.session_token = token.session_token.clone();
        Ok(refreshed)
    }

    /// Raw `grant_type=refresh_token` call.
    ///
    /// A 400 carrying `invalid_grant` is [`AuthError::InvalidGrant`]: the
    /// refresh token is dead and only a new sign-in helps.
    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<AccessToken> {
        let oauth2 = &self.context.config.oauth2;
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", oauth2.client_id.as_str()),
            ("scope", oauth2.scope.as_str()),
        ];
        let response = self.post_token(&form).await?;
        if !response.is_success() {
            let error = response.api_error();
            warn!(status = error.status, "refresh grant failed");
            if error.status == 400 && error.oauth_error().as_deref() == Some(INVALID_GRANT) {
                return Err(AuthError::InvalidGrant(error));
            }
            return Err(AuthError::Api(error));
        }
        debug!("access token refreshed");
        Ok(AccessToken::from_response(parse_token(&response)?, None))
    }

    /// Revoke a refresh or access token at `/token/revoke`.
    pub async fn revoke(&self, token: &str, token_type_hint: Option<&str>) -> Result<()> {
        let mut form = vec![
            ("client_id", self.context.config.oauth2.client_id.as_str()),
            ("token", token),
        ];
        if let Some(hint) = token_type_hint {
            form.push(("token_type_hint", hint));
        }
        let request = HttpRequest::post(self.context.config.server.revoke_url()?).form(form);
        let response = self.transport.execute(request).await?;
        ensure_success(&response, "token revoke")
    }

    /// OIDC RP-initiated logout with the ID token.
    pub async fn end_session(&self, id_token: &str) -> Result<()> {
        let mut url = self.context.config.server.end_session_url()?;
        url.query_pairs_mut()
            .append_pair("id_token_hint", id_token)
            .append_pair("client_id", &self.context.config.oauth2.client_id);
        let response = self.transport.execute(HttpRequest::get(url)).await?;
        if response.is_redirect() {
            return Ok(());
        }
        ensure_success(&response, "end session")
    }

    /// Invalidate the SSO session server-side.
    pub async fn logout_session(&self, sso_token: &SsoToken) -> Result<()> {
        let server = &self.context.config.server;
        let mut url = server.session_url()?;
        url.query_pairs_mut().append_pair("_action", "logout");
        let request = HttpRequest::post(url)
            .header(ACCEPT_API_VERSION, SESSION_API_VERSION)
            .header(server.cookie_name.as_str(), sso_token.value.as_str())
            .json(json!({}));
        let response = self.transport.execute(request).await?;
        ensure_success(&response, "session logout")
    }

    pub async fn userinfo(&self, token: &AccessToken) -> Result<UserInfo> {
        let request = HttpRequest::get(self.context.config.server.userinfo_url()?)
            .header(AUTHORIZATION, token.authorization_header());
        let response = self.transport.execute(request).await?;
        ensure_success(&response, "userinfo")?;
        Ok(UserInfo::from(response.json()?))
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<HttpResponse> {
        let url: Url = self.context.config.server.token_url()?;
        let request = HttpRequest::post(url).form(form.iter().copied());
        self.transport.execute(request).await
    }
}

fn parse_token(response: &HttpResponse) -> Result<TokenResponse> {
    serde_json::from_str(&response.body)
        .map_err(|e| AuthError::parse(format!("invalid token response: {e}")))
}

fn ensure_success(response: &HttpResponse, operation: &str) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    warn!(status = response.status, operation, "request failed");
    Err(AuthError::Api(response.api_error()))
}
