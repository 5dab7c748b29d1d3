//! Configuration structures
//!
//! Plain serde structs consumed by the loader in `authtree-infra`. Every
//! constructor validates its input, so a config handed to the engines has
//! already been checked.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    DEFAULT_CACHE_INTERVAL_MS, DEFAULT_COOKIE_NAME, DEFAULT_NAMESPACE, DEFAULT_REALM,
    DEFAULT_THRESHOLD_SECS, DEFAULT_TIMEOUT_SECS,
};
use crate::errors::{AuthError, Result};

/// Authentication server location and endpoint overrides.
///
/// Endpoint overrides are paths relative to `url`; when unset the
/// realm-scoped default path is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub realm: String,
    pub cookie_name: String,
    pub timeout_secs: u64,
    pub authenticate_endpoint: Option<String>,
    pub authorize_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub revoke_endpoint: Option<String>,
    pub session_endpoint: Option<String>,
    pub end_session_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            realm: DEFAULT_REALM.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            authenticate_endpoint: None,
            authorize_endpoint: None,
            token_endpoint: None,
            revoke_endpoint: None,
            session_endpoint: None,
            end_session_endpoint: None,
            userinfo_endpoint: None,
        }
    }
}

impl ServerConfig {
    /// Create a validated server config with default endpoints.
    pub fn new(url: impl Into<String>, realm: impl Into<String>) -> Result<Self> {
        let config = Self { url: url.into(), realm: realm.into(), ..Self::default() };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(AuthError::config("server url must not be empty"));
        }
        let parsed = Url::parse(&self.url)?;
        if parsed.cannot_be_a_base() {
            return Err(AuthError::config(format!("server url cannot be a base: {}", self.url)));
        }
        if self.realm.trim().is_empty() {
            return Err(AuthError::config("realm must not be empty"));
        }
        if self.cookie_name.trim().is_empty() {
            return Err(AuthError::config("cookie name must not be empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn authenticate_url(&self) -> Result<Url> {
        self.endpoint(
            self.authenticate_endpoint.as_deref(),
            &["json", "realms", "{realm}", "authenticate"],
        )
    }

    pub fn authorize_url(&self) -> Result<Url> {
        self.endpoint(
            self.authorize_endpoint.as_deref(),
            &["oauth2", "realms", "{realm}", "authorize"],
        )
    }

    pub fn token_url(&self) -> Result<Url> {
        self.endpoint(
            self.token_endpoint.as_deref(),
            &["oauth2", "realms", "{realm}", "access_token"],
        )
    }

    pub fn revoke_url(&self) -> Result<Url> {
        self.endpoint(
            self.revoke_endpoint.as_deref(),
            &["oauth2", "realms", "{realm}", "token", "revoke"],
        )
    }

    pub fn session_url(&self) -> Result<Url> {
        self.endpoint(self.session_endpoint.as_deref(), &["json", "realms", "{realm}", "sessions"])
    }

    pub fn end_session_url(&self) -> Result<Url> {
        self.endpoint(
            self.end_session_endpoint.as_deref(),
            &["oauth2", "realms", "{realm}", "connect", "endSession"],
        )
    }

    pub fn userinfo_url(&self) -> Result<Url> {
        self.endpoint(
            self.userinfo_endpoint.as_deref(),
            &["oauth2", "realms", "{realm}", "userinfo"],
        )
    }

    fn endpoint(&self, custom: Option<&str>, default_segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.url)?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                AuthError::config(format!("server url cannot be a base: {}", self.url))
            })?;
            segments.pop_if_empty();
            match custom.map(|path| path.trim_matches('/')).filter(|path| !path.is_empty()) {
                Some(path) => {
                    segments.extend(path.split('/'));
                }
                None => {
                    for segment in default_segments {
                        if *segment == "{realm}" {
                            segments.push(&self.realm);
                        } else {
                            segments.push(segment);
                        }
                    }
                }
            }
        }
        Ok(url)
    }
}

/// OAuth2 client registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OAuth2Config {
    pub client_id: String,
    pub redirect_uri: String,
    /// Space separated scope list.
    pub scope: String,
    pub sign_out_redirect_uri: Option<String>,
}

impl OAuth2Config {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: scope.into(),
            sign_out_redirect_uri: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::config("oauth2 client id must not be empty"));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthError::config("oauth2 redirect uri must not be empty"));
        }
        Url::parse(&self.redirect_uri)
            .map_err(|e| AuthError::config(format!("invalid redirect uri: {e}")))?;
        Ok(())
    }
}

/// Credential store behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long a read is served from memory before storage is consulted
    /// again. Zero disables the in-memory cache.
    pub cache_interval_ms: u64,
    /// Refresh an access token this many seconds before it expires.
    pub threshold_secs: u64,
    /// When false the SSO token store is always empty.
    pub sso_enabled: bool,
    /// Prefix for storage keys.
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_interval_ms: DEFAULT_CACHE_INTERVAL_MS,
            threshold_secs: DEFAULT_THRESHOLD_SECS,
            sso_enabled: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn cache_interval(&self) -> Duration {
        Duration::from_millis(self.cache_interval_ms)
    }

    pub fn key(&self, name: &str) -> String {
        format!("{}.{}", self.namespace, name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub server: ServerConfig,
    pub oauth2: OAuth2Config,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    /// Tree started by default when the caller does not name one.
    pub tree: Option<String>,
}

impl AuthConfig {
    pub fn new(server: ServerConfig, oauth2: OAuth2Config) -> Result<Self> {
        let config = Self { server, oauth2, ..Self::default() };
        config.validate()?;
        Ok(config)
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_tree(mut self, tree: impl Into<String>) -> Self {
        self.tree = Some(tree.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.oauth2.validate()?;
        if self.store.namespace.trim().is_empty() {
            return Err(AuthError::config("storage namespace must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerConfig {
        ServerConfig::new("https://am.example.com/am", "alpha").expect("server config")
    }

    #[test]
    fn default_endpoints_are_realm_scoped() {
        let server = server();

        assert_eq!(
            server.authenticate_url().unwrap().as_str(),
            "https://am.example.com/am/json/realms/alpha/authenticate"
        );
        assert_eq!(
            server.revoke_url().unwrap().as_str(),
            "https://am.example.com/am/oauth2/realms/alpha/token/revoke"
        );
        assert_eq!(
            server.end_session_url().unwrap().as_str(),
            "https://am.example.com/am/oauth2/realms/alpha/connect/endSession"
        );
    }

    #[test]
    fn endpoint_override_replaces_default_path() {
        let mut server = server();
        server.token_endpoint = Some("/custom/token/".into());

        assert_eq!(server.token_url().unwrap().as_str(), "https://am.example.com/am/custom/token");
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let server = ServerConfig::new("http://localhost:8080/", "root").unwrap();

        assert_eq!(
            server.session_url().unwrap().as_str(),
            "http://localhost:8080/json/realms/root/sessions"
        );
    }

    #[test]
    fn constructors_reject_missing_values() {
        assert!(matches!(ServerConfig::new("", "root"), Err(AuthError::Config(_))));
        assert!(matches!(ServerConfig::new("https://x", " "), Err(AuthError::Config(_))));
        assert!(matches!(
            OAuth2Config::new("", "https://app/cb", "openid"),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            OAuth2Config::new("client", "not a url", "openid"),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = concat!(
            r#"{"server":{"url":"https://am"},"#,
            r#""oauth2":{"client_id":"c","redirect_uri":"app://cb"}}"#
        );
        let config: AuthConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.server.realm, "root");
        assert_eq!(config.server.cookie_name, "iPlanetDirectoryPro");
        assert!(config.store.sso_enabled);
        assert_eq!(config.store.key("cookies"), "authtree.cookies");
        assert!(config.validate().is_ok());
    }
}
