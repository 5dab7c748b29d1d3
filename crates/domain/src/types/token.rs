//! Credential types.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::DEFAULT_TOKEN_TYPE;

/// OAuth2 scope set. Parsed from and rendered as a space separated string,
/// persisted as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(BTreeSet<String>);

impl Scope {
    pub fn parse(scope: &str) -> Self {
        Self(scope.split_whitespace().map(str::to_owned).collect())
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(" "))
    }
}

impl<S: Into<String>> FromIterator<S> for Scope {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Server session identifier returned by a completed tree.
#[derive(Clone, PartialEq, Eq)]
pub struct SsoToken {
    pub value: String,
    pub success_url: Option<String>,
    pub realm: Option<String>,
}

impl SsoToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), success_url: None, realm: None }
    }
}

impl fmt::Debug for SsoToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsoToken")
            .field("value", &"[REDACTED]")
            .field("success_url", &self.success_url)
            .field("realm", &self.realm)
            .finish()
    }
}

/// Body of a successful `/access_token` call.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth2 access token plus its companions.
///
/// `expiration` is stamped when the token is persisted
/// (`expiration = persist time + expires_in`), not when it is minted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub value: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub expiration: Option<DateTime<Utc>>,
    /// SSO token this access token was minted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

impl AccessToken {
    /// Build from a token endpoint response. `session_token` records the SSO
    /// token used for the exchange, if any.
    pub fn from_response(response: TokenResponse, session_token: Option<String>) -> Self {
        Self {
            value: response.access_token,
            token_type: response.token_type.unwrap_or_else(default_token_type),
            expires_in: response.expires_in.unwrap_or(0),
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            scope: response.scope.as_deref().map(Scope::parse).unwrap_or_default(),
            expiration: None,
            session_token,
        }
    }

    /// Set `expiration = now + expires_in`.
    pub fn stamp_expiration(&mut self, now: DateTime<Utc>) {
        self.expiration = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime));
    }

    /// True when the token expires within `threshold_secs` of `now`.
    /// A token that was never stamped is treated as expired.
    pub fn expires_within(&self, threshold_secs: u64, now: DateTime<Utc>) -> bool {
        let deadline = i64::try_from(threshold_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|threshold| now.checked_add_signed(threshold));
        match (self.expiration, deadline) {
            (Some(expiration), Some(deadline)) => expiration <= deadline,
            _ => true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_within(0, now)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Value for an `Authorization` header, e.g. `Bearer eyJ...`.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .field("expiration", &self.expiration)
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Claims returned by the `/userinfo` endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub sub: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub raw: Value,
}

impl From<Value> for UserInfo {
    fn from(raw: Value) -> Self {
        let claim = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_owned);
        Self { sub: claim("sub"), name: claim("name"), email: claim("email"), raw }
    }
}
