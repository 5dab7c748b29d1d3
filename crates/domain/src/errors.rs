//! Error types used throughout the authentication client
//!
//! Every failure surfaced to callers is an [`AuthError`]. The variants are
//! chosen so a caller can tell "fix your input and resubmit the same node"
//! from "start the tree over" from "not logged in" without inspecting
//! messages; see [`AuthError::recovery`].

use thiserror::Error;

use crate::callback::CallbackError;

/// A non-2xx response, with the body kept verbatim for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("HTTP {status}: {body}")]
pub struct ApiError {
    pub status: u16,
    pub body: String,
}

impl ApiError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    /// Parse the body as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// The OAuth2 `error` code carried in the body, if any.
    pub fn oauth_error(&self) -> Option<String> {
        self.json()?.get("error")?.as_str().map(str::to_owned)
    }
}

/// Failure of the `/authorize` leg of the PKCE exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeError {
    /// Non-3xx status or an `error` parameter on the redirect.
    #[error("authorize request failed: {0}")]
    Api(ApiError),

    /// Redirect did not carry what was expected (state mismatch, no code).
    #[error("authorize response rejected: {0}")]
    IllegalState(String),
}

/// Persistent storage failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("storage I/O failed: {0}")]
    Io(String),

    #[error("stored value is corrupt: {0}")]
    Corrupt(String),
}

/// Main error type for the authentication client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("unsupported callback type: {callback_type}")]
    UnsupportedCallback { callback_type: String },

    #[error("authentication failed: {0}")]
    Authentication(ApiError),

    #[error("authentication session timed out: {0}")]
    AuthenticationTimeout(ApiError),

    #[error("authentication session suspended: {0}")]
    SuspendedAuthSession(ApiError),

    #[error("API error: {0}")]
    Api(ApiError),

    #[error(transparent)]
    Authorize(AuthorizeError),

    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error("refresh grant rejected: {0}")]
    InvalidGrant(ApiError),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// What a caller should do after receiving an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Correct the input on the same node and submit it again.
    ResubmitNode,
    /// Start the tree from the beginning.
    RestartTree,
    /// No usable credential; the user has to sign in.
    SignIn,
    /// Transient; the same call may be attempted again later.
    Retry,
    /// Nothing the caller can do at runtime.
    Fatal,
}

impl AuthError {
    pub fn auth_required(reason: impl Into<String>) -> Self {
        Self::AuthRequired(reason.into())
    }

    pub fn illegal_state(reason: impl Into<String>) -> Self {
        Self::IllegalState(reason.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    /// Raw server response carried by the error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Authentication(e)
            | Self::AuthenticationTimeout(e)
            | Self::SuspendedAuthSession(e)
            | Self::Api(e)
            | Self::InvalidGrant(e)
            | Self::Authorize(AuthorizeError::Api(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_encryption_failure(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Encryption(_)))
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Authentication(_) => Recovery::ResubmitNode,
            Self::AuthenticationTimeout(_)
            | Self::SuspendedAuthSession(_)
            | Self::UnsupportedCallback { .. } => Recovery::RestartTree,
            Self::AuthRequired(_) | Self::InvalidGrant(_) => Recovery::SignIn,
            Self::Transport(_) | Self::Api(_) | Self::Cancelled => Recovery::Retry,
            Self::Authorize(_)
            | Self::IllegalState(_)
            | Self::Storage(_)
            | Self::Parse(_)
            | Self::Config(_) => Recovery::Fatal,
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl From<AuthorizeError> for AuthError {
    fn from(value: AuthorizeError) -> Self {
        Self::Authorize(value)
    }
}

impl From<StorageError> for AuthError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<CallbackError> for AuthError {
    fn from(value: CallbackError) -> Self {
        match value {
            CallbackError::Unsupported { callback_type } => {
                Self::UnsupportedCallback { callback_type }
            }
            other => Self::Parse(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

impl From<url::ParseError> for AuthError {
    fn from(value: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {value}"))
    }
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;
