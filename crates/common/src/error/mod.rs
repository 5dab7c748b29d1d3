//! Error types for the shared primitives
//!
//! Only the cipher and task-handle failures live here. Authentication
//! failures belong to `authtree_domain::AuthError`; callers convert a
//! [`CommonError`] at the seam where they touch these primitives.

use std::fmt;

use thiserror::Error;

/// Result alias used across this crate.
pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Key setup, encryption or decryption failed.
    #[error("crypto failure during {operation}: {message}")]
    Crypto { operation: CryptoOperation, message: String },

    /// Payload could not be encoded or decoded.
    #[error("serialization failure ({format}): {message}")]
    Serialization { format: &'static str, message: String },

    /// The task behind a pending result was cancelled or dropped.
    #[error("task cancelled")]
    Cancelled,
}

/// Which cipher step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoOperation {
    KeySetup,
    Encrypt,
    Decrypt,
}

impl fmt::Display for CryptoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeySetup => "key setup",
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
        };
        f.write_str(name)
    }
}

impl CommonError {
    pub fn crypto(operation: CryptoOperation, message: impl Into<String>) -> Self {
        Self::Crypto { operation, message: message.into() }
    }

    pub fn serialization(format: &'static str, message: impl Into<String>) -> Self {
        Self::Serialization { format, message: message.into() }
    }

    /// True for failures an immediate retry may clear (cipher setup and
    /// encryption; a failed decrypt means the payload or key is wrong).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Crypto { operation: CryptoOperation::KeySetup | CryptoOperation::Encrypt, .. }
        )
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("JSON", err.to_string())
    }
}
