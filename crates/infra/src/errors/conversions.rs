//! Conversions from external infrastructure errors into domain errors.

use authtree_common::error::{CommonError, CryptoOperation};
use authtree_domain::{AuthError, StorageError};
use keyring::Error as KeyringError;
use reqwest::Error as HttpError;
use thiserror::Error;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(#[from] pub AuthError);

impl InfraError {
    /// The storage failure carried by this error. Anything that is not
    /// already a storage failure is reported as I/O.
    pub fn into_storage(self) -> StorageError {
        match self.0 {
            AuthError::Storage(err) => err,
            other => StorageError::Io(other.to_string()),
        }
    }
}

impl From<InfraError> for AuthError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(AuthError::Storage(value))
    }
}

trait IntoAuthError {
    fn into_auth(self) -> AuthError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → StorageError */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for KeyringError {
    fn into_auth(self) -> AuthError {
        let description = self.to_string();

        let storage = match self {
            KeyringError::NoEntry => StorageError::Io("keychain entry not found".into()),
            KeyringError::BadEncoding(_) => {
                StorageError::Corrupt("credential in keychain is not valid UTF-8".into())
            }
            KeyringError::TooLong(name, limit) => StorageError::Io(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            KeyringError::Invalid(attr, reason) => {
                StorageError::Io(format!("keychain attribute '{attr}' is invalid: {reason}"))
            }
            KeyringError::Ambiguous(entries) => StorageError::Io(format!(
                "multiple keychain entries matched request ({} results)",
                entries.len()
            )),
            // the platform store refused to seal or unseal the secret
            KeyringError::PlatformFailure(err) => {
                StorageError::Encryption(format!("keychain platform error: {err}"))
            }
            KeyringError::NoStorageAccess(err) => {
                StorageError::Io(format!("unable to access secure storage: {err}"))
            }
            _ => StorageError::Io(description),
        };
        AuthError::Storage(storage)
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_auth())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AuthError::Transport */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for HttpError {
    fn into_auth(self) -> AuthError {
        if self.is_timeout() {
            return AuthError::Transport("HTTP request timed out".into());
        }
        if self.is_connect() {
            return AuthError::Transport("HTTP connection failure".into());
        }
        if self.is_builder() {
            return AuthError::Transport(format!("invalid HTTP request: {self}"));
        }
        AuthError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_auth())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io / serde / toml */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(AuthError::Storage(StorageError::Io(value.to_string())))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(AuthError::Storage(StorageError::Corrupt(value.to_string())))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(AuthError::config(format!("invalid TOML: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* CommonError → StorageError */
/* -------------------------------------------------------------------------- */

impl From<CommonError> for InfraError {
    fn from(value: CommonError) -> Self {
        let storage = match &value {
            CommonError::Crypto { operation: CryptoOperation::Decrypt, .. } => {
                StorageError::Corrupt(value.to_string())
            }
            _ if value.is_transient() => StorageError::Encryption(value.to_string()),
            CommonError::Serialization { .. } => StorageError::Corrupt(value.to_string()),
            _ => StorageError::Io(value.to_string()),
        };
        InfraError(AuthError::Storage(storage))
    }
}
