//! Platform keychain storage and file-key management

use async_trait::async_trait;
use authtree_common::crypto::EncryptionService;
use authtree_core::storage::SecureStorage;
use authtree_domain::StorageError;
use keyring::{Entry, Error as KeyringError};
use tracing::{debug, info};

use crate::errors::InfraError;

const DEFAULT_SERVICE: &str = "com.authtree.client";
const FILE_KEY_NAME: &str = "file_encryption_key";

/// Stores each key as its own entry under one keychain service.
#[derive(Debug, Clone)]
pub struct KeychainStorage {
    service: String,
}

impl KeychainStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Entry::new(&self.service, key).map_err(|e| InfraError::from(e).into_storage())
    }
}

impl Default for KeychainStorage {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

/// Run a blocking keychain call off the async worker threads.
async fn blocking<T, F>(call: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| StorageError::Io(format!("keychain task failed: {e}")))?
}

#[async_trait]
impl SecureStorage for KeychainStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entry = self.entry(key)?;
        blocking(move || match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(err) => Err(InfraError::from(err).into_storage()),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let entry = self.entry(key)?;
        let value = value.to_string();
        blocking(move || entry.set_password(&value).map_err(|e| InfraError::from(e).into_storage()))
            .await?;
        debug!(service = %self.service, key, "keychain entry written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let entry = self.entry(key)?;
        blocking(move || match entry.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
            Err(err) => Err(InfraError::from(err).into_storage()),
        })
        .await
    }
}

/// Keeps the file-storage encryption key in the keychain.
pub struct KeyManager;

impl KeyManager {
    /// Load the key stored under `service`, generating and storing a new one
    /// on first use.
    pub fn get_or_create_key(service: &str) -> Result<EncryptionService, StorageError> {
        let entry =
            Entry::new(service, FILE_KEY_NAME).map_err(|e| InfraError::from(e).into_storage())?;

        match entry.get_password() {
            Ok(encoded) => EncryptionService::from_base64_key(&encoded)
                .map_err(|e| InfraError::from(e).into_storage()),
            Err(KeyringError::NoEntry) => {
                let cipher = EncryptionService::new(EncryptionService::generate_key())
                    .map_err(|e| InfraError::from(e).into_storage())?;
                entry
                    .set_password(&cipher.export_key_base64())
                    .map_err(|e| InfraError::from(e).into_storage())?;
                let fingerprint = cipher.key_fingerprint();
                info!(service, fingerprint = %fingerprint, "generated file encryption key");
                Ok(cipher)
            }
            Err(err) => Err(InfraError::from(err).into_storage()),
        }
    }

    /// Delete the stored key. Files sealed with it become unreadable.
    pub fn delete_key(service: &str) -> Result<(), StorageError> {
        let entry =
            Entry::new(service, FILE_KEY_NAME).map_err(|e| InfraError::from(e).into_storage())?;
        match entry.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
            Err(err) => Err(InfraError::from(err).into_storage()),
        }
    }
}
