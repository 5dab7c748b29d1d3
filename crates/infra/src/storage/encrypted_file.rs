//! AES-256-GCM sealed file storage

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use authtree_common::crypto::EncryptionService;
use authtree_core::storage::SecureStorage;
use authtree_domain::StorageError;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::InfraError;

const FILE_EXTENSION: &str = "enc";

/// Every key of one namespace, sealed together in a single file.
///
/// The whole map is re-encrypted on each write with a fresh nonce and
/// replaced atomically through a temporary file.
pub struct EncryptedFileStorage {
    path: PathBuf,
    cipher: Arc<EncryptionService>,
    write_lock: Mutex<()>,
}

type Entries = BTreeMap<String, String>;

impl EncryptedFileStorage {
    /// Storage for `namespace` inside `dir`, sealed with `cipher`.
    pub fn new(dir: impl AsRef<Path>, namespace: &str, cipher: Arc<EncryptionService>) -> Self {
        let path = dir.as_ref().join(format!("{namespace}.{FILE_EXTENSION}"));
        Self { path, cipher, write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries, StorageError> {
        let sealed = match tokio::fs::read_to_string(&self.path).await {
            Ok(sealed) => sealed,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(err) => return Err(InfraError::from(err).into_storage()),
        };
        let plain = self
            .cipher
            .decrypt_from_string(sealed.trim())
            .map_err(|e| InfraError::from(e).into_storage())?;
        serde_json::from_slice(&plain).map_err(|e| InfraError::from(e).into_storage())
    }

    async fn store(&self, entries: &Entries) -> Result<(), StorageError> {
        if entries.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(InfraError::from(err).into_storage()),
            };
        }
        let plain = serde_json::to_vec(entries).map_err(|e| InfraError::from(e).into_storage())?;
        let sealed = self
            .cipher
            .encrypt_to_string(&plain)
            .map_err(|e| InfraError::from(e).into_storage())?;

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| InfraError::from(e).into_storage())?;
        }
        let staging = self.path.with_extension(format!("{FILE_EXTENSION}.tmp"));
        tokio::fs::write(&staging, sealed).await.map_err(|e| InfraError::from(e).into_storage())?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| InfraError::from(e).into_storage())?;
        debug!(path = %self.path.display(), entries = entries.len(), "sealed storage written");
        Ok(())
    }
}

#[async_trait]
impl SecureStorage for EncryptedFileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.store(&entries).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EncryptedFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStorage").field("path", &self.path).finish_non_exhaustive()
    }
}
