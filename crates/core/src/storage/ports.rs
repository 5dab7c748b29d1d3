//! Port interface for at-rest credential storage

use async_trait::async_trait;
use authtree_domain::StorageError;

/// String key/value store that encrypts at rest.
///
/// Stores only see plaintext JSON or raw token strings; the cipher is the
/// implementation's concern.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
