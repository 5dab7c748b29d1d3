//! Secure storage port and helpers shared by the credential stores.

pub mod memory;
pub mod ports;

pub use memory::InMemoryStorage;
pub use ports::SecureStorage;

use authtree_domain::StorageError;
use tracing::warn;

/// Write `value`, retrying exactly once when the first attempt fails with
/// [`StorageError::Encryption`]. Keystores can reject the first write after
/// key creation; any other failure, or a second encryption failure, is
/// returned as is.
pub async fn set_with_retry(
    storage: &dyn SecureStorage,
    key: &str,
    value: &str,
) -> Result<(), StorageError> {
    match storage.set(key, value).await {
        Err(StorageError::Encryption(reason)) => {
            warn!(key, reason = %reason, "encrypted write failed, retrying once");
            storage.set(key, value).await
        }
        other => other,
    }
}
