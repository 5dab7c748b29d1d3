//! [`SecureStorage`](authtree_core::storage::SecureStorage) adapters.
//!
//! - [`KeychainStorage`]: one platform keychain entry per key
//! - [`EncryptedFileStorage`]: every key of a namespace in one AES-256-GCM
//!   sealed file

pub mod encrypted_file;
pub mod keychain;

pub use encrypted_file::EncryptedFileStorage;
pub use keychain::{KeyManager, KeychainStorage};
