//! AES-256-GCM encryption for persisted credentials.
//!
//! Stored values are sealed with a random 96-bit nonce per write and kept as
//! a base64 string of the serialized [`EncryptedData`] envelope, so one
//! envelope format covers keychain entries and files alike.
//!
//! ```rust
//! use authtree_common::crypto::EncryptionService;
//!
//! let service = EncryptionService::new(EncryptionService::generate_key())?;
//! let sealed = service.encrypt_to_string(b"refresh-token")?;
//! assert_eq!(service.decrypt_from_string(&sealed)?, b"refresh-token");
//! # Ok::<(), authtree_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CommonError, CommonResult, CryptoOperation};

pub const ALGORITHM: &str = "AES-256-GCM";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Sealed payload as written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub algorithm: String,
}

/// AES-256-GCM cipher bound to one 32-byte key.
pub struct EncryptionService {
    key: Vec<u8>,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.key_fingerprint())
            .finish()
    }
}

impl EncryptionService {
    /// Create a service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::crypto(
                CryptoOperation::KeySetup,
                format!("key must be exactly {KEY_LEN} bytes, got {}", key.len()),
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CommonError::crypto(CryptoOperation::KeySetup, e.to_string()))?;
        Ok(Self { key, cipher })
    }

    /// Create a service from a base64-encoded key (as kept in a keychain).
    pub fn from_base64_key(encoded: &str) -> CommonResult<Self> {
        let key = BASE64
            .decode(encoded.trim())
            .map_err(|e| CommonError::crypto(CryptoOperation::KeySetup, e.to_string()))?;
        Self::new(key)
    }

    /// Random 32-byte key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    pub fn export_key_base64(&self) -> String {
        BASE64.encode(&self.key)
    }

    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce), data)
            .map_err(|e| CommonError::crypto(CryptoOperation::Encrypt, e.to_string()))?;

        Ok(EncryptedData { nonce: nonce.to_vec(), ciphertext, algorithm: ALGORITHM.to_string() })
    }

    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        if encrypted.algorithm != ALGORITHM {
            return Err(CommonError::crypto(
                CryptoOperation::Decrypt,
                format!("unsupported algorithm: {}", encrypted.algorithm),
            ));
        }
        let nonce: [u8; NONCE_LEN] = encrypted.nonce.as_slice().try_into().map_err(|_| {
            CommonError::crypto(CryptoOperation::Decrypt, "nonce must be 12 bytes")
        })?;

        self.cipher
            .decrypt(&Nonce::from(nonce), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::crypto(CryptoOperation::Decrypt, e.to_string()))
    }

    /// Encrypt and encode the envelope as base64 text.
    pub fn encrypt_to_string(&self, data: &[u8]) -> CommonResult<String> {
        let encrypted = self.encrypt(data)?;
        let serialized = serde_json::to_vec(&encrypted)?;
        Ok(BASE64.encode(serialized))
    }

    pub fn decrypt_from_string(&self, encoded: &str) -> CommonResult<Vec<u8>> {
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| CommonError::serialization("base64", e.to_string()))?;
        let encrypted: EncryptedData = serde_json::from_slice(&decoded)?;
        self.decrypt(&encrypted)
    }

    /// Short, non-reversible identifier of the key for log lines.
    pub fn key_fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.key);
        BASE64.encode(&digest[..8])
    }
}
