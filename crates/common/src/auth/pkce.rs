//! PKCE (Proof Key for Code Exchange) for OAuth 2.0 public clients
//!
//! Implements RFC 7636 with the `S256` method: the verifier stays on the
//! client, the hashed challenge goes to `/authorize`, and the verifier is
//! revealed only to `/access_token`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind a code verifier; 64 bytes encode to 86 characters.
const VERIFIER_BYTES: usize = 64;
const STATE_BYTES: usize = 32;

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically secure code verifier (86 url-safe chars,
/// within the 43-128 range RFC 7636 allows).
pub fn generate_code_verifier() -> String {
    random_url_safe(VERIFIER_BYTES)
}

/// `BASE64URL(SHA256(ASCII(code_verifier)))`
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random opaque state token for CSRF protection.
pub fn generate_state() -> String {
    random_url_safe(STATE_BYTES)
}

/// PKCE material for one authorization attempt.
///
/// A new challenge is generated per exchange and never reused.
#[derive(Clone)]
pub struct PkceChallenge {
    /// Kept secret until the token exchange.
    pub code_verifier: String,
    /// Sent with the authorization request.
    pub code_challenge: String,
    /// Must come back unchanged on the authorization redirect.
    pub state: String,
}

impl PkceChallenge {
    pub const METHOD: &'static str = "S256";

    /// Fresh verifier, challenge and state.
    pub fn generate() -> Self {
        Self::from_verifier(generate_code_verifier(), generate_state())
    }

    /// Deterministic construction from a known verifier and state.
    pub fn from_verifier(code_verifier: impl Into<String>, state: impl Into<String>) -> Self {
        let code_verifier = code_verifier.into();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: state.into() }
    }

    pub fn challenge_method(&self) -> &'static str {
        Self::METHOD
    }

    /// Compare a returned state against the one that was sent.
    pub fn state_matches(&self, returned: Option<&str>) -> bool {
        returned == Some(self.state.as_str())
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"[REDACTED]")
            .field("code_challenge", &self.code_challenge)
            .field("state", &self.state)
            .finish()
    }
}
