//! OAuth 2.0 helpers shared by the exchange engine.
//!
//! Only the protocol primitives live here; the HTTP flow itself is in
//! `authtree-core`.

pub mod pkce;

pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, PkceChallenge};
