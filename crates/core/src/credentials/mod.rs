//! Credential stores.
//!
//! - [`TokenStore`]: the OAuth2 access token, with cached reads and
//!   threshold refresh coalesced into a single in-flight call
//! - [`SsoStore`]: the SSO session token, which can be disabled entirely
//!
//! Both serialize their mutations and share the single encryption retry of
//! [`set_with_retry`](crate::storage::set_with_retry).

pub mod ports;
pub mod sso_store;
pub mod token_store;

pub use ports::AccessTokenVerifier;
pub use sso_store::SsoStore;
pub use token_store::TokenStore;
