//! # AuthTree Core
//!
//! Protocol engines for the authentication tree client. No network or
//! platform code lives here.
//!
//! This crate contains:
//! - Tree negotiation against `/authenticate` ([`AuthTreeEngine`], [`TreeWalk`])
//! - The PKCE exchange and token lifecycle calls ([`PkceOAuth2Exchanger`])
//! - Credential stores and the cookie jar
//! - The session manager tying them together
//!
//! ## Architecture Principles
//! - Depends only on `authtree-common` and `authtree-domain`
//! - HTTP and secure storage are ports ([`HttpTransport`], [`SecureStorage`])
//!   implemented in `authtree-infra`
//! - Every engine receives an explicit [`AuthContext`]; there is no global
//!   state

pub mod context;
pub mod cookies;
pub mod credentials;
pub mod journey;
pub mod oauth2;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use context::AuthContext;
pub use cookies::{CookieJarEngine, CookieTransport};
pub use credentials::{AccessTokenVerifier, SsoStore, TokenStore};
pub use journey::walk::PendingStep;
pub use journey::{AuthTreeEngine, TreeWalk};
pub use oauth2::PkceOAuth2Exchanger;
pub use session::SessionManager;
pub use storage::{set_with_retry, InMemoryStorage, SecureStorage};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody};
