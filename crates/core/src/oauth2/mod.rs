//! OAuth2 / OIDC calls made with an SSO session.

pub mod service;

pub use service::PkceOAuth2Exchanger;
