//! Session lifecycle: SSO session plus the access token minted from it.

pub mod manager;

pub use manager::SessionManager;
