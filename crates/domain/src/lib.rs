//! # AuthTree Domain
//!
//! Wire and data types for the authentication tree client.
//!
//! This crate contains:
//! - Node and Callback models plus the callback registry
//! - Credential types (AccessToken, SsoToken, Cookie)
//! - The error taxonomy shared by every other crate
//! - Configuration structures and protocol constants
//!
//! ## Architecture
//! - No dependencies on other AuthTree crates
//! - No I/O; everything here is pure data and parsing

pub mod callback;
pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use callback::{Callback, CallbackError, CallbackRegistry, CallbackVariant, RawCallback};
pub use config::*;
pub use errors::*;
pub use types::*;
