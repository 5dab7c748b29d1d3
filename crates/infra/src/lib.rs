//! # AuthTree Infrastructure
//!
//! Implementations of the core ports and the composition root.
//!
//! This crate contains:
//! - The reqwest HTTP transport
//! - Keychain and encrypted-file secure storage
//! - Configuration loading and tracing bootstrap
//! - [`AuthClient`], which wires everything together
//!
//! ## Architecture
//! - Implements traits defined in `authtree-core`
//! - Contains all "impure" code (network, keychain, filesystem)

pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use client::AuthClient;
pub use errors::InfraError;
pub use http::{ReqwestTransport, ReqwestTransportBuilder};
pub use observability::init_tracing;
pub use storage::{EncryptedFileStorage, KeyManager, KeychainStorage};
