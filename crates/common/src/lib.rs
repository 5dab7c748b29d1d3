//! Shared primitives for the AuthTree crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors and PKCE helpers (pure, no runtime)
//! - `observability`: tracing instrumentation
//! - `runtime`: clock, TTL cache, cipher and async task handles
//! - `test-utils`: fixtures and mock time for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod crypto;
#[cfg(feature = "runtime")]
pub mod sync;
#[cfg(feature = "runtime")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export commonly used types
// ------------------------
#[cfg(feature = "foundation")]
pub use auth::PkceChallenge;
#[cfg(feature = "runtime")]
pub use cache::TtlCache;
#[cfg(feature = "runtime")]
pub use crypto::{EncryptedData, EncryptionService};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult};
#[cfg(feature = "runtime")]
pub use sync::PendingResult;
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
