//! Async task handles

pub mod pending;

pub use pending::PendingResult;
