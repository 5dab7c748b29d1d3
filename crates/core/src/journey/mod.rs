//! Authentication tree negotiation.
//!
//! [`AuthTreeEngine`] performs single round trips against `/authenticate`;
//! [`TreeWalk`] sequences them for one walk and enforces that at most one
//! submission is outstanding.

pub mod service;
pub mod walk;

pub use service::AuthTreeEngine;
pub use walk::TreeWalk;
