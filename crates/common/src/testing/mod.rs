//! Testing utilities and helpers
//!
//! - **[`fixtures`]**: canned server payloads (nodes, token responses)
//! - **[`async_utils`]**: polling helpers for async assertions
//! - re-exports [`MockClock`] so tests need one import for time control
//!
//! ```rust
//! use authtree_common::testing::{fixtures, MockClock};
//!
//! let clock = MockClock::new();
//! clock.advance_millis(10);
//! let body = fixtures::token_response_json("at-1", 3600);
//! assert_eq!(body["access_token"], "at-1");
//! ```

pub mod async_utils;
pub mod fixtures;

pub use async_utils::poll_until;
pub use fixtures::{node_json, success_json, token_response_json};

pub use crate::time::{Clock, MockClock, SystemClock};
