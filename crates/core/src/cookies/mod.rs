//! Session cookie persistence.
//!
//! - [`CookieJarEngine`] stores `Set-Cookie` results and answers which
//!   cookies go with a request.
//! - [`CookieTransport`] wraps any [`HttpTransport`](crate::transport::HttpTransport)
//!   so every request carries the jar's cookies and every response feeds it.

pub mod jar;
pub mod transport;

pub use jar::CookieJarEngine;
pub use transport::CookieTransport;
