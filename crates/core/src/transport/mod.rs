//! HTTP transport port.
//!
//! The engines build [`HttpRequest`]s and classify [`HttpResponse`]s; the
//! actual I/O is done by an [`HttpTransport`] implementation supplied from
//! outside (reqwest in `authtree-infra`, a scripted fake in tests).

pub mod ports;

pub use ports::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody};
