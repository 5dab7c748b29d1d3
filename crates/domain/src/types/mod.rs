//! Domain types and models

pub mod advice;
pub mod cookie;
pub mod node;
pub mod token;

pub use advice::PolicyAdvice;
pub use cookie::{cookie_header, Cookie, CookieKey};
pub use node::{NextStep, Node};
pub use token::{AccessToken, Scope, SsoToken, TokenResponse, UserInfo};
