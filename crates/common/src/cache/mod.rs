//! Time-bounded read caches
//!
//! Credential stores keep decoded values in memory for a short window so
//! repeated reads skip storage and decryption. Values are handed out as
//! `Arc<V>`: two reads inside the window return the same allocation, which
//! callers can check with [`Arc::ptr_eq`](std::sync::Arc::ptr_eq).
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use authtree_common::cache::TtlCache;
//!
//! let cache: TtlCache<&'static str, String> = TtlCache::new(Duration::from_secs(5));
//! let stored = cache.insert("token", "abc".to_string());
//! let read = cache.get(&"token").unwrap();
//! assert!(Arc::ptr_eq(&stored, &read));
//! ```

pub mod ttl;

pub use ttl::{CacheStats, TtlCache};
