//! Configuration loading
//!
//! Builds a validated [`AuthConfig`](authtree_domain::AuthConfig) from
//! environment variables or a config file.

pub mod loader;

// Re-export commonly used items
pub use loader::{find_config_path, load, load_from_env, load_from_file};
