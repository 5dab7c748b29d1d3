//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use authtree_domain::{AuthError, LogFormat};
use authtree_infra::config;
use tempfile::{Builder, NamedTempFile};

fn write_config(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "server": {
            "url": "https://am.example.com/am",
            "realm": "alpha",
            "cookie_name": "session",
            "timeout_secs": 10
        },
        "oauth2": {
            "client_id": "AndroidTest",
            "redirect_uri": "https://app.example.com/callback",
            "scope": "openid email address"
        },
        "store": {
            "cache_interval_ms": 1000,
            "threshold_secs": 60,
            "sso_enabled": false
        },
        "logging": { "level": "debug", "format": "json" },
        "tree": "Login"
    }"#;
    let file = write_config(json_content, ".json");

    let config = config::load_from_file(Some(file.path().to_path_buf())).expect("JSON config");

    assert_eq!(config.server.realm, "alpha");
    assert_eq!(config.server.cookie_name, "session");
    assert_eq!(config.server.timeout_secs, 10);
    assert_eq!(config.oauth2.client_id, "AndroidTest");
    assert_eq!(config.store.cache_interval_ms, 1000);
    assert!(!config.store.sso_enabled);
    assert_eq!(config.store.namespace, "authtree");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.tree.as_deref(), Some("Login"));
}

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
[server]
url = "https://am.example.com/am"
token_endpoint = "custom/token"

[oauth2]
client_id = "AndroidTest"
redirect_uri = "https://app.example.com/callback"
scope = "openid"
"#;
    let file = write_config(toml_content, ".toml");

    let config = config::load_from_file(Some(file.path().to_path_buf())).expect("TOML config");

    assert_eq!(config.server.realm, "root");
    assert_eq!(
        config.server.token_url().unwrap().as_str(),
        "https://am.example.com/am/custom/token"
    );
    assert_eq!(config.store.threshold_secs, 30);
}

#[test]
fn test_file_failing_validation_is_rejected() {
    let file = write_config(r#"{ "server": { "url": "https://am.example.com/am" } }"#, ".json");

    let result = config::load_from_file(Some(file.path().to_path_buf()));

    assert!(matches!(result, Err(AuthError::Config(msg)) if msg.contains("client id")));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let file = write_config("[server\nurl = ", ".toml");

    let result = config::load_from_file(Some(file.path().to_path_buf()));

    assert!(matches!(result, Err(AuthError::Config(_))));
}

#[test]
fn test_missing_file_is_config_error() {
    let result = config::load_from_file(Some("/nonexistent/authtree.toml".into()));

    assert!(matches!(result, Err(AuthError::Config(_))));
}
