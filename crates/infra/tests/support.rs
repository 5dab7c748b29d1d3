//! Shared fixtures for the infra integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use authtree_core::storage::{InMemoryStorage, SecureStorage};
use authtree_domain::{AuthConfig, OAuth2Config, ServerConfig, StoreConfig};
use authtree_infra::AuthClient;
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const AUTHENTICATE: &str = "/am/json/realms/root/authenticate";
pub const AUTHORIZE: &str = "/am/oauth2/realms/root/authorize";
pub const ACCESS_TOKEN: &str = "/am/oauth2/realms/root/access_token";
pub const REVOKE: &str = "/am/oauth2/realms/root/token/revoke";
pub const SESSIONS: &str = "/am/json/realms/root/sessions";
pub const REDIRECT_URI: &str = "https://app.example.com/callback";

pub fn config(server: &MockServer, store: StoreConfig) -> AuthConfig {
    let server = ServerConfig::new(format!("{}/am", server.uri()), "root").expect("server config");
    let oauth2 = OAuth2Config::new("AndroidTest", REDIRECT_URI, "openid email address")
        .expect("oauth2 config");
    AuthConfig::new(server, oauth2).expect("auth config").with_store(store).with_tree("Login")
}

/// Client against `server` backed by `storage`.
pub fn client_with(
    server: &MockServer,
    store: StoreConfig,
    storage: Arc<dyn SecureStorage>,
) -> AuthClient {
    AuthClient::with_storage(config(server, store), storage).expect("auth client")
}

pub fn client(server: &MockServer) -> (AuthClient, Arc<InMemoryStorage>) {
    let storage = Arc::new(InMemoryStorage::new());
    (client_with(server, StoreConfig::default(), storage.clone()), storage)
}

pub fn json_response(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(body)
}

/// `/authorize` answering like the server: a 302 to the redirect URI with a
/// code and the request's own state.
pub async fn mount_authorize(server: &MockServer, code: &'static str) {
    Mock::given(method("GET"))
        .and(path(AUTHORIZE))
        .respond_with(move |request: &Request| {
            let state = request
                .url
                .query_pairs()
                .find(|(key, _)| key == "state")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{REDIRECT_URI}?code={code}&state={state}"))
        })
        .mount(server)
        .await;
}

pub async fn mount_token(server: &MockServer, access_token: &str, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path(ACCESS_TOKEN))
        .respond_with(json_response(
            200,
            authtree_common::testing::token_response_json(access_token, expires_in),
        ))
        .mount(server)
        .await;
}
