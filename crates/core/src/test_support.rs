//! Scripted transport and context builders for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authtree_common::time::MockClock;
use authtree_domain::{
    AuthConfig, CallbackRegistry, OAuth2Config, Result, ServerConfig, StoreConfig,
};
use authtree_domain::StorageError;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::context::AuthContext;
use crate::storage::{InMemoryStorage, SecureStorage};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

pub const BASE_URL: &str = "https://am.example.com/am";

struct Route {
    method: Method,
    path_suffix: String,
    responses: VecDeque<HttpResponse>,
}

/// Answers requests from per-route queues. The last queued response of a
/// route is repeated once the queue is down to one.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
    echo_state: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Copy the `state` query parameter of each request onto the
    /// `Location` of its redirect response, as an authorization server would.
    pub fn echo_state(mut self) -> Self {
        self.echo_state = true;
        self
    }

    pub fn on(&self, method: Method, path_suffix: &str, response: HttpResponse) -> &Self {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.method == method && r.path_suffix == path_suffix) {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                path_suffix: path_suffix.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, path_suffix: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url.path().ends_with(path_suffix)).count()
    }

    pub fn last(&self, path_suffix: &str) -> Option<HttpRequest> {
        self.requests.lock().iter().rev().find(|r| r.url.path().ends_with(path_suffix)).cloned()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && request.url.path().ends_with(&r.path_suffix));
        let response = match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front(),
            Some(route) => route.responses.front().cloned(),
            None => None,
        };
        let mut response = response.unwrap_or_else(|| HttpResponse::new(404, "no scripted route"));
        if self.echo_state {
            let state =
                request.url.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned());
            let location = response.header("Location").map(str::to_owned);
            if let (Some(state), Some(location)) = (state, location) {
                let separator = if location.contains('?') { '&' } else { '?' };
                response.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("Location"));
                let location = format!("{location}{separator}state={state}");
                response = response.with_header("Location", location);
            }
        }
        Ok(response)
    }
}

pub fn config(store: StoreConfig) -> AuthConfig {
    let server = ServerConfig::new(BASE_URL, "root").unwrap();
    let oauth2 =
        OAuth2Config::new("AndroidTest", "https://app.example.com/callback", "openid email address")
            .unwrap();
    AuthConfig::new(server, oauth2).unwrap().with_store(store).with_tree("Login")
}

pub fn context_with(store: StoreConfig, clock: &MockClock) -> Arc<AuthContext> {
    let clock = Arc::new(clock.clone());
    AuthContext::with_parts(config(store), CallbackRegistry::with_defaults(), clock)
        .unwrap()
        .shared()
}

pub fn context(clock: &MockClock) -> Arc<AuthContext> {
    context_with(StoreConfig::default(), clock)
}

pub fn token_json(access_token: &str, expires_in: i64) -> HttpResponse {
    HttpResponse::new(
        200,
        authtree_common::testing::token_response_json(access_token, expires_in).to_string(),
    )
}

/// In-memory storage whose next `get` can be held after it has read its
/// value, so a writer can run in between the load and its caching.
#[derive(Default)]
pub struct GatedStorage {
    inner: InMemoryStorage,
    armed: AtomicBool,
    loaded: Notify,
    release: Notify,
}

impl GatedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the next `get` after its read.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until the held `get` has read its value.
    pub async fn wait_loaded(&self) {
        self.loaded.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl SecureStorage for GatedStorage {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        let value = self.inner.get(key).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.loaded.notify_one();
            self.release.notified().await;
        }
        value
    }

    async fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
        self.inner.remove(key).await
    }
}
