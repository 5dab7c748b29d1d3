//! Port interfaces for HTTP execution

use async_trait::async_trait;
use authtree_domain::constants::{APPLICATION_JSON, CONTENT_TYPE, FORM_URLENCODED};
use authtree_domain::{ApiError, AuthError, Result};
use serde_json::Value;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A request as built by the engines.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self { method: Method::Get, url, headers: Vec::new(), body: None }
    }

    pub fn post(url: Url) -> Self {
        Self { method: Method::Post, url, headers: Vec::new(), body: None }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(self, body: Value) -> Self {
        let mut request = self.header(CONTENT_TYPE, APPLICATION_JSON);
        request.body = Some(RequestBody::Json(body));
        request
    }

    pub fn form<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = self.header(CONTENT_TYPE, FORM_URLENCODED);
        request.body =
            Some(RequestBody::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()));
        request
    }

    /// First header named `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Value of a form field, if the body is a form.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        match &self.body {
            Some(RequestBody::Form(pairs)) => {
                pairs.iter().find(|(key, _)| key == name).map(|(_, v)| v.as_str())
            }
            _ => None,
        }
    }
}

/// A response as seen by the engines. Redirects are never followed, so a
/// 3xx arrives here with its `Location` header intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Every header named `name`, in arrival order (`Set-Cookie` repeats).
    pub fn headers_all(&self, name: &str) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body)
            .map_err(|e| AuthError::parse(format!("HTTP {} body is not JSON: {e}", self.status)))
    }

    pub fn api_error(&self) -> ApiError {
        ApiError::new(self.status, self.body.clone())
    }
}

/// Executes one HTTP exchange.
///
/// Implementations must not follow redirects and must not retry; timeouts
/// are theirs to configure. Transport failures map to
/// [`AuthError::Transport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
