//! Transport decorator that binds a cookie jar to every exchange.

use std::sync::Arc;

use async_trait::async_trait;
use authtree_domain::constants::{COOKIE, SET_COOKIE};
use authtree_domain::{cookie_header, Result};
use tracing::warn;

use super::jar::CookieJarEngine;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Attaches stored cookies to outgoing requests and captures `Set-Cookie`
/// from responses.
///
/// A jar failure never fails the request: cookies are an optimisation of
/// the session, the tokens are the source of truth.
pub struct CookieTransport {
    inner: Arc<dyn HttpTransport>,
    jar: Arc<CookieJarEngine>,
}

impl CookieTransport {
    pub fn new(inner: Arc<dyn HttpTransport>, jar: Arc<CookieJarEngine>) -> Self {
        Self { inner, jar }
    }

    pub fn jar(&self) -> &Arc<CookieJarEngine> {
        &self.jar
    }
}

#[async_trait]
impl HttpTransport for CookieTransport {
    async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        match self.jar.for_request(&url).await {
            Ok(cookies) => {
                if let Some(header) = cookie_header(&cookies) {
                    request.headers.push((COOKIE.to_string(), header));
                }
            }
            Err(err) => warn!(url = %url, error = %err, "cookie lookup failed"),
        }

        let response = self.inner.execute(request).await?;

        let set_cookies = response.headers_all(SET_COOKIE);
        if let Err(err) = self.jar.on_response(&url, &set_cookies).await {
            warn!(url = %url, error = %err, "failed to store response cookies");
        }
        Ok(response)
    }
}
