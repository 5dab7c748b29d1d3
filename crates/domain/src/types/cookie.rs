//! HTTP cookies as persisted by the cookie jar.
//!
//! Parsing follows RFC 6265 closely enough for session cookies issued by an
//! authentication server: `Domain`, `Path`, `Expires`, `Max-Age`, `Secure`
//! and `HttpOnly` are honoured, everything else is ignored.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Identity of a cookie within a jar; a newer cookie with the same key
/// replaces the older one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CookieKey {
    pub name: String,
    pub domain: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Absolute expiry; `None` for a session cookie.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Set when the cookie carried no `Domain` attribute; it then only
    /// matches the exact host that set it.
    #[serde(default)]
    pub host_only: bool,
}

impl Cookie {
    /// Parse one `Set-Cookie` header received from `url`.
    ///
    /// Returns `None` for a malformed header or when the `Domain` attribute
    /// does not cover the host that sent it.
    pub fn parse(header: &str, url: &Url, now: DateTime<Utc>) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            domain: host.clone(),
            path: default_path(url),
            expiry: None,
            secure: false,
            http_only: false,
            host_only: true,
        };
        let mut max_age: Option<i64> = None;

        for attribute in parts {
            let (key, val) = match attribute.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (attribute.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "domain" if !val.is_empty() => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if !domain_matches(&host, &domain) {
                        return None;
                    }
                    cookie.domain = domain;
                    cookie.host_only = false;
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "expires" => {
                    if let Some(expiry) = parse_http_date(val) {
                        cookie.expiry = Some(expiry);
                    }
                }
                "max-age" => max_age = val.parse().ok(),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }

        // Max-Age wins over Expires
        if let Some(seconds) = max_age {
            cookie.expiry = if seconds <= 0 {
                Some(DateTime::<Utc>::UNIX_EPOCH)
            } else {
                Duration::try_seconds(seconds).and_then(|age| now.checked_add_signed(age))
            };
        }

        Some(cookie)
    }

    pub fn key(&self) -> CookieKey {
        CookieKey { name: self.name.clone(), domain: self.domain.clone(), path: self.path.clone() }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_session(&self) -> bool {
        self.expiry.is_none()
    }

    /// True when this cookie may be sent with a request to `url` at `now`.
    pub fn matches(&self, url: &Url, now: DateTime<Utc>) -> bool {
        if self.is_expired(now) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return false;
        };
        let domain_ok =
            if self.host_only { host == self.domain } else { domain_matches(&host, &self.domain) };
        domain_ok && path_matches(url.path(), &self.path)
    }

    /// `name=value` pair for a `Cookie` request header.
    pub fn header_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Join cookies into a single `Cookie` header value.
pub fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(cookies.iter().map(Cookie::header_pair).collect::<Vec<_>>().join("; "))
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || (host.ends_with(domain) && host[..host.len() - domain.len()].ends_with('.'))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    ["%a, %d-%b-%Y %H:%M:%S GMT", "%a, %d-%b-%y %H:%M:%S GMT", "%a, %d %b %Y %H:%M:%S GMT"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
