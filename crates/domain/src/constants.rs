//! Protocol constants
//!
//! Header names, API versions and wire markers used when talking to the
//! authentication server.

// Header names
pub const ACCEPT_API_VERSION: &str = "Accept-API-Version";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const COOKIE: &str = "Cookie";
pub const SET_COOKIE: &str = "Set-Cookie";
pub const LOCATION: &str = "Location";

// API versions
pub const AUTHENTICATE_API_VERSION: &str = "resource=2.1, protocol=1.0";
pub const AUTHORIZE_API_VERSION: &str = "resource=2.1, protocol=1.0";
pub const SESSION_API_VERSION: &str = "resource=3.1";

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

// Defaults
pub const DEFAULT_COOKIE_NAME: &str = "iPlanetDirectoryPro";
pub const DEFAULT_REALM: &str = "root";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_THRESHOLD_SECS: u64 = 30;
pub const DEFAULT_CACHE_INTERVAL_MS: u64 = 0;
pub const DEFAULT_NAMESPACE: &str = "authtree";
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

// Tree initiation query values
pub const AUTH_INDEX_TYPE: &str = "authIndexType";
pub const AUTH_INDEX_VALUE: &str = "authIndexValue";
pub const AUTH_INDEX_SERVICE: &str = "service";
pub const AUTH_INDEX_COMPOSITE_ADVICE: &str = "composite_advice";
pub const SUSPENDED_ID: &str = "suspendedId";

// Response markers
pub const SESSION_TIMEOUT_ERROR_CODE: &str = "110";
pub const SUSPENDED_SESSION_MARKER: &str = "SuspendedAuthSessionException";
pub const INVALID_GRANT: &str = "invalid_grant";

// PKCE
pub const CODE_CHALLENGE_METHOD: &str = "S256";

// Storage keys (prefixed with the configured namespace)
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const SSO_TOKEN_KEY: &str = "sso_token";
pub const COOKIES_KEY: &str = "cookies";
