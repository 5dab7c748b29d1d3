//! Port interfaces for credential validation

use authtree_domain::AccessToken;

/// Extra check applied to a stored access token before it is handed out.
///
/// Returning `false` makes the store treat the token as missing, e.g. after
/// an introspection call or a local revocation list says it is dead.
pub trait AccessTokenVerifier: Send + Sync {
    fn is_valid(&self, token: &AccessToken) -> bool;
}

impl<F> AccessTokenVerifier for F
where
    F: Fn(&AccessToken) -> bool + Send + Sync,
{
    fn is_valid(&self, token: &AccessToken) -> bool {
        self(token)
    }
}
