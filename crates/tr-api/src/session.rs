//! Cookie-based session transport
//!
//! The session id is an opaque UUID carried in a plain cookie. Signing and
//! expiry are left to the deployment.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

const MAX_SESSION_ID_LEN: usize = 128;

/// Session id from `jar`, minting and setting a new one if absent or malformed
pub fn resolve_session(jar: CookieJar, cookie_name: &str) -> (CookieJar, String) {
    if let Some(id) = jar
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|id| is_valid_session_id(id))
    {
        return (jar, id);
    }

    let id = uuid::Uuid::new_v4().to_string();
    debug!("Issuing new session id: {}", id);

    let cookie = Cookie::build((cookie_name.to_string(), id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    (jar.add(cookie), id)
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
