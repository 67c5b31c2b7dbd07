//! `Set-Cookie` construction for the session and CSRF cookies.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{time, Cookie, SameSite};

use crate::config::GuardConfig;

fn max_age(ttl: Duration) -> time::Duration {
    time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

/// Double-submit cookie. Client script must be able to read it, so it is
/// not HttpOnly.
pub fn csrf_cookie(config: &GuardConfig, token: &str) -> Cookie<'static> {
    Cookie::build((config.csrf.cookie_name.clone(), token.to_string()))
        .path("/")
        .http_only(false)
        .secure(config.secure_cookies())
        .same_site(SameSite::Strict)
        .max_age(max_age(Duration::from_secs(config.csrf.token_ttl_secs)))
        .build()
}

/// Session id cookie.
pub fn session_cookie(config: &GuardConfig, session_id: &str) -> Cookie<'static> {
    Cookie::build((config.session.cookie_name.clone(), session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies())
        .same_site(SameSite::Strict)
        .max_age(max_age(Duration::from_secs(config.session.idle_ttl_secs)))
        .build()
}

/// Cookie that tells the browser to drop `name`.
pub fn removal_cookie(config: &GuardConfig, name: &str, http_only: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), ""))
        .path("/")
        .http_only(http_only)
        .secure(config.secure_cookies())
        .same_site(SameSite::Strict)
        .build();
    cookie.make_removal();
    cookie
}

/// Append a `Set-Cookie` header. Cookie names and values here are
/// token-safe, so encoding cannot fail in practice.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, cookie = cookie.name(), "Unencodable cookie"),
    }
}
