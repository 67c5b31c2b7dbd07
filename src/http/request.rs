//! Request inspection helpers.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) and echo it on the response
//! - Read cookies, bearer credentials and the CSRF header
//! - Resolve the client address and the request origin
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Header values that are not valid UTF-8 are treated as absent

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, Extensions, HeaderMap, HeaderName};
use cookie::Cookie;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use url::Url;

use crate::config::normalize_origin;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Layer assigning an `x-request-id` to requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer copying the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, X_REQUEST_ID)
}

/// A header value as text, if present and valid.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Value of the named cookie across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Bearer credential from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// First non-empty value among the given headers.
pub fn first_header<'a>(headers: &'a HeaderMap, names: &[String]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| header_str(headers, name))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

/// Client address: first `X-Forwarded-For` hop, else the peer address.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_string();
        }
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// What the request says about where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOrigin {
    /// Neither `Origin` nor `Referer` was sent.
    Absent,
    /// Normalized `scheme://host[:port]`.
    Origin(String),
    /// A header was sent but does not name an http(s) origin (e.g. `null`).
    Opaque,
}

/// Origin of the request from `Origin`, falling back to `Referer`.
pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    if let Some(value) = headers.get(header::ORIGIN) {
        return value
            .to_str()
            .ok()
            .and_then(normalize_origin)
            .map_or(RequestOrigin::Opaque, RequestOrigin::Origin);
    }
    if let Some(value) = headers.get(header::REFERER) {
        return value
            .to_str()
            .ok()
            .and_then(|v| Url::parse(v).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(|url| url.origin().ascii_serialization())
            .map_or(RequestOrigin::Opaque, RequestOrigin::Origin);
    }
    RequestOrigin::Absent
}
