//! Request sanitization middleware.
//!
//! Detection runs on the raw values first; a hit rejects with 400. The
//! query string and JSON, form and text bodies are then rewritten in place.
//! Other content types (multipart, binary) pass through untouched.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::uri::PathAndQuery;
use axum::http::{header, HeaderMap, HeaderValue, Request, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::http::error::GuardError;
use crate::http::middleware::path_has_prefix;
use crate::http::server::AppState;
use crate::observability::{AuditContext, SecurityEvent};
use crate::sanitize::{InputSanitizer, ThreatKind};

const NULL_BODY: &[u8] = b"null";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    Text,
    Other,
}

impl BodyKind {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        else {
            return BodyKind::Other;
        };
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime == "application/json" || mime.ends_with("+json") {
            BodyKind::Json
        } else if mime == "application/x-www-form-urlencoded" {
            BodyKind::Form
        } else if mime.starts_with("text/") {
            BodyKind::Text
        } else {
            BodyKind::Other
        }
    }
}

pub async fn sanitize_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let config = state.config.load_full();
    let path = request.uri().path();
    if !config.sanitize.enabled
        || config
            .sanitize
            .exempt_paths
            .iter()
            .any(|p| path_has_prefix(path, p))
    {
        return next.run(request).await;
    }

    let sanitizer = state.sanitizer.load_full();
    let ctx = AuditContext::from_request(&request);

    // 1. Path: detection only, routing needs the raw path
    if let Some(threat) = sanitizer.scan_path(request.uri().path()) {
        return reject(&ctx, threat);
    }

    let (mut parts, body) = request.into_parts();

    // 2. Query string
    if let Some(query) = parts.uri.query() {
        if let Some(threat) = sanitizer.scan_urlencoded(query) {
            return reject(&ctx, threat);
        }
        let cleaned = sanitizer.sanitize_urlencoded(query);
        if cleaned != query {
            parts.uri = with_query(&parts.uri, &cleaned);
        }
    }

    // 3. Body
    let kind = BodyKind::from_headers(&parts.headers);
    let body = if kind == BodyKind::Other {
        body
    } else {
        let bytes = match axum::body::to_bytes(body, config.security.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to buffer request body");
                ctx.record(SecurityEvent::BodyTooLarge);
                return GuardError::PayloadTooLarge.into_response();
            }
        };
        let cleaned = match sanitize_body(&sanitizer, kind, bytes) {
            Ok(cleaned) => cleaned,
            Err(threat) => return reject(&ctx, threat),
        };
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(cleaned.len()));
        Body::from(cleaned)
    };

    next.run(Request::from_parts(parts, body)).await
}

fn reject(ctx: &AuditContext, threat: ThreatKind) -> Response {
    ctx.record(SecurityEvent::InjectionDetected(threat));
    GuardError::InjectionDetected.into_response()
}

/// Scan then rewrite a buffered body. Never fails except on a detection hit;
/// malformed JSON becomes `null`.
pub fn sanitize_body(
    sanitizer: &Arc<InputSanitizer>,
    kind: BodyKind,
    bytes: Bytes,
) -> Result<Bytes, ThreatKind> {
    if bytes.is_empty() {
        return Ok(bytes);
    }

    match kind {
        BodyKind::Json => {
            let value: Value = match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(_) => return Ok(Bytes::from_static(NULL_BODY)),
            };
            if let Some(threat) = sanitizer.scan_value(&value) {
                return Err(threat);
            }
            Ok(serde_json::to_vec(&sanitizer.sanitize_value(value))
                .map(Bytes::from)
                .unwrap_or_else(|_| Bytes::from_static(NULL_BODY)))
        }
        BodyKind::Form => {
            let text = String::from_utf8_lossy(&bytes);
            if let Some(threat) = sanitizer.scan_urlencoded(&text) {
                return Err(threat);
            }
            Ok(Bytes::from(sanitizer.sanitize_urlencoded(&text)))
        }
        BodyKind::Text => {
            let text = String::from_utf8_lossy(&bytes);
            if let Some(threat) = sanitizer.scan_text(&text) {
                return Err(threat);
            }
            Ok(Bytes::from(sanitizer.sanitize_str(&text)))
        }
        BodyKind::Other => Ok(bytes),
    }
}

/// Replace the query of `uri`. If the result cannot be represented the
/// query is dropped rather than passed through unsanitized.
fn with_query(uri: &Uri, query: &str) -> Uri {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .unwrap_or_else(|_| PathAndQuery::from_static("/")),
    );
    Uri::from_parts(parts).unwrap_or_else(|_| Uri::from_static("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitizer() -> Arc<InputSanitizer> {
        Arc::new(InputSanitizer::default())
    }

    #[test]
    fn test_body_kind() {
        let mut headers = HeaderMap::new();
        assert_eq!(BodyKind::from_headers(&headers), BodyKind::Other);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert_eq!(BodyKind::from_headers(&headers), BodyKind::Json);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/merge-patch+json"));
        assert_eq!(BodyKind::from_headers(&headers), BodyKind::Json);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
        assert_eq!(BodyKind::from_headers(&headers), BodyKind::Form);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(BodyKind::from_headers(&headers), BodyKind::Text);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("multipart/form-data; boundary=x"));
        assert_eq!(BodyKind::from_headers(&headers), BodyKind::Other);
    }

    #[test]
    fn test_json_body_is_rewritten() {
        let body = Bytes::from(r#"{"name":"Jiko \"Deluxe\"","password":"p<a>ss","fileName":"C:\\Users\\me\\photo 1.png"}"#);
        let cleaned = sanitize_body(&sanitizer(), BodyKind::Json, body).unwrap();
        let value: Value = serde_json::from_slice(&cleaned).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Jiko &quot;Deluxe&quot;",
                "password": "p<a>ss",
                "fileName": "photo_1.png"
            })
        );
    }

    #[test]
    fn test_malformed_json_becomes_null() {
        let cleaned =
            sanitize_body(&sanitizer(), BodyKind::Json, Bytes::from_static(b"{\"a\":")).unwrap();
        assert_eq!(&cleaned[..], b"null");
    }

    #[test]
    fn test_detection_rejects() {
        let body = Bytes::from(r#"{"q":"1' OR '1'='1"}"#);
        assert_eq!(
            sanitize_body(&sanitizer(), BodyKind::Json, body),
            Err(ThreatKind::SqlInjection)
        );

        let form = Bytes::from("comment=%3Cscript%3Ealert(1)%3C%2Fscript%3E");
        assert_eq!(
            sanitize_body(&sanitizer(), BodyKind::Form, form),
            Err(ThreatKind::Xss)
        );
    }

    #[test]
    fn test_text_and_empty_bodies() {
        let cleaned =
            sanitize_body(&sanitizer(), BodyKind::Text, Bytes::from("a\u{0}b > c")).unwrap();
        assert_eq!(&cleaned[..], "ab &gt; c".as_bytes());

        let empty = sanitize_body(&sanitizer(), BodyKind::Json, Bytes::new()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_with_query() {
        let uri: Uri = "/api/echo?q=%3Cb%3E".parse().unwrap();
        assert_eq!(with_query(&uri, "q=%26lt%3Bb%26gt%3B").to_string(), "/api/echo?q=%26lt%3Bb%26gt%3B");
        assert_eq!(with_query(&uri, "").to_string(), "/api/echo");
    }
}
