//! CSRF enforcement for state-changing requests.
//!
//! Checked in order:
//! 1. CSRF cookie and header both present → double-submit comparison. A
//!    mismatch still passes if the header carries the session-bound token.
//! 2. `Authorization: Bearer` present → request origin must be allow-listed.
//!    Clients sending neither `Origin` nor `Referer` are not browsers and
//!    cannot be driven cross-site, so they pass.
//! 3. Otherwise the header must carry the token bound to the live session.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::{normalize_origin, GuardConfig};
use crate::http::error::GuardError;
use crate::http::middleware::path_has_prefix;
use crate::http::request::{bearer_token, cookie_value, first_header, request_origin, RequestOrigin};
use crate::http::server::AppState;
use crate::observability::{AuditContext, SecurityEvent};
use crate::security::csrf::CsrfTokenStore;

/// Which check admitted the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfCheck {
    DoubleSubmit,
    SessionToken,
    AllowedOrigin,
    NonBrowserClient,
}

pub fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

pub async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_state_changing(request.method()) {
        return next.run(request).await;
    }

    let config = state.config.load_full();
    let path = request.uri().path();
    if config.csrf.skip_paths.iter().any(|p| path_has_prefix(path, p)) {
        return next.run(request).await;
    }

    match check_request(&state, &config, request.headers()) {
        Ok(check) => {
            tracing::debug!(?check, "CSRF check passed");
            next.run(request).await
        }
        Err(event) => {
            AuditContext::from_request(&request).record(event);
            let error = match event {
                SecurityEvent::CsrfTokenMissing => GuardError::CsrfTokenMissing,
                SecurityEvent::OriginRejected => GuardError::OriginRejected,
                _ => GuardError::CsrfValidationFailed,
            };
            error.into_response()
        }
    }
}

/// Decide whether a state-changing request may proceed.
pub fn check_request(
    state: &AppState,
    config: &GuardConfig,
    headers: &HeaderMap,
) -> Result<CsrfCheck, SecurityEvent> {
    let header_token = first_header(headers, &config.csrf.header_names);
    let cookie_token = cookie_value(headers, &config.csrf.cookie_name);
    let session_id = cookie_value(headers, &config.session.cookie_name);

    // 1. Same-origin browser call
    if let (Some(cookie), Some(header)) = (cookie_token.as_deref(), header_token) {
        if CsrfTokenStore::validate_double_submit_token(cookie, header) {
            return Ok(CsrfCheck::DoubleSubmit);
        }
        if session_token_valid(state, session_id.as_deref(), header) {
            return Ok(CsrfCheck::SessionToken);
        }
        return Err(SecurityEvent::CsrfTokenInvalid);
    }

    // 2. Bearer API call
    if bearer_token(headers).is_some() {
        return match request_origin(headers) {
            RequestOrigin::Absent => Ok(CsrfCheck::NonBrowserClient),
            RequestOrigin::Origin(origin) if origin_allowed(config, &origin) => {
                Ok(CsrfCheck::AllowedOrigin)
            }
            _ => Err(SecurityEvent::OriginRejected),
        };
    }

    // 3. Session-bound token
    let Some(header) = header_token else {
        return Err(SecurityEvent::CsrfTokenMissing);
    };
    if session_token_valid(state, session_id.as_deref(), header) {
        Ok(CsrfCheck::SessionToken)
    } else {
        Err(SecurityEvent::CsrfTokenInvalid)
    }
}

fn session_token_valid(state: &AppState, session_id: Option<&str>, provided: &str) -> bool {
    match session_id {
        Some(sid) => state.sessions.touch(sid).is_some() && state.csrf.validate_token(sid, provided),
        None => false,
    }
}

fn origin_allowed(config: &GuardConfig, origin: &str) -> bool {
    config
        .csrf
        .allowed_origins
        .iter()
        .filter_map(|allowed| normalize_origin(allowed))
        .any(|allowed| allowed == origin)
}
