//! Guard-owned route handlers.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::cookies::{append_cookie, csrf_cookie, removal_cookie, session_cookie};
use crate::http::error::GuardError;
use crate::http::request::cookie_value;
use crate::http::server::AppState;
use crate::observability::{metrics, AuditContext, SecurityEvent};
use crate::sanitize::sanitize_log_line;
use crate::security::csrf::CsrfTokenStore;
use crate::security::lockout::normalize_email;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /auth/login`
///
/// Locked accounts are refused before the password is looked at. Unknown
/// users and wrong passwords produce the same response.
pub async fn login(
    State(state): State<AppState>,
    ctx: AuditContext,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, GuardError> {
    let Json(body) = payload.map_err(|_| GuardError::BadRequest("Invalid request body"))?;
    let ctx = ctx.with_subject(&body.email);

    // 1. Lockout check
    if state.login_guard.is_locked(&body.email) {
        ctx.record(SecurityEvent::LoginWhileLocked);
        metrics::record_login("locked");
        return Err(GuardError::TooManyAttempts);
    }

    // 2. Credentials
    if !state.credentials.verify(&body.email, &body.password) {
        let attempts = state.login_guard.record_failure(&body.email);
        if attempts >= state.login_guard.policy().max_attempts {
            ctx.record(SecurityEvent::AccountLocked);
        } else {
            ctx.record(SecurityEvent::LoginFailed);
        }
        metrics::record_login("failure");
        return Err(GuardError::InvalidCredentials);
    }

    // 3. Session
    state.login_guard.clear(&body.email);
    let email = normalize_email(&body.email);
    let session_id = state.sessions.create(&email);
    let csrf_token = state.csrf.generate_token(&session_id);
    metrics::record_login("success");
    tracing::info!(user = %sanitize_log_line(&email), "Login succeeded");

    let config = state.config.load_full();
    let mut response = Json(json!({
        "success": true,
        "csrf_token": csrf_token,
    }))
    .into_response();
    append_cookie(response.headers_mut(), &session_cookie(&config, &session_id));
    Ok(response)
}

/// `POST /auth/logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let config = state.config.load_full();

    if let Some(session_id) = cookie_value(&headers, &config.session.cookie_name) {
        if let Some(session) = state.sessions.remove(&session_id) {
            tracing::info!(user = %sanitize_log_line(&session.email), "Logged out");
        }
        state.csrf.remove_token(&session_id);
    }

    let mut response = Json(json!({ "success": true })).into_response();
    let headers = response.headers_mut();
    append_cookie(headers, &removal_cookie(&config, &config.session.cookie_name, true));
    append_cookie(headers, &removal_cookie(&config, &config.csrf.cookie_name, false));
    response
}

/// `GET /csrf/token`
///
/// Always sets a fresh double-submit cookie. Callers with a live session
/// also get a new session-bound token.
pub async fn issue_csrf_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let config = state.config.load_full();
    let token = CsrfTokenStore::generate_double_submit_token();

    let mut body = json!({
        "success": true,
        "csrf_token": token,
    });
    if let Some(session_id) = cookie_value(&headers, &config.session.cookie_name)
        .filter(|sid| state.sessions.touch(sid).is_some())
    {
        body["session_csrf_token"] = Value::String(state.csrf.generate_token(&session_id));
    }

    let mut response = Json(body).into_response();
    append_cookie(response.headers_mut(), &csrf_cookie(&config, &token));
    response
}

/// `GET /api/echo`: returns the query parameters as the handler sees them.
pub async fn echo_query(Query(params): Query<BTreeMap<String, String>>) -> Json<Value> {
    Json(json!({ "success": true, "data": params }))
}

/// `POST /api/echo`: returns the JSON body as the handler sees it.
pub async fn echo_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Json<Value>, GuardError> {
    match payload {
        Ok(Json(value)) if !value.is_null() => Ok(Json(json!({ "success": true, "data": value }))),
        _ => Err(GuardError::BadRequest("Invalid request body")),
    }
}
