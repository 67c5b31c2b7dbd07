use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::GuardError;
use crate::http::request::bearer_token;
use crate::http::server::AppState;
use crate::observability::{AuditContext, SecurityEvent};
use crate::security::token::constant_time_eq;

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let config = state.config.load_full();

    if let Some(token) = bearer_token(request.headers()) {
        if constant_time_eq(token, &config.admin.api_key) {
            return next.run(request).await;
        }
    }

    AuditContext::from_request(&request).record(SecurityEvent::AdminAuthFailed);
    GuardError::Unauthorized.into_response()
}
