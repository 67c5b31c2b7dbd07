//! Client-facing errors.
//!
//! Every guard rejection is rendered as
//! `{"success":false,"error":…,"error_code":…}` with a fixed, generic
//! message. Rejected input is never echoed back.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("CSRF token required")]
    CsrfTokenMissing,

    #[error("CSRF validation failed")]
    CsrfValidationFailed,

    #[error("Origin not allowed")]
    OriginRejected,

    #[error("Request contains disallowed content")]
    InjectionDetected,

    #[error("Too many attempts. Please try again later.")]
    TooManyAttempts,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Internal server error")]
    Internal,
}

impl GuardError {
    pub fn status(&self) -> StatusCode {
        match self {
            GuardError::CsrfTokenMissing
            | GuardError::CsrfValidationFailed
            | GuardError::OriginRejected => StatusCode::FORBIDDEN,
            GuardError::InjectionDetected | GuardError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GuardError::TooManyAttempts
            | GuardError::InvalidCredentials
            | GuardError::Unauthorized => StatusCode::UNAUTHORIZED,
            GuardError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GuardError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GuardError::CsrfTokenMissing => "CSRF_TOKEN_MISSING",
            GuardError::CsrfValidationFailed => "CSRF_VALIDATION_FAILED",
            GuardError::OriginRejected => "ORIGIN_NOT_ALLOWED",
            GuardError::InjectionDetected => "INVALID_INPUT",
            GuardError::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            GuardError::InvalidCredentials => "INVALID_CREDENTIALS",
            GuardError::Unauthorized => "UNAUTHORIZED",
            GuardError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            GuardError::BadRequest(_) => "BAD_REQUEST",
            GuardError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.to_string(),
            "error_code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}
