//! Security audit events.
//!
//! Every guard rejection produces exactly one `warn`-level record on the
//! `security_audit` target and bumps `guard_rejections_total`. All
//! user-controlled fields are passed through the log sanitizer first.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, Extensions, HeaderMap, Method, Uri};
use serde::Serialize;

use crate::http::request::{client_ip, header_str, request_id};
use crate::observability::metrics;
use crate::sanitize::detect::ThreatKind;
use crate::sanitize::log::{sanitize_ip, sanitize_log_line, sanitize_user_agent};

pub const AUDIT_TARGET: &str = "security_audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    CsrfTokenMissing,
    CsrfTokenInvalid,
    OriginRejected,
    InjectionDetected(ThreatKind),
    LoginFailed,
    AccountLocked,
    LoginWhileLocked,
    BodyTooLarge,
    AdminAuthFailed,
}

impl SecurityEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SecurityEvent::CsrfTokenMissing => "csrf_token_missing",
            SecurityEvent::CsrfTokenInvalid => "csrf_token_invalid",
            SecurityEvent::OriginRejected => "csrf_origin_rejected",
            SecurityEvent::InjectionDetected(ThreatKind::SqlInjection) => "sql_injection_detected",
            SecurityEvent::InjectionDetected(ThreatKind::Xss) => "xss_detected",
            SecurityEvent::InjectionDetected(ThreatKind::PathTraversal) => {
                "path_traversal_detected"
            }
            SecurityEvent::LoginFailed => "login_failed",
            SecurityEvent::AccountLocked => "account_locked",
            SecurityEvent::LoginWhileLocked => "login_while_locked",
            SecurityEvent::BodyTooLarge => "body_too_large",
            SecurityEvent::AdminAuthFailed => "admin_auth_failed",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SecurityEvent::LoginFailed | SecurityEvent::BodyTooLarge => Severity::Low,
            SecurityEvent::CsrfTokenMissing
            | SecurityEvent::AccountLocked
            | SecurityEvent::LoginWhileLocked
            | SecurityEvent::AdminAuthFailed => Severity::Medium,
            SecurityEvent::CsrfTokenInvalid
            | SecurityEvent::OriginRejected
            | SecurityEvent::InjectionDetected(_) => Severity::High,
        }
    }
}

/// Sanitized request metadata attached to audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub ip: String,
    pub user_agent: String,
    /// Account the event concerns, when known.
    pub subject: Option<String>,
}

impl AuditContext {
    pub fn new(method: &Method, uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        Self {
            request_id: sanitize_log_line(request_id(headers).unwrap_or("-")),
            method: method.as_str().to_string(),
            path: sanitize_log_line(uri.path()),
            ip: sanitize_ip(&client_ip(headers, extensions)),
            user_agent: sanitize_user_agent(
                header_str(headers, header::USER_AGENT.as_str()).unwrap_or("-"),
            ),
            subject: None,
        }
    }

    pub fn from_request<B>(request: &axum::http::Request<B>) -> Self {
        Self::new(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
        )
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(&parts.method, &parts.uri, &parts.headers, &parts.extensions)
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(sanitize_log_line(subject));
        self
    }

    /// Emit one audit record for `event`.
    pub fn record(&self, event: SecurityEvent) {
        let severity = event.severity();
        tracing::warn!(
            target: AUDIT_TARGET,
            event = event.name(),
            severity = severity.as_str(),
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            ip = %self.ip,
            user_agent = %self.user_agent,
            subject = self.subject.as_deref().unwrap_or("-"),
            "Security event"
        );
        metrics::record_rejection(event.name());
    }
}

impl<S> FromRequestParts<S> for AuditContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
