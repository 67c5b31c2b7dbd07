//! Extractors that apply the sanitizer to values the middleware cannot
//! rewrite.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::http::error::GuardError;
use crate::http::server::AppState;
use crate::observability::{AuditContext, SecurityEvent};

/// Path parameters after injection detection and sanitization.
///
/// Routing matches on the raw path, so parameters are cleaned here, after
/// the router has captured them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedParams(pub HashMap<String, String>);

impl SanitizedParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl FromRequestParts<AppState> for SanitizedParams {
    type Rejection = GuardError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| GuardError::BadRequest("Invalid path parameters"))?;

        let sanitizer = state.sanitizer.load_full();
        let mut params = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            if let Some(threat) = sanitizer.scan_text(&value) {
                AuditContext::from_parts(parts).record(SecurityEvent::InjectionDetected(threat));
                return Err(GuardError::InjectionDetected);
            }
            params.insert(name, sanitizer.sanitize_str(&value));
        }
        Ok(SanitizedParams(params))
    }
}
