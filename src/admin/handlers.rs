use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Environment;
use crate::http::error::GuardError;
use crate::http::extract::SanitizedParams;
use crate::http::server::AppState;
use crate::sanitize::sanitize_log_line;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub environment: Environment,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct LockoutSummary {
    pub tracked: usize,
    pub locked: usize,
    pub max_attempts: u32,
    pub lockout_duration_secs: u64,
}

#[derive(Serialize)]
pub struct GuardSummary {
    pub lockouts: LockoutSummary,
    pub csrf_tokens: usize,
    pub sessions: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        environment: state.config.load().environment,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_guards(State(state): State<AppState>) -> Json<GuardSummary> {
    let policy = state.login_guard.policy();
    Json(GuardSummary {
        lockouts: LockoutSummary {
            tracked: state.login_guard.tracked(),
            locked: state.login_guard.locked_count(),
            max_attempts: policy.max_attempts,
            lockout_duration_secs: policy.lockout_duration.as_secs(),
        },
        csrf_tokens: state.csrf.len(),
        sessions: state.sessions.len(),
    })
}

/// `DELETE /admin/lockouts/{email}`
pub async fn unlock_account(
    State(state): State<AppState>,
    params: SanitizedParams,
) -> Result<Json<Value>, GuardError> {
    let email = params
        .get("email")
        .ok_or(GuardError::BadRequest("Missing email"))?;

    let cleared = state.login_guard.clear(email);
    tracing::info!(user = %sanitize_log_line(email), cleared, "Admin unlock");
    Ok(Json(json!({ "success": true, "cleared": cleared })))
}
