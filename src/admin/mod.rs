//! Admin API.
//!
//! Bearer-key protected inspection of guard state and manual unlock of
//! locked accounts. Mounted only when `[admin] enabled = true`.

pub mod auth;
pub mod handlers;

use axum::routing::{delete, get};
use axum::{middleware, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/guards", get(get_guards))
        .route("/admin/lockouts/{email}", delete(unlock_account))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
