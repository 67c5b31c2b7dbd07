//! Request guard middleware.
//!
//! # Data Flow
//! ```text
//! request
//!     → track_metrics (count + latency)
//!     → sanitize.rs (detect on raw input → 400, rewrite query/body)
//!     → csrf.rs (state-changing methods: double-submit / bearer origin /
//!                session token → 403)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Each middleware loads the current config snapshot once per request
//! - Rejections are audited where they are decided, then rendered by GuardError

pub mod csrf;
pub mod sanitize;

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::observability::metrics;

pub use csrf::csrf_middleware;
pub use sanitize::sanitize_middleware;

/// Segment-aware prefix match: `/auth/login` covers `/auth/login` and
/// `/auth/login/…` but not `/auth/loginx`.
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    if prefix.ends_with('/') {
        return path.starts_with(prefix);
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
