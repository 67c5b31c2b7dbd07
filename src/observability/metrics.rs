//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_total` (counter): requests by method, status
//! - `guard_request_duration_seconds` (histogram): latency distribution
//! - `guard_rejections_total` (counter): guard denials by reason
//! - `guard_logins_total` (counter): login attempts by outcome
//! - `guard_lockouts_tracked`, `guard_csrf_tokens`, `guard_sessions` (gauges)
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels are bounded sets (method, status class, fixed reasons)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with its own HTTP listener.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    ::metrics::counter!("guard_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    ::metrics::histogram!("guard_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// `reason` is one of the fixed audit event names.
pub fn record_rejection(reason: &'static str) {
    ::metrics::counter!("guard_rejections_total", "reason" => reason).increment(1);
}

pub fn record_login(outcome: &'static str) {
    ::metrics::counter!("guard_logins_total", "outcome" => outcome).increment(1);
}

pub fn record_store_sizes(lockouts: usize, csrf_tokens: usize, sessions: usize) {
    ::metrics::gauge!("guard_lockouts_tracked").set(lockouts as f64);
    ::metrics::gauge!("guard_csrf_tokens").set(csrf_tokens as f64);
    ::metrics::gauge!("guard_sessions").set(sessions as f64);
}
