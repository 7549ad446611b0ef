//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define application metrics (requests, latency, logins)
//! - Expose a Prometheus-compatible endpoint when enabled
//!
//! # Metrics
//! - `app_requests_total` (counter): requests by resolution strategy, status
//! - `app_request_duration_seconds` (histogram): dispatch latency
//! - `app_login_attempts_total` (counter): form logins by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: never paths or usernames

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must run inside the Tokio runtime. Failure is logged, not fatal.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, strategy: &'static str, start: Instant) {
    metrics::counter!(
        "app_requests_total",
        "method" => method.to_string(),
        "strategy" => strategy,
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!("app_request_duration_seconds", "strategy" => strategy)
        .record(start.elapsed().as_secs_f64());
}

/// Record one form login attempt.
pub fn record_login(outcome: &'static str) {
    metrics::counter!("app_login_attempts_total", "outcome" => outcome).increment(1);
}
