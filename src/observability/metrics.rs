//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): requests by operation, status
//! - `gate_request_duration_seconds` (histogram): time to response head
//! - `gate_auth_rejections_total` (counter): rejections by reason
//! - `gate_streams_total` (counter): streaming outcomes by operation
//! - `gate_upstream_sockets_in_use` (gauge): held backend socket slots
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request (or a committed stream head).
pub fn record_request(operation: &'static str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gate_requests_total",
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gate_request_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_rejection(reason: &'static str) {
    ::metrics::counter!("gate_auth_rejections_total", "reason" => reason).increment(1);
}

/// Outcome is one of `completed`, `failed`, `caller_gone`.
pub fn record_stream(operation: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "gate_streams_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_sockets_in_use(count: usize) {
    ::metrics::gauge!("gate_upstream_sockets_in_use").set(count as f64);
}
