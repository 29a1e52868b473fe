//! Metrics collection and exposition.
//!
//! # Metrics
//! - `conduit_inbound_requests_total` (counter): by method, status
//! - `conduit_inbound_request_duration_seconds` (histogram)
//! - `conduit_outbound_requests_total` (counter): by method, status
//!
//! # Design Decisions
//! - Low-overhead updates (atomic operations in the recorder)
//! - Prometheus exposition is optional; recording without an installed
//!   exporter is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        tracing::error!(error = %e, "failed to install metrics exporter");
    } else {
        tracing::info!(address = %addr, "metrics exporter listening");
    }
}

/// Record one dispatched inbound request.
pub fn record_inbound(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("conduit_inbound_requests_total", &labels).increment(1);
    metrics::histogram!("conduit_inbound_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record one executed outbound request.
pub fn record_outbound(method: &str, status: u16) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("conduit_outbound_requests_total", &labels).increment(1);
}
