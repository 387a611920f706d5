//! Metrics collection and exposition.
//!
//! # Metrics
//! - `context_mapper_requests_total` (counter): mapped requests by method, status
//! - `context_mapper_request_duration_seconds` (histogram): latency by method
//! - `context_mapper_failures_total` (counter): failures escaping the pipeline, by kind
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter serves its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "context_mapper_requests_total";
pub const REQUEST_DURATION: &str = "context_mapper_request_duration_seconds";
pub const FAILURES_TOTAL: &str = "context_mapper_failures_total";

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(REQUESTS_TOTAL, "method" => method.to_string(), "status" => status.to_string()).increment(1);
    histogram!(REQUEST_DURATION, "method" => method.to_string()).record(start.elapsed().as_secs_f64());
}

/// Record one failure that escaped the pipeline.
pub fn record_failure(kind: &'static str) {
    counter!(FAILURES_TOTAL, "kind" => kind).increment(1);
}
