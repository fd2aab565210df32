//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency by method, route
//! - `gateway_routes_published` (gauge): routes in the live table
//! - `gateway_reloads_total` (counter): registry reloads by outcome
//!
//! # Design Decisions
//! - Routes are labelled by template, never by concrete path
//! - Without an installed recorder every call is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub mod names {
    pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "gateway_request_duration_seconds";
    pub const ROUTES_PUBLISHED: &str = "gateway_routes_published";
    pub const RELOADS_TOTAL: &str = "gateway_reloads_total";
}

/// Start the Prometheus scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics listener started"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, route: &str, started: Instant) {
    counter!(
        names::REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);

    histogram!(
        names::REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn set_routes_published(count: usize) {
    gauge!(names::ROUTES_PUBLISHED).set(count as f64);
}

/// `outcome` is one of `registered`, `replaced`, `removed`, `skipped`.
pub fn record_reload(outcome: &'static str) {
    counter!(names::RELOADS_TOTAL, "outcome" => outcome).increment(1);
}
