//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (request count, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `tessera_requests_total` (counter): requests by method, route, status
//! - `tessera_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Route label is the registered pattern, never the raw path
//! - Recording without an installed exporter is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Route label used when no route matched.
pub const UNMATCHED_ROUTE: &str = "none";

/// Start the Prometheus exporter on `addr`. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let method = method.to_string();
    let route = route.to_string();
    let status = status.to_string();
    counter!(
        "tessera_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "tessera_request_duration_seconds",
        "method" => method,
        "route" => route,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}
