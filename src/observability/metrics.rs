//! Metrics collection and exposition.
//!
//! # Metrics
//! - `log_bridge_envelopes_total` (counter): envelopes received, by event and status
//! - `log_bridge_rate_limited_total` (counter): rejected by the per-IP quota
//! - `log_bridge_dispatch_total` (counter): dispatched events, by side and outcome
//! - `log_bridge_instrumented_calls_total` (counter): wrapped calls, by library and outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus exporter is optional and only started by the server binary

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_envelope(event: &str, status: u16) {
    counter!(
        "log_bridge_envelopes_total",
        "event" => event.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_rate_limited() {
    counter!("log_bridge_rate_limited_total").increment(1);
}

pub fn record_dispatch(side: &'static str, outcome: &'static str) {
    counter!("log_bridge_dispatch_total", "side" => side, "outcome" => outcome).increment(1);
}

pub fn record_instrumented_call(library: &str, outcome: &'static str) {
    counter!(
        "log_bridge_instrumented_calls_total",
        "library" => library.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
