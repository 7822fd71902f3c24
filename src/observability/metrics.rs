//! Metrics collection and exposition.
//!
//! # Metrics
//! - `custody_flows_total` (counter): orchestrator flows by flow name and outcome
//! - `custody_relay_requests_total` (counter): relay calls by operation and outcome
//! - `custody_signer_calls_total` (counter): provider calls by operation and outcome
//! - `custody_proposals_cached` (gauge): proposals in the current repository view
//!
//! Recording is a no-op until a recorder is installed; the binary installs the
//! Prometheus exporter when `observability.metrics_enabled` is set.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of an orchestrator flow.
pub fn record_flow(flow: &'static str, outcome: &'static str) {
    counter!("custody_flows_total", "flow" => flow, "outcome" => outcome).increment(1);
}

/// Record a relay request outcome.
pub fn record_relay_request(op: &'static str, outcome: &'static str) {
    counter!("custody_relay_requests_total", "op" => op, "outcome" => outcome).increment(1);
}

/// Record a signer provider call outcome.
pub fn record_signer_call(op: &'static str, outcome: &'static str) {
    counter!("custody_signer_calls_total", "op" => op, "outcome" => outcome).increment(1);
}

/// Record the size of the repository view.
pub fn record_cached_proposals(count: usize) {
    gauge!("custody_proposals_cached").set(count as f64);
}
