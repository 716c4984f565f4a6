//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): connections by chain and outcome
//! - `proxy_upstream_duration_seconds` (histogram): gateway call latency
//! - `proxy_active_connections` (gauge): open connections per chain
//! - `proxy_chain_probe` (gauge): 1=startup probe succeeded, 0=failed
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are chain name and outcome only

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Count one finished connection.
pub fn record_request(chain: &'static str, outcome: &'static str) {
    metrics::counter!("proxy_requests_total", "chain" => chain, "outcome" => outcome).increment(1);
}

pub fn record_upstream_duration(chain: &'static str, seconds: f64) {
    metrics::histogram!("proxy_upstream_duration_seconds", "chain" => chain).record(seconds);
}

pub fn connection_opened(chain: &'static str) {
    metrics::gauge!("proxy_active_connections", "chain" => chain).increment(1.0);
}

pub fn connection_closed(chain: &'static str) {
    metrics::gauge!("proxy_active_connections", "chain" => chain).decrement(1.0);
}

pub fn record_chain_probe(chain: &'static str, healthy: bool) {
    metrics::gauge!("proxy_chain_probe", "chain" => chain).set(if healthy { 1.0 } else { 0.0 });
}
