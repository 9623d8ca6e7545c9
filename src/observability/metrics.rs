//! Metrics collection and exposition.
//!
//! # Metrics
//! - `notify_proxy_pairs_opened_total` (counter)
//! - `notify_proxy_pairs_closed_total` (counter): by `reason`
//! - `notify_proxy_active_pairs` (gauge)
//! - `notify_proxy_backend_connect_failures_total` (counter)
//! - `notify_proxy_exchanges_total` (counter): correlated request/response pairs
//! - `notify_proxy_notifications_total` (counter): by `outcome`
//!   (`delivered`, `failed`, `dropped`)

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_pair_opened() {
    metrics::counter!("notify_proxy_pairs_opened_total").increment(1);
    metrics::gauge!("notify_proxy_active_pairs").increment(1.0);
}

pub fn record_pair_closed(reason: &'static str) {
    metrics::counter!("notify_proxy_pairs_closed_total", "reason" => reason).increment(1);
    metrics::gauge!("notify_proxy_active_pairs").decrement(1.0);
}

pub fn record_connect_failure() {
    metrics::counter!("notify_proxy_backend_connect_failures_total").increment(1);
}

pub fn record_exchanges(count: usize) {
    metrics::counter!("notify_proxy_exchanges_total").increment(count as u64);
}

pub fn record_notification(outcome: &'static str) {
    metrics::counter!("notify_proxy_notifications_total", "outcome" => outcome).increment(1);
}
