//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fabric_subscriptions_total` (counter): subscribe outcomes (added, present, lock_timeout, failed)
//! - `fabric_unsubscriptions_total` (counter): subscribers removed
//! - `fabric_notifications_total` (counter): broadcasts to paths with a registry
//! - `fabric_deliveries_total` (counter): per-subscriber delivery outcomes
//! - `fabric_lock_timeouts_total` (counter): bounded waits exhausted, by operation
//! - `fabric_registered_paths` (gauge): templates bound to a provider
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_subscription(outcome: &'static str) {
    metrics::counter!("fabric_subscriptions_total", "outcome" => outcome).increment(1);
}

pub fn record_unsubscription() {
    metrics::counter!("fabric_unsubscriptions_total").increment(1);
}

pub fn record_notification() {
    metrics::counter!("fabric_notifications_total").increment(1);
}

pub fn record_delivery(outcome: &'static str) {
    metrics::counter!("fabric_deliveries_total", "outcome" => outcome).increment(1);
}

pub fn record_lock_timeout(operation: &'static str) {
    metrics::counter!("fabric_lock_timeouts_total", "operation" => operation).increment(1);
}

pub fn record_registered_paths(count: usize) {
    metrics::gauge!("fabric_registered_paths").set(count as f64);
}
