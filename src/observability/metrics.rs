//! Metrics collection and exposition.
//!
//! # Metrics
//! - `debug_proxy_exchanges_total` (counter): captured exchanges by method, status
//! - `debug_proxy_exchange_duration_seconds` (histogram): round-trip latency
//! - `debug_proxy_forward_errors_total` (counter): failed forwards by kind
//! - `debug_proxy_observers` (gauge): connected live-feed observers
//! - `debug_proxy_observers_dropped_total` (counter): observers cut for a full queue
//! - `debug_proxy_broadcasts_dropped_total` (counter): messages dropped at the hub inbox
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_exchange(method: &str, status: u16, duration: Duration) {
    metrics::counter!(
        "debug_proxy_exchanges_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("debug_proxy_exchange_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_forward_error(kind: &'static str) {
    metrics::counter!("debug_proxy_forward_errors_total", "kind" => kind).increment(1);
}

pub fn set_observers(count: usize) {
    metrics::gauge!("debug_proxy_observers").set(count as f64);
}

pub fn record_observer_dropped() {
    metrics::counter!("debug_proxy_observers_dropped_total").increment(1);
}

pub fn record_broadcast_dropped() {
    metrics::counter!("debug_proxy_broadcasts_dropped_total").increment(1);
}
