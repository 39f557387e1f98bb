//! Metrics collection and exposition.
//!
//! # Metrics
//! - `playground_requests_total` (counter): requests by method, status, response kind
//! - `playground_request_duration_seconds` (histogram): handler latency
//! - `playground_scan_duration_seconds` (histogram): directory scan latency
//! - `playground_routes` (gauge): routes found by the last scan
//! - `playground_live_streams` (gauge): open live connections
//! - `playground_live_patches_total` (counter): fragments pushed to live connections
//! - `playground_bridge_published_total` (counter): signal payloads published, by scope
//! - `playground_bridge_received_total` (counter): signal payloads merged into live streams
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

fn describe_metrics() {
    describe_counter!("playground_requests_total", "Playground requests by method, status and kind");
    describe_histogram!("playground_request_duration_seconds", "Time spent building a playground response");
    describe_histogram!("playground_scan_duration_seconds", "Time spent scanning the playground directory");
    describe_gauge!("playground_routes", "Routes found by the most recent scan");
    describe_gauge!("playground_live_streams", "Currently open live connections");
    describe_counter!("playground_live_patches_total", "Fragments pushed to live connections");
    describe_counter!("playground_bridge_published_total", "Signal payloads published to the bridge");
    describe_counter!("playground_bridge_received_total", "Signal payloads merged into live connections");
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, kind: &'static str, start: Instant) {
    counter!(
        "playground_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "kind" => kind
    )
    .increment(1);
    histogram!("playground_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

/// Record a finished directory scan.
pub fn record_scan(routes: usize, start: Instant) {
    histogram!("playground_scan_duration_seconds").record(start.elapsed().as_secs_f64());
    gauge!("playground_routes").set(routes as f64);
}

pub fn live_stream_opened() {
    gauge!("playground_live_streams").increment(1.0);
}

pub fn live_stream_closed() {
    gauge!("playground_live_streams").decrement(1.0);
}

pub fn record_patch() {
    counter!("playground_live_patches_total").increment(1);
}

/// Record a bridge publish; `scope` is `session` or `tab`.
pub fn record_bridge_publish(scope: &'static str) {
    counter!("playground_bridge_published_total", "scope" => scope).increment(1);
}

pub fn record_bridge_received() {
    counter!("playground_bridge_received_total").increment(1);
}
