//! Metrics collection and exposition.
//!
//! # Metrics
//! - `panel_requests_total` (counter): requests by method, status
//! - `panel_request_duration_seconds` (histogram): latency by method
//! - `panel_rate_limited_total` (counter): rejections by limiter
//! - `panel_rate_limit_clients` (gauge): tracked client keys by limiter
//! - `panel_auth_rejections_total` (counter): rejections by reason
//! - `panel_resource_samples_total` (counter): samples appended
//! - `panel_resource_sample_failures_total` (counter): failed dimensions
//! - `panel_cpu_percent`, `panel_memory_percent`, `panel_disk_percent` (gauges)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::monitoring::MetricSample;

/// Install the Prometheus recorder with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "panel_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("panel_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(limiter: &'static str) {
    ::metrics::counter!("panel_rate_limited_total", "limiter" => limiter).increment(1);
}

pub fn record_tracked_clients(limiter: &'static str, clients: usize) {
    ::metrics::gauge!("panel_rate_limit_clients", "limiter" => limiter).set(clients as f64);
}

pub fn record_auth_rejection(reason: &'static str) {
    ::metrics::counter!("panel_auth_rejections_total", "reason" => reason).increment(1);
}

pub fn record_resource_sample(sample: &MetricSample) {
    ::metrics::counter!("panel_resource_samples_total").increment(1);
    ::metrics::gauge!("panel_cpu_percent").set(sample.cpu_percent);
    ::metrics::gauge!("panel_memory_percent").set(sample.mem_percent);
    ::metrics::gauge!("panel_disk_percent").set(sample.disk_percent);
}

pub fn record_sample_failure(dimension: &'static str) {
    ::metrics::counter!("panel_resource_sample_failures_total", "dimension" => dimension)
        .increment(1);
}
