//! Metrics collection and exposition.
//!
//! # Metrics
//! - `retry_storm_admissions_total` (counter): admission decisions by outcome
//! - `retry_storm_capacity_available` (gauge): free admission slots
//! - `retry_storm_requests_total` (counter): service responses by status
//! - `retry_storm_request_duration_seconds` (histogram): service latency
//! - `retry_storm_retries_total` (counter): scheduled retries by policy
//! - `retry_storm_retry_delay_seconds` (histogram): computed waits by policy
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!("retry_storm_admissions_total", "Admission decisions");
    ::metrics::describe_gauge!("retry_storm_capacity_available", "Free admission slots");
    ::metrics::describe_counter!("retry_storm_requests_total", "Service responses");
    ::metrics::describe_histogram!("retry_storm_request_duration_seconds", "Service latency");
    ::metrics::describe_counter!("retry_storm_retries_total", "Scheduled retries");
    ::metrics::describe_histogram!("retry_storm_retry_delay_seconds", "Computed retry waits");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_admission(accepted: bool) {
    let decision = if accepted { "accepted" } else { "rejected" };
    ::metrics::counter!("retry_storm_admissions_total", "decision" => decision).increment(1);
}

pub fn record_capacity(available: usize) {
    ::metrics::gauge!("retry_storm_capacity_available").set(available as f64);
}

pub fn record_request(status: u16, start: Instant) {
    ::metrics::counter!("retry_storm_requests_total", "status" => status.to_string()).increment(1);
    ::metrics::histogram!("retry_storm_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(policy: &'static str, delay: Duration) {
    ::metrics::counter!("retry_storm_retries_total", "policy" => policy).increment(1);
    ::metrics::histogram!("retry_storm_retry_delay_seconds", "policy" => policy)
        .record(delay.as_secs_f64());
}
