//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resilience_cache_lookups_total` (counter): lookups by outcome (hit/miss)
//! - `resilience_cache_entries` (gauge): entries per generation
//! - `resilience_network_fetches_total` (counter): network fetches by result
//! - `resilience_fallback_served_total` (counter): offline navigation fallbacks
//! - `resilience_rollovers_total` (counter): generation activations by result
//! - `resilience_stream_connect_attempts_total` (counter)
//! - `resilience_stream_messages_total` (counter): by direction
//! - `resilience_stream_state` (gauge): 0=disconnected 1=connecting 2=open 3=closing
//! - `resilience_outbox_dropped_total` (counter)
//! - `resilience_retry_decisions_total` (counter): by failure class and verdict
//! - `gateway_requests_total` / `gateway_request_duration_seconds`
//!
//! Without an installed recorder every call is a no-op, so library users and
//! tests pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cache_lookup(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("resilience_cache_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_entries(generation: &str, entries: usize) {
    gauge!("resilience_cache_entries", "generation" => generation.to_string()).set(entries as f64);
}

pub fn record_network_fetch(result: &'static str) {
    counter!("resilience_network_fetches_total", "result" => result).increment(1);
}

pub fn record_fallback_served() {
    counter!("resilience_fallback_served_total").increment(1);
}

pub fn record_rollover(result: &'static str) {
    counter!("resilience_rollovers_total", "result" => result).increment(1);
}

pub fn record_stream_connect_attempt() {
    counter!("resilience_stream_connect_attempts_total").increment(1);
}

pub fn record_stream_message(direction: &'static str) {
    counter!("resilience_stream_messages_total", "direction" => direction).increment(1);
}

pub fn record_stream_state(code: u8) {
    gauge!("resilience_stream_state").set(code as f64);
}

pub fn record_outbox_dropped() {
    counter!("resilience_outbox_dropped_total").increment(1);
}

pub fn record_retry_decision(class: &'static str, retry: bool) {
    let verdict = if retry { "retry" } else { "give_up" };
    counter!("resilience_retry_decisions_total", "class" => class, "verdict" => verdict).increment(1);
}

/// Record one gateway request with its status and where the response came from.
pub fn record_request(method: &str, status: u16, source: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(
        "gateway_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "source" => source
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method,
        "status" => status,
        "source" => source
    )
    .record(start.elapsed().as_secs_f64());
}
