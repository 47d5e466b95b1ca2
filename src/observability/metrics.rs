//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hub_auth_decisions_total` (counter): validation outcomes by component
//! - `hub_xsrf_checks_total` (counter): XSRF verification outcomes
//! - `hub_api_tokens_total` (counter): token issue/revoke events
//! - `hub_auth_cache_total` (counter): client cookie cache hits/misses
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(component: &'static str, outcome: &'static str) {
    metrics::counter!("hub_auth_decisions_total", "component" => component, "outcome" => outcome)
        .increment(1);
}

pub fn record_xsrf_check(outcome: &'static str) {
    metrics::counter!("hub_xsrf_checks_total", "outcome" => outcome).increment(1);
}

pub fn record_token_event(event: &'static str) {
    metrics::counter!("hub_api_tokens_total", "event" => event).increment(1);
}

pub fn record_cache(result: &'static str) {
    metrics::counter!("hub_auth_cache_total", "result" => result).increment(1);
}
