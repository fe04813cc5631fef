//! Prometheus metrics for monitoring the bingo server.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener.
//! Recording is a no-op until [`init_metrics`] installs the exporter.
//!
//! # Metrics Categories
//!
//! - **WebSocket Metrics**: Connections, messages sent/received
//! - **Round Metrics**: Registrations, claims, player count
//! - **Admin Metrics**: Admin API requests by endpoint and status
//! - **Rate Limiting Metrics**: Rejected client messages
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bingo_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::registrations_total("accepted");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Record a new WebSocket connection.
pub fn websocket_connection_opened() {
    metrics::counter!("websocket_connections_total").increment(1);
    metrics::gauge!("websocket_connections_active").increment(1.0);
}

/// Record a closed WebSocket connection.
pub fn websocket_connection_closed() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent(event: &'static str) {
    metrics::counter!("websocket_messages_sent", "event" => event).increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

// ============================================================================
// Round Metrics
// ============================================================================

/// Record a registration attempt by outcome.
pub fn registrations_total(outcome: &'static str) {
    metrics::counter!("registrations_total", "outcome" => outcome).increment(1);
}

/// Record a bingo claim by outcome.
pub fn claims_total(outcome: &'static str) {
    metrics::counter!("claims_total", "outcome" => outcome).increment(1);
}

/// Set current registered player count.
pub fn active_players(count: usize) {
    metrics::gauge!("active_players").set(count as f64);
}

// ============================================================================
// Admin Metrics
// ============================================================================

/// Record an admin API request.
pub fn admin_requests_total(endpoint: &'static str, status: u16) {
    metrics::counter!("admin_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Rate Limiting Metrics
// ============================================================================

/// Increment rate limit hits counter.
pub fn rate_limit_hits_total(limiter: &'static str) {
    metrics::counter!("rate_limit_hits_total", "limiter" => limiter).increment(1);
}
