//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; those records are
//! forwarded into the tracing subscriber installed here.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use bingo_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `peer` - Optional remote address or connection id
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use bingo_server::logging::log_security_event;
///
/// log_security_event("admin_auth_failed", Some("192.168.1.1"), "Bad bearer token");
/// ```
pub fn log_security_event(event_type: &str, peer: Option<&str>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        peer = peer,
        "SECURITY: {}",
        message
    );
}

/// Log an admin API call that changed or read balances
///
/// # Arguments
///
/// * `action` - Endpoint name
/// * `username` - Affected user, if any
/// * `status_code` - Response status code
pub fn log_admin_action(action: &str, username: Option<&str>, status_code: u16) {
    tracing::info!(
        admin_action = action,
        username = username,
        http_status = status_code,
        "Admin request completed"
    );
}
