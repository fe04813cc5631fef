//! HTTP and WebSocket front end for the shared bingo round.
//!
//! - [`api`]: axum router with the `/ws` game socket, `/health` and the admin API
//! - [`config`]: environment-driven server configuration
//! - [`logging`]: tracing subscriber setup
//! - [`metrics`]: Prometheus metrics

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
