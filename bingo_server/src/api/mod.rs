//! HTTP/WebSocket API for the bingo server.
//!
//! # Modules
//!
//! - [`websocket`]: The game connection; every client speaks JSON over `/ws`
//! - [`admin`]: Balance administration behind a bearer secret
//! - [`middleware`]: Admin bearer check
//! - [`rate_limiter`]: Per-connection message rate limiting
//!
//! # Endpoints
//!
//! ```text
//! GET  /health                          - Health check (public)
//! GET  /ws                              - WebSocket game connection (public)
//! GET  /admin/list-users                - All balances (admin)
//! GET  /admin/get-balance?username=     - One balance (admin)
//! POST /admin/update-balance            - Overwrite a balance (admin)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bingo::{LedgerGateway, MemoryLedgerStore, RoundActor, RoundConfig};
//! use bingo_server::api::{AppState, create_router};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let ledger = LedgerGateway::new(Arc::new(MemoryLedgerStore::new()), 100);
//! let (actor, round) = RoundActor::new(RoundConfig::default(), ledger.clone());
//! tokio::spawn(actor.run());
//!
//! let app = create_router(AppState::new(round, ledger, "change-me-please"));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod admin;
pub mod middleware;
pub mod rate_limiter;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use bingo::{LedgerGateway, RoundHandle};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned for each request; every field is a handle.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the round actor
    pub round: RoundHandle,
    /// Balance gateway, used directly by read-only admin routes
    pub ledger: LedgerGateway,
    /// Bearer secret for `/admin`
    pub admin_secret: Arc<str>,
}

impl AppState {
    pub fn new(round: RoundHandle, ledger: LedgerGateway, admin_secret: impl Into<Arc<str>>) -> Self {
        Self {
            round,
            ledger,
            admin_secret: admin_secret.into(),
        }
    }
}

/// Create the complete router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/list-users", get(admin::list_users))
        .route("/get-balance", get(admin::get_balance))
        .route("/update-balance", post(admin::update_balance))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .nest("/admin", admin_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the round actor answers and the ledger is reachable,
/// `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","phase":"calling","player_count":3,"called_count":12,"ledger":true,...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let ledger_healthy = match state.ledger.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Ledger health check failed: {}", e);
            false
        }
    };

    let snapshot = state.round.snapshot().await.ok();
    let overall_healthy = ledger_healthy && snapshot.is_some();

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "ledger": ledger_healthy,
        "round": snapshot.as_ref().map(|s| json!({
            "phase": s.phase,
            "player_count": s.player_count,
            "called_count": s.called_numbers.len(),
            "pot": s.pot,
        })),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
