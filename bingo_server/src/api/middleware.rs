//! Bearer-secret middleware for the admin routes.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use bingo_server::api::middleware::admin_auth_middleware;
//! # use bingo_server::api::AppState;
//! # async fn handler() {}
//! # let state: AppState = unimplemented!();
//!
//! let admin_routes: Router<AppState> = Router::new()
//!     .route("/list-users", get(handler))
//!     .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));
//! # let _ = admin_routes;
//! ```

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use subtle::ConstantTimeEq;

use super::AppState;
use crate::{logging::log_security_event, metrics};

/// Reject admin requests without `Authorization: Bearer <ADMIN_SECRET>`.
///
/// # Behavior
///
/// - **Match**: Calls the next handler
/// - **Missing header, wrong scheme or wrong secret**: `403 {"error":"Forbidden"}`
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let rejection = match token {
        Some(token) if secret_matches(token, &state.admin_secret) => None,
        Some(_) => Some("Admin request with wrong bearer secret"),
        None => Some("Admin request without bearer secret"),
    };

    match rejection {
        None => next.run(request).await,
        Some(message) => forbidden(request.uri().path(), message),
    }
}

/// Constant-time comparison of the presented token with the secret
fn secret_matches(token: &str, secret: &str) -> bool {
    token.as_bytes().ct_eq(secret.as_bytes()).into()
}

fn forbidden(path: &str, message: &str) -> Response {
    log_security_event("admin_auth_failed", Some(path), message);
    metrics::admin_requests_total("forbidden", StatusCode::FORBIDDEN.as_u16());
    (StatusCode::FORBIDDEN, Json(json!({ "error": "Forbidden" }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_matches() {
        assert!(secret_matches("s3cret-admin", "s3cret-admin"));
        assert!(!secret_matches("s3cret-admiN", "s3cret-admin"));
        assert!(!secret_matches("s3cret", "s3cret-admin"));
        assert!(!secret_matches("", "s3cret-admin"));
    }
}
