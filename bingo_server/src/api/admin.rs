//! Admin balance endpoints.
//!
//! All routes sit behind [`super::middleware::admin_auth_middleware`].
//! Reads go straight to the ledger; writes go through the round actor so
//! live sessions see the new balance.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bingo::{LedgerError, round::RoundError};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::AppState;
use crate::{logging::log_admin_action, metrics};

const INVALID_UPDATE: &str = "Invalid username or amount";

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBalanceRequest {
    pub username: String,
    pub amount: i64,
}

fn error_response(endpoint: &'static str, status: StatusCode, message: &str) -> Response {
    metrics::admin_requests_total(endpoint, status.as_u16());
    (status, Json(json!({ "error": message }))).into_response()
}

fn ok_response(endpoint: &'static str, body: Value) -> Response {
    metrics::admin_requests_total(endpoint, StatusCode::OK.as_u16());
    (StatusCode::OK, Json(body)).into_response()
}

/// List every stored balance.
///
/// `GET /admin/list-users` → `{"users": {"alice": {"balance": 90}}}`
///
/// Balances are returned raw, so damaged records show up as stored.
pub async fn list_users(State(state): State<AppState>) -> Response {
    const ENDPOINT: &str = "list-users";

    match state.ledger.entries().await {
        Ok(entries) => {
            let users: Map<String, Value> = entries
                .into_iter()
                .map(|entry| (entry.username, json!({ "balance": entry.balance })))
                .collect();
            log_admin_action(ENDPOINT, None, 200);
            ok_response(ENDPOINT, json!({ "users": users }))
        }
        Err(e) => {
            log::error!("Failed to list balances: {}", e);
            error_response(
                ENDPOINT,
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.client_message(),
            )
        }
    }
}

/// Read one stored balance.
///
/// `GET /admin/get-balance?username=alice` → `{"balance": 90}`, or 404
/// `{"error": "User not found"}`.
pub async fn get_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Response {
    const ENDPOINT: &str = "get-balance";

    let Some(username) = query.username.filter(|u| !u.is_empty()) else {
        return error_response(ENDPOINT, StatusCode::NOT_FOUND, "User not found");
    };

    match state.ledger.store().read(&username).await {
        Ok(Some(balance)) => {
            log_admin_action(ENDPOINT, Some(&username), 200);
            ok_response(ENDPOINT, json!({ "balance": balance }))
        }
        Ok(None) => error_response(ENDPOINT, StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            log::error!("Failed to read balance for {}: {}", username, e);
            error_response(
                ENDPOINT,
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.client_message(),
            )
        }
    }
}

/// Overwrite a balance and push it to the user's live sessions.
///
/// `POST /admin/update-balance {"username": "alice", "amount": 500}` →
/// `{"success": true}`
pub async fn update_balance(
    State(state): State<AppState>,
    payload: Result<Json<UpdateBalanceRequest>, JsonRejection>,
) -> Response {
    const ENDPOINT: &str = "update-balance";

    let request = match payload {
        Ok(Json(request)) if !request.username.trim().is_empty() => request,
        Ok(_) => return error_response(ENDPOINT, StatusCode::BAD_REQUEST, INVALID_UPDATE),
        Err(rejection) => {
            log::debug!("Rejected balance update body: {}", rejection);
            return error_response(ENDPOINT, StatusCode::BAD_REQUEST, INVALID_UPDATE);
        }
    };

    match state
        .round
        .push_balance(request.username.clone(), request.amount)
        .await
    {
        Ok(Ok(notified)) => {
            log::info!(
                "Admin set balance of {} to {} ({} live sessions)",
                request.username,
                request.amount,
                notified
            );
            log_admin_action(ENDPOINT, Some(&request.username), 200);
            ok_response(ENDPOINT, json!({ "success": true }))
        }
        Ok(Err(LedgerError::InvalidAmount(_))) => {
            error_response(ENDPOINT, StatusCode::BAD_REQUEST, INVALID_UPDATE)
        }
        Ok(Err(e)) => {
            log::error!("Failed to set balance for {}: {}", request.username, e);
            error_response(
                ENDPOINT,
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.client_message(),
            )
        }
        Err(RoundError::Closed) => error_response(
            ENDPOINT,
            StatusCode::SERVICE_UNAVAILABLE,
            "Round is not running",
        ),
    }
}
