//! HTTP integration tests: health check and the admin API.
//!
//! Every test runs against the in-memory ledger, so no database is needed.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bingo::{
    ConnectionId, LedgerGateway, MemoryLedgerStore, RoundActor, RoundConfig, RoundHandle,
    ServerEvent,
};
use bingo_server::api::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tower::ServiceExt; // For `oneshot` method

const SECRET: &str = "test-admin-secret";

/// Helper to create a test server backed by `store`
fn create_test_server(store: MemoryLedgerStore) -> (axum::Router, RoundHandle) {
    let ledger = LedgerGateway::new(Arc::new(store), 100);
    let (actor, round) = RoundActor::new(RoundConfig::default(), ledger.clone());
    tokio::spawn(actor.run());

    let app = create_router(AppState::new(round.clone(), ledger, SECRET));
    (app, round)
}

fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
        .body(Body::empty())
        .unwrap()
}

fn admin_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let (app, _round) = create_test_server(MemoryLedgerStore::new());

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["ledger"], true);
    assert_eq!(json["round"]["phase"], "idle");
    assert_eq!(json["round"]["player_count"], 0);
}

#[tokio::test]
async fn test_health_check_reports_stopped_round() {
    let ledger = LedgerGateway::new(Arc::new(MemoryLedgerStore::new()), 100);
    let (sender, receiver) = mpsc::channel(1);
    drop(receiver);
    let app = create_router(AppState::new(RoundHandle::new(sender), ledger, SECRET));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_admin_requires_bearer_secret() {
    let (app, _round) = create_test_server(MemoryLedgerStore::new());

    let missing = Request::builder()
        .uri("/admin/list-users")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await, json!({ "error": "Forbidden" }));

    let wrong = Request::builder()
        .uri("/admin/list-users")
        .header(header::AUTHORIZATION, "Bearer not-the-secret")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let basic = Request::builder()
        .method("POST")
        .uri("/admin/update-balance")
        .header(header::AUTHORIZATION, format!("Basic {SECRET}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"alice","amount":5}"#))
        .unwrap();
    let response = app.oneshot(basic).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_users_returns_raw_balances() {
    let store = MemoryLedgerStore::new()
        .with_raw("alice", json!(90))
        .with_raw("broken", json!("oops"));
    let (app, _round) = create_test_server(store);

    let response = app.oneshot(admin_get("/admin/list-users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "users": {
                "alice": { "balance": 90 },
                "broken": { "balance": "oops" }
            }
        })
    );
}

#[tokio::test]
async fn test_get_balance() {
    let (app, _round) = create_test_server(MemoryLedgerStore::new().with_raw("alice", json!(42)));

    let response = app
        .clone()
        .oneshot(admin_get("/admin/get-balance?username=alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "balance": 42 }));

    let response = app
        .clone()
        .oneshot(admin_get("/admin/get-balance?username=nobody"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "error": "User not found" }));

    let response = app.oneshot(admin_get("/admin/get-balance")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_balance_rejects_bad_bodies() {
    let (app, _round) = create_test_server(MemoryLedgerStore::new());

    for body in [
        "not json",
        r#"{"username":"alice"}"#,
        r#"{"username":"alice","amount":"lots"}"#,
        r#"{"username":"","amount":5}"#,
        r#"{"username":"alice","amount":-5}"#,
    ] {
        let response = app
            .clone()
            .oneshot(admin_post("/admin/update-balance", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Invalid username or amount" })
        );
    }
}

#[tokio::test]
async fn test_update_balance_writes_and_pushes_to_live_session() {
    let (app, round) = create_test_server(MemoryLedgerStore::new());

    let connection = ConnectionId::new();
    let mut events = round.connect(connection).await.unwrap();
    let registration = round.register(connection, "alice", 77).await.unwrap().unwrap();
    assert_eq!(registration.balance, 90);

    let response = app
        .clone()
        .oneshot(admin_post(
            "/admin/update-balance",
            r#"{"username":"alice","amount":500}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true }));

    // Skip init, registration and roster events until the override arrives
    let pushed = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(event) = events.recv().await {
            if event == (ServerEvent::BalanceUpdate { balance: 500 }) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(pushed, "live session should receive the new balance");

    let response = app
        .oneshot(admin_get("/admin/get-balance?username=alice"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({ "balance": 500 }));
}

#[tokio::test]
async fn test_404_for_invalid_endpoint() {
    let (app, _round) = create_test_server(MemoryLedgerStore::new());

    let request = Request::builder()
        .uri("/admin/delete-everything")
        .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
