//! WebSocket handler for the shared round.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. The connection is attached to the round and receives `init`
//! 3. Server spawns a send task that forwards round events and local replies
//! 4. The receive loop parses client frames and forwards them to the round
//! 5. On disconnect the player is removed and its seed is freed
//!
//! # Client Messages
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//!
//! ws.send(JSON.stringify({ type: "register", username: "alice", seed: 4242 }));
//! ws.send(JSON.stringify({ type: "checkBingo", marked: [3, 17, "FREE", 50, 61] }));
//! ws.send(JSON.stringify({ type: "endGame" }));
//! ws.send(JSON.stringify({ type: "playAgain" }));
//!
//! ws.onmessage = (event) => {
//!   const { type, data } = JSON.parse(event.data);
//!   // type: init, blocked, balanceUpdate, cardIssued, numberCalled, winner, ...
//! };
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use bingo::{
    card::{Mark, Seed},
    round::{ClaimOutcome, RegistrationError, RoundError},
    session::{ConnectionId, ServerEvent},
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::{AppState, rate_limiter::ConnectionLimits};
use crate::metrics;

/// Capacity of the per-connection channel for replies produced locally
const REPLY_CHANNEL_CAPACITY: usize = 32;

const INVALID_FORMAT: &str = "Invalid message format";

/// Client messages received via WebSocket
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join the current round
    Register { username: String, seed: Seed },

    /// Claim a Bingo with the numbers marked on the card
    CheckBingo { marked: Vec<Mark> },

    /// Leave the round; the connection stays open
    EndGame,

    /// Ask for a fresh board view
    PlayAgain,
}

/// WebSocket upgrade handler.
///
/// No authentication: a player is identified by the username and seed it
/// registers with.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection = ConnectionId::new();
    let (mut sender, mut receiver) = socket.split();

    let mut events = match state.round.connect(connection).await {
        Ok(events) => events,
        Err(e) => {
            error!("Cannot attach connection {}: {}", connection, e);
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    metrics::websocket_connection_opened();
    info!("WebSocket connected: {}", connection);

    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerEvent>(REPLY_CHANNEL_CAPACITY);

    // Forward round events and local replies to the socket
    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(event) = events.recv() => event,
                Some(event) = reply_rx.recv() => event,
                else => break,
            };

            if let ServerEvent::PlayerCount { count } = event {
                metrics::active_players(count);
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize {} event: {}", event.kind(), e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            metrics::websocket_messages_sent(event.kind());
        }
    });

    let mut limits = ConnectionLimits::default();

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                let _ = reply_tx.send(ServerEvent::blocked(INVALID_FORMAT)).await;
                continue;
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: {}", connection);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket error on {}: {}", connection, e);
                break;
            }
        };

        metrics::websocket_messages_received();

        if let Err(exceeded) = limits.admit() {
            warn!(
                "{} rate limit exceeded for {}. Blocking message.",
                exceeded.label(),
                connection
            );
            metrics::rate_limit_hits_total(exceeded.label());
            let _ = reply_tx.send(ServerEvent::blocked(exceeded.reason())).await;
            continue;
        }

        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(client_msg) => client_msg,
            Err(e) => {
                debug!("Failed to parse message from {}: {}", connection, e);
                let _ = reply_tx.send(ServerEvent::blocked(INVALID_FORMAT)).await;
                continue;
            }
        };

        if let Err(e) = handle_client_message(client_msg, connection, &state).await {
            error!("Dropping connection {}: {}", connection, e);
            break;
        }
    }

    // Removing the player also frees its seed
    if let Err(e) = state.round.disconnect(connection).await {
        debug!("Disconnect of {} not delivered: {}", connection, e);
    }
    send_task.abort();
    metrics::websocket_connection_closed();

    info!("WebSocket disconnected: {}", connection);
}

/// Forward a parsed client message to the round.
///
/// Refusals are delivered to the connection by the round itself as
/// `blocked` events. An error here means the round has stopped.
async fn handle_client_message(
    msg: ClientMessage,
    connection: ConnectionId,
    state: &AppState,
) -> Result<(), RoundError> {
    match msg {
        ClientMessage::Register { username, seed } => {
            match state.round.register(connection, username, seed).await? {
                Ok(registration) => {
                    metrics::registrations_total("accepted");
                    info!(
                        "{} registered as {} with seed {}",
                        connection, registration.username, registration.seed
                    );
                }
                Err(e) => {
                    metrics::registrations_total(registration_label(&e));
                    debug!("Registration refused for {}: {}", connection, e);
                }
            }
        }

        ClientMessage::CheckBingo { marked } => {
            let outcome = state.round.check_bingo(connection, marked).await?;
            metrics::claims_total(claim_label(&outcome));
            if let ClaimOutcome::Bingo(line) = outcome {
                info!("Bingo on {} by {}", line, connection);
            }
        }

        ClientMessage::EndGame => state.round.leave(connection).await?,

        ClientMessage::PlayAgain => state.round.play_again(connection).await?,
    }

    Ok(())
}

fn registration_label(error: &RegistrationError) -> &'static str {
    match error {
        RegistrationError::InvalidUsername { .. } => "invalid_username",
        RegistrationError::AlreadyRegistered => "already_registered",
        RegistrationError::UsernameInUse(_) => "username_in_use",
        RegistrationError::SeedLocked(_) => "seed_locked",
        RegistrationError::InsufficientBalance { .. } => "insufficient_balance",
        RegistrationError::Ledger(_) => "ledger_error",
    }
}

fn claim_label(outcome: &ClaimOutcome) -> &'static str {
    match outcome {
        ClaimOutcome::Stale => "stale",
        ClaimOutcome::Rejected(_) => "rejected",
        ClaimOutcome::Bingo(_) => "bingo",
    }
}
