//! Events sent from the server to connected clients.

use crate::card::{Card, Seed};
use serde::{Deserialize, Serialize};

/// A server-to-client event.
///
/// Serialized as `{"type": "<name>", "data": {...}}`. Unit variants carry no
/// `data` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// First event on every new connection
    Init {
        called_numbers: Vec<u8>,
        balance: i64,
        locked_seeds: Vec<Seed>,
    },

    /// A request from this connection was refused
    Blocked { reason: String },

    BalanceUpdate { balance: i64 },

    /// Card issued to this connection after registration
    CardIssued { card: Card, seed: Seed },

    PlayerCount { count: usize },

    LockedSeeds { seeds: Vec<Seed> },

    /// Countdown to the start of calling
    Countdown { remaining: u32 },

    GameStarted { player_count: usize },

    NumberCalled { number: u8 },

    /// Round won; `win_point` is the payout credited to the winner
    Winner {
        username: String,
        card: Card,
        win_point: i64,
    },

    StopCalling,

    /// Every number was called without a winner
    Draw,

    Reset,
}

impl ServerEvent {
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::Blocked {
            reason: reason.into(),
        }
    }

    /// Wire name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Blocked { .. } => "blocked",
            Self::BalanceUpdate { .. } => "balanceUpdate",
            Self::CardIssued { .. } => "cardIssued",
            Self::PlayerCount { .. } => "playerCount",
            Self::LockedSeeds { .. } => "lockedSeeds",
            Self::Countdown { .. } => "countdown",
            Self::GameStarted { .. } => "gameStarted",
            Self::NumberCalled { .. } => "numberCalled",
            Self::Winner { .. } => "winner",
            Self::StopCalling => "stopCalling",
            Self::Draw => "draw",
            Self::Reset => "reset",
        }
    }
}
