//! Round actor message types.

use super::{
    state::{ClaimOutcome, RegistrationError, RoundSnapshot},
    timer::TimerKind,
};
use crate::{
    card::{Card, Mark, Seed},
    ledger::LedgerResult,
    session::{ConnectionId, ServerEvent},
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Messages that can be sent to the RoundActor
#[derive(Debug)]
pub enum RoundMessage {
    /// New connection; `init` is sent to it immediately
    Connect {
        connection: ConnectionId,
        sender: mpsc::Sender<ServerEvent>,
    },

    /// Join the round with a username and seed
    Register {
        connection: ConnectionId,
        username: String,
        seed: Seed,
        response: oneshot::Sender<RegisterResponse>,
    },

    /// Claim a win with the numbers the client has marked
    CheckBingo {
        connection: ConnectionId,
        marked: Vec<Mark>,
        response: oneshot::Sender<ClaimOutcome>,
    },

    /// Leave the round but keep the connection
    Leave { connection: ConnectionId },

    /// Connection closed
    Disconnect { connection: ConnectionId },

    /// Client asked to clear its board
    PlayAgain { connection: ConnectionId },

    /// Overwrite a balance and push it to the user's live sessions
    BalanceOverride {
        username: String,
        balance: i64,
        response: oneshot::Sender<LedgerResult<usize>>,
    },

    GetState {
        response: oneshot::Sender<RoundSnapshot>,
    },

    /// Internal: timer fired
    Tick { kind: TimerKind, generation: u64 },
}

/// A successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub seed: Seed,
    pub card: Card,
    /// Balance after the entry fee
    pub balance: i64,
}

pub type RegisterResponse = Result<Registration, RegistrationError>;

/// Errors talking to the round actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("Round is closed")]
    Closed,
}
