//! Round module: the shared Bingo round and the actor that drives it.
//!
//! This module implements:
//! - RoundState: phases, players, locked seeds, call pool and winner
//! - RoundActor: async actor that serializes every mutation
//! - RoundTimers: countdown, calling and settle timers with stale-tick guards
//!
//! ## Architecture
//!
//! The round runs in one Tokio task with an mpsc inbox. Connections,
//! registrations, claims and timer ticks all arrive as [`RoundMessage`]s and
//! are handled one at a time, ledger writes included. The actor owns the
//! session registry and pushes [`ServerEvent`](crate::session::ServerEvent)s
//! to clients.
//!
//! ## Example
//!
//! ```no_run
//! use bingo::{
//!     ledger::{LedgerGateway, MemoryLedgerStore},
//!     round::{RoundActor, RoundConfig},
//!     session::ConnectionId,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RoundConfig::default();
//!     let ledger = LedgerGateway::new(Arc::new(MemoryLedgerStore::new()), config.starting_balance);
//!     let (actor, round) = RoundActor::new(config, ledger);
//!     tokio::spawn(actor.run());
//!
//!     let connection = ConnectionId::new();
//!     let mut events = round.connect(connection).await.unwrap();
//!     round.register(connection, "alice", 1234).await.unwrap().unwrap();
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{}", serde_json::to_string(&event).unwrap());
//!     }
//! }
//! ```

pub mod actor;
pub mod config;
pub mod messages;
pub mod state;
pub mod timer;

pub use actor::{RoundActor, RoundHandle};
pub use config::RoundConfig;
pub use messages::{RegisterResponse, Registration, RoundError, RoundMessage};
pub use state::{
    ClaimOutcome, ClaimRejection, Player, RegistrationError, RoundPhase, RoundSnapshot, RoundState,
    Winner,
};
pub use timer::{RoundTimers, TimerKind};
