//! # Bingo
//!
//! A single shared round of networked Bingo with a small virtual-currency
//! wager.
//!
//! Players register with a username and a seed. The seed deterministically
//! selects their card, so a returning player with the same seed gets the same
//! card. Numbers are called in one global order for everyone, claims are
//! checked against that order, and the winner is paid from the entry fees.
//!
//! ## Round lifecycle
//!
//! - **Idle**: no players have started a round
//! - **Countdown**: the first registration starts a countdown
//! - **Calling**: one number from a shuffled pool of 1-75 per interval
//! - **Won**: the first valid claim stops calling and is paid out
//! - **SettlingPause**: a fixed pause before the round resets to Idle
//!
//! ## Core Modules
//!
//! - [`card`]: Card generation from a seed and line evaluation
//! - [`round`]: Round state machine, actor and timers
//! - [`ledger`]: Balance stores and the gateway used for fees and payouts
//! - [`session`]: Connection registry and server events
//!
//! ## Example
//!
//! ```
//! use bingo::card::{generate_card, has_bingo};
//! use std::collections::HashSet;
//!
//! let card = generate_card(2024);
//! let first_column: HashSet<u8> = card.columns()[0]
//!     .iter()
//!     .filter_map(|cell| cell.number())
//!     .collect();
//!
//! assert!(has_bingo(&card, &first_column));
//! ```

/// Card generation and win evaluation.
pub mod card;
pub use card::{Card, Cell, Mark, Seed, WinLine, generate_card, has_bingo, winning_line};

/// Player balances.
pub mod ledger;
pub use ledger::{LedgerError, LedgerGateway, LedgerStore, MemoryLedgerStore, PgLedgerStore};

/// The shared round.
pub mod round;
pub use round::{RoundActor, RoundConfig, RoundHandle, RoundSnapshot};

/// Live connections.
pub mod session;
pub use session::{ConnectionId, ServerEvent};
