//! Authoritative round state and its legal transitions.
//!
//! Everything here is synchronous. The actor wraps it with ledger calls,
//! timers and broadcasting.

use super::config::RoundConfig;
use crate::{
    card::{Card, MAX_NUMBER, Mark, Seed, WinLine, generate_card, winning_line},
    session::ConnectionId,
};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
};
use thiserror::Error;

/// Round lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundPhase {
    /// No countdown and no calling
    Idle,
    /// Counting down to the first call
    Countdown { remaining: u32 },
    /// Numbers are being called
    Calling,
    /// A claim was accepted
    Won,
    /// Waiting for the reset after a win or a draw
    SettlingPause,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Idle => write!(f, "idle"),
            RoundPhase::Countdown { .. } => write!(f, "countdown"),
            RoundPhase::Calling => write!(f, "calling"),
            RoundPhase::Won => write!(f, "won"),
            RoundPhase::SettlingPause => write!(f, "settlingPause"),
        }
    }
}

/// A registered player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub connection: ConnectionId,
    pub username: String,
    pub seed: Seed,
    pub card: Card,
    /// Entry fee paid for the current or upcoming round
    pub paid: bool,
}

/// The accepted claim of a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Winner {
    pub username: String,
    pub card: Card,
    pub payout: i64,
    pub line: WinLine,
}

/// Why a registration was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Username must be {min}-{max} characters of letters, digits or underscores")]
    InvalidUsername { min: usize, max: usize },

    #[error("This connection is already registered")]
    AlreadyRegistered,

    #[error("Username {0} is already playing")]
    UsernameInUse(String),

    #[error("Seed {0} is already in use")]
    SeedLocked(Seed),

    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { available: i64, required: i64 },

    #[error("{0}")]
    Ledger(String),
}

/// Why a claim was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimRejection {
    #[error("Invalid Bingo claim: {0} has not been called")]
    UncalledNumber(i64),

    #[error("No Bingo found!")]
    NoBingo,

    #[error("{0}")]
    Ledger(String),
}

/// Result of checking a claim against the round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Not evaluated: unregistered connection, not calling, or already won
    Stale,
    Rejected(ClaimRejection),
    Bingo(WinLine),
}

/// Result of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Remaining(u32),
    Finished,
}

/// Result of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStep {
    Called(u8),
    /// The pool is empty
    Exhausted,
}

/// Read-only view of the round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub phase: String,
    pub countdown_remaining: Option<u32>,
    pub player_count: usize,
    pub players: Vec<String>,
    pub called_numbers: Vec<u8>,
    pub remaining_numbers: usize,
    pub locked_seeds: Vec<Seed>,
    pub winner: Option<String>,
    pub pot: i64,
}

/// The single shared round
#[derive(Debug, Clone)]
pub struct RoundState {
    phase: RoundPhase,
    players: HashMap<ConnectionId, Player>,
    locked_seeds: BTreeSet<Seed>,
    called: Vec<u8>,
    called_set: HashSet<u8>,
    call_pool: Vec<u8>,
    winner: Option<Winner>,
    /// Fees collected for the current round
    pot: i64,
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Idle,
            players: HashMap::new(),
            locked_seeds: BTreeSet::new(),
            called: Vec::new(),
            called_set: HashSet::new(),
            call_pool: Vec::new(),
            winner: None,
            pot: 0,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, connection: &ConnectionId) -> Option<&Player> {
        self.players.get(connection)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Called numbers in call order
    pub fn called_numbers(&self) -> &[u8] {
        &self.called
    }

    /// Numbers not yet called
    pub fn call_pool(&self) -> &[u8] {
        &self.call_pool
    }

    pub fn locked_seeds(&self) -> Vec<Seed> {
        self.locked_seeds.iter().copied().collect()
    }

    pub fn is_seed_locked(&self, seed: Seed) -> bool {
        self.locked_seeds.contains(&seed)
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    /// Entry fees collected for the current round
    pub fn pot(&self) -> i64 {
        self.pot
    }

    /// Players that still owe the entry fee for the upcoming round, by username
    pub fn unpaid_players(&self) -> Vec<(ConnectionId, String)> {
        let mut unpaid: Vec<(ConnectionId, String)> = self
            .players
            .values()
            .filter(|p| !p.paid)
            .map(|p| (p.connection, p.username.clone()))
            .collect();
        unpaid.sort_by(|a, b| a.1.cmp(&b.1));
        unpaid
    }

    /// Record an entry fee paid by a registered player.
    ///
    /// Returns `false` if the player is unknown or has already paid.
    pub fn record_fee(&mut self, connection: &ConnectionId, fee: i64) -> bool {
        match self.players.get_mut(connection) {
            Some(player) if !player.paid => {
                player.paid = true;
                self.pot = self.pot.saturating_add(fee);
                true
            }
            _ => false,
        }
    }

    /// Check a registration request against the round.
    ///
    /// Checks run in order: username format, connection already
    /// registered, username in use, seed locked. Ledger checks are left
    /// to the caller.
    pub fn validate_registration(
        &self,
        config: &RoundConfig,
        connection: &ConnectionId,
        username: &str,
        seed: Seed,
    ) -> Result<(), RegistrationError> {
        if !is_valid_username(config, username) {
            return Err(RegistrationError::InvalidUsername {
                min: config.min_username_len,
                max: config.max_username_len,
            });
        }

        if self.players.contains_key(connection) {
            return Err(RegistrationError::AlreadyRegistered);
        }

        if self.players.values().any(|p| p.username == username) {
            return Err(RegistrationError::UsernameInUse(username.to_string()));
        }

        if self.locked_seeds.contains(&seed) {
            return Err(RegistrationError::SeedLocked(seed));
        }

        Ok(())
    }

    /// Lock the seed, issue the card and add the player.
    ///
    /// Re-runs the round checks so a caller cannot admit a conflicting
    /// player. The entry fee, already debited by the caller, goes into the
    /// pot.
    pub fn admit(
        &mut self,
        config: &RoundConfig,
        connection: ConnectionId,
        username: &str,
        seed: Seed,
    ) -> Result<&Player, RegistrationError> {
        self.validate_registration(config, &connection, username, seed)?;

        self.locked_seeds.insert(seed);
        let player = Player {
            connection,
            username: username.to_string(),
            seed,
            card: generate_card(seed),
            paid: true,
        };
        self.pot = self.pot.saturating_add(config.entry_fee);

        Ok(self.players.entry(connection).or_insert(player))
    }

    /// Remove a player and free their seed
    pub fn remove_player(&mut self, connection: &ConnectionId) -> Option<Player> {
        let player = self.players.remove(connection)?;
        self.locked_seeds.remove(&player.seed);
        Some(player)
    }

    /// Start the countdown if the round is idle.
    ///
    /// Returns `false` if the round was not idle.
    pub fn start_countdown(&mut self, ticks: u32) -> bool {
        if self.phase != RoundPhase::Idle {
            return false;
        }
        self.phase = RoundPhase::Countdown { remaining: ticks };
        true
    }

    /// Advance the countdown by one tick.
    ///
    /// Returns `None` outside the countdown.
    pub fn tick_countdown(&mut self) -> Option<CountdownStep> {
        let RoundPhase::Countdown { remaining } = self.phase else {
            return None;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            Some(CountdownStep::Finished)
        } else {
            self.phase = RoundPhase::Countdown { remaining };
            Some(CountdownStep::Remaining(remaining))
        }
    }

    /// Enter calling with a freshly shuffled pool of every number
    pub fn begin_calling<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut pool: Vec<u8> = (1..=MAX_NUMBER).collect();
        pool.shuffle(rng);

        self.call_pool = pool;
        self.called.clear();
        self.called_set.clear();
        self.phase = RoundPhase::Calling;
    }

    /// Move the next number from the pool to the called list.
    ///
    /// Returns `None` outside calling or once a winner exists.
    pub fn call_next(&mut self) -> Option<CallStep> {
        if self.phase != RoundPhase::Calling || self.winner.is_some() {
            return None;
        }

        match self.call_pool.pop() {
            Some(number) => {
                self.called.push(number);
                self.called_set.insert(number);
                Some(CallStep::Called(number))
            }
            None => Some(CallStep::Exhausted),
        }
    }

    /// Check a claim from `connection`.
    ///
    /// Every claimed number must have been called. The claimed set is
    /// then evaluated against the player's card.
    pub fn evaluate_claim(&self, connection: &ConnectionId, marked: &[Mark]) -> ClaimOutcome {
        if self.phase != RoundPhase::Calling || self.winner.is_some() {
            return ClaimOutcome::Stale;
        }

        let Some(player) = self.players.get(connection) else {
            return ClaimOutcome::Stale;
        };

        let mut numbers = HashSet::with_capacity(marked.len());
        for mark in marked {
            match *mark {
                Mark::Free => {}
                Mark::Number(n) => match u8::try_from(n) {
                    Ok(number) if self.called_set.contains(&number) => {
                        numbers.insert(number);
                    }
                    _ => return ClaimOutcome::Rejected(ClaimRejection::UncalledNumber(n)),
                },
            }
        }

        match winning_line(&player.card, &numbers) {
            Some(line) => ClaimOutcome::Bingo(line),
            None => ClaimOutcome::Rejected(ClaimRejection::NoBingo),
        }
    }

    /// Record the winner and stop the round.
    ///
    /// Returns `None` if a winner already exists or the connection is not
    /// a player.
    pub fn declare_winner(
        &mut self,
        connection: &ConnectionId,
        line: WinLine,
        payout: i64,
    ) -> Option<&Winner> {
        if self.winner.is_some() {
            return None;
        }
        let player = self.players.get(connection)?;

        let winner = Winner {
            username: player.username.clone(),
            card: player.card.clone(),
            payout,
            line,
        };

        self.phase = RoundPhase::Won;
        self.close_round();
        Some(&*self.winner.insert(winner))
    }

    /// Move from a win into the settle pause
    pub fn begin_settling(&mut self) {
        self.phase = RoundPhase::SettlingPause;
    }

    /// End the round without a winner
    pub fn declare_draw(&mut self) {
        self.phase = RoundPhase::SettlingPause;
        self.close_round();
    }

    /// The pot is spent; everyone still registered owes the next fee
    fn close_round(&mut self) {
        self.pot = 0;
        for player in self.players.values_mut() {
            player.paid = false;
        }
    }

    /// Back to idle.
    ///
    /// Clears called numbers, pool and winner. Seeds of players that are
    /// still registered stay locked. Fees paid during the settle pause stay
    /// in the pot for the next round.
    pub fn reset(&mut self) {
        self.phase = RoundPhase::Idle;
        self.called.clear();
        self.called_set.clear();
        self.call_pool.clear();
        self.winner = None;
        self.locked_seeds = self.players.values().map(|p| p.seed).collect();
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        let mut players: Vec<String> = self.players.values().map(|p| p.username.clone()).collect();
        players.sort();

        RoundSnapshot {
            phase: self.phase.to_string(),
            countdown_remaining: match self.phase {
                RoundPhase::Countdown { remaining } => Some(remaining),
                _ => None,
            },
            player_count: self.players.len(),
            players,
            called_numbers: self.called.clone(),
            remaining_numbers: self.call_pool.len(),
            locked_seeds: self.locked_seeds(),
            winner: self.winner.as_ref().map(|w| w.username.clone()),
            pot: self.pot,
        }
    }
}

/// Letters, digits and underscores within the configured length
pub fn is_valid_username(config: &RoundConfig, username: &str) -> bool {
    (config.min_username_len..=config.max_username_len).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CARD_SIZE;
    use rand::{SeedableRng, rngs::StdRng};

    fn config() -> RoundConfig {
        RoundConfig::default()
    }

    fn assert_pool_partition(state: &RoundState) {
        let called: HashSet<u8> = state.called_numbers().iter().copied().collect();
        let pool: HashSet<u8> = state.call_pool().iter().copied().collect();
        assert!(called.is_disjoint(&pool));
        let all: HashSet<u8> = called.union(&pool).copied().collect();
        assert_eq!(all, (1..=MAX_NUMBER).collect::<HashSet<u8>>());
    }

    /// Call until every number on the first row of `connection`'s card
    /// has been called and return the row as marks.
    fn call_until_first_row(state: &mut RoundState, connection: &ConnectionId) -> Vec<Mark> {
        let card = state.player(connection).unwrap().card.clone();
        let row: Vec<u8> = (0..CARD_SIZE).filter_map(|c| card.cell(c, 0).number()).collect();

        while !row.iter().all(|n| state.called_numbers().contains(n)) {
            assert!(matches!(state.call_next(), Some(CallStep::Called(_))));
        }
        row.into_iter().map(Mark::from).collect()
    }

    #[test]
    fn test_username_format() {
        let config = config();
        assert!(is_valid_username(&config, "alice_01"));
        assert!(!is_valid_username(&config, "al"));
        assert!(!is_valid_username(&config, "a".repeat(21).as_str()));
        assert!(!is_valid_username(&config, "bad name"));
        assert!(!is_valid_username(&config, "émile"));
    }

    #[test]
    fn test_registration_checks_in_order() {
        let config = config();
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        state.admit(&config, a, "alice", 7).unwrap();

        assert_eq!(
            state.validate_registration(&config, &a, "x", 7),
            Err(RegistrationError::InvalidUsername { min: 3, max: 20 })
        );
        assert_eq!(
            state.validate_registration(&config, &a, "other", 8),
            Err(RegistrationError::AlreadyRegistered)
        );

        let b = ConnectionId::new();
        assert_eq!(
            state.validate_registration(&config, &b, "alice", 7),
            Err(RegistrationError::UsernameInUse("alice".to_string()))
        );
        assert_eq!(
            state.validate_registration(&config, &b, "bob", 7),
            Err(RegistrationError::SeedLocked(7))
        );
        assert!(state.validate_registration(&config, &b, "bob", 8).is_ok());
    }

    #[test]
    fn test_admit_issues_card_for_seed() {
        let config = config();
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        let card = state.admit(&config, a, "alice", 42).unwrap().card.clone();

        assert_eq!(card, generate_card(42));
        assert!(state.is_seed_locked(42));
        assert_eq!(state.player_count(), 1);
    }

    #[test]
    fn test_remove_player_frees_seed() {
        let config = config();
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        state.admit(&config, a, "alice", 42).unwrap();

        let removed = state.remove_player(&a).unwrap();
        assert_eq!(removed.username, "alice");
        assert!(!state.is_seed_locked(42));
        assert!(state.remove_player(&a).is_none());
    }

    #[test]
    fn test_countdown_runs_down() {
        let mut state = RoundState::new();
        assert!(state.start_countdown(3));
        assert!(!state.start_countdown(3));

        assert_eq!(state.tick_countdown(), Some(CountdownStep::Remaining(2)));
        assert_eq!(state.tick_countdown(), Some(CountdownStep::Remaining(1)));
        assert_eq!(state.tick_countdown(), Some(CountdownStep::Finished));
    }

    #[test]
    fn test_tick_outside_countdown() {
        let mut state = RoundState::new();
        assert_eq!(state.tick_countdown(), None);
        assert_eq!(state.call_next(), None);
    }

    #[test]
    fn test_calling_partitions_universe() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = RoundState::new();
        state.begin_calling(&mut rng);
        assert_pool_partition(&state);

        for _ in 0..MAX_NUMBER {
            assert!(matches!(state.call_next(), Some(CallStep::Called(_))));
            assert_pool_partition(&state);
        }

        assert_eq!(state.call_next(), Some(CallStep::Exhausted));
        assert_eq!(state.called_numbers().len(), MAX_NUMBER as usize);
    }

    #[test]
    fn test_claim_with_uncalled_number_rejected() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        state.admit(&config, a, "alice", 5).unwrap();
        state.begin_calling(&mut rng);

        let called = match state.call_next() {
            Some(CallStep::Called(n)) => n,
            other => panic!("unexpected {other:?}"),
        };
        let uncalled = state.call_pool()[0];

        let outcome = state.evaluate_claim(&a, &[Mark::from(called), Mark::from(uncalled)]);
        assert_eq!(
            outcome,
            ClaimOutcome::Rejected(ClaimRejection::UncalledNumber(i64::from(uncalled)))
        );

        let outcome = state.evaluate_claim(&a, &[Mark::Number(400)]);
        assert_eq!(
            outcome,
            ClaimOutcome::Rejected(ClaimRejection::UncalledNumber(400))
        );
    }

    #[test]
    fn test_claim_without_line_is_no_bingo() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        state.admit(&config, a, "alice", 5).unwrap();
        state.begin_calling(&mut rng);

        assert_eq!(
            state.evaluate_claim(&a, &[Mark::Free]),
            ClaimOutcome::Rejected(ClaimRejection::NoBingo)
        );
    }

    #[test]
    fn test_claims_outside_calling_are_stale() {
        let config = config();
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        state.admit(&config, a, "alice", 5).unwrap();

        assert_eq!(state.evaluate_claim(&a, &[]), ClaimOutcome::Stale);

        let mut rng = StdRng::seed_from_u64(4);
        state.begin_calling(&mut rng);
        assert_eq!(
            state.evaluate_claim(&ConnectionId::new(), &[]),
            ClaimOutcome::Stale
        );
    }

    #[test]
    fn test_win_freezes_round() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        state.admit(&config, a, "alice", 10).unwrap();
        state.admit(&config, b, "bob", 11).unwrap();
        state.begin_calling(&mut rng);

        let marks = call_until_first_row(&mut state, &a);
        assert_eq!(
            state.evaluate_claim(&a, &marks),
            ClaimOutcome::Bingo(WinLine::Row(0))
        );

        let winner = state.declare_winner(&a, WinLine::Row(0), 16).unwrap();
        assert_eq!(winner.username, "alice");
        assert_eq!(winner.payout, 16);
        assert_eq!(state.phase(), RoundPhase::Won);

        assert_eq!(state.call_next(), None);
        assert_eq!(state.evaluate_claim(&b, &marks), ClaimOutcome::Stale);
        assert!(state.declare_winner(&b, WinLine::Row(0), 16).is_none());
    }

    #[test]
    fn test_reset_keeps_remaining_players_locked() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(6);
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        state.admit(&config, a, "alice", 10).unwrap();
        state.admit(&config, b, "bob", 11).unwrap();
        state.begin_calling(&mut rng);
        state.call_next();
        state.declare_draw();
        state.remove_player(&b);

        state.reset();

        assert_eq!(state.phase(), RoundPhase::Idle);
        assert!(state.called_numbers().is_empty());
        assert!(state.call_pool().is_empty());
        assert!(state.winner().is_none());
        assert_eq!(state.locked_seeds(), vec![10]);
    }

    #[test]
    fn test_pot_holds_fees_paid_for_the_round() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = RoundState::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        state.admit(&config, a, "alice", 10).unwrap();
        state.admit(&config, b, "bob", 11).unwrap();
        assert_eq!(state.pot(), 20);

        // A leaver's fee stays in the pot
        state.remove_player(&b);
        assert_eq!(state.pot(), 20);

        state.begin_calling(&mut rng);
        let marks = call_until_first_row(&mut state, &a);
        assert!(matches!(state.evaluate_claim(&a, &marks), ClaimOutcome::Bingo(_)));
        state.declare_winner(&a, WinLine::Row(0), config.payout(state.pot()));
        assert_eq!(state.pot(), 0);
        assert_eq!(state.unpaid_players(), vec![(a, "alice".to_string())]);

        // Joining during the pause pays for the next round
        let c = ConnectionId::new();
        state.admit(&config, c, "carol", 12).unwrap();
        state.begin_settling();
        state.reset();
        assert_eq!(state.pot(), 10);
        assert_eq!(state.unpaid_players().len(), 1);

        assert!(state.record_fee(&a, config.entry_fee));
        assert!(!state.record_fee(&a, config.entry_fee));
        assert!(!state.record_fee(&b, config.entry_fee));
        assert_eq!(state.pot(), 20);
        assert!(state.unpaid_players().is_empty());
    }

    #[test]
    fn test_snapshot() {
        let config = config();
        let mut state = RoundState::new();
        state.admit(&config, ConnectionId::new(), "bob", 2).unwrap();
        state.admit(&config, ConnectionId::new(), "alice", 1).unwrap();
        state.start_countdown(60);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, "countdown");
        assert_eq!(snapshot.countdown_remaining, Some(60));
        assert_eq!(snapshot.players, vec!["alice", "bob"]);
        assert_eq!(snapshot.locked_seeds, vec![1, 2]);
        assert_eq!(snapshot.pot, 20);
    }
}
