//! Round actor: the single writer of round state.

use super::{
    config::RoundConfig,
    messages::{RegisterResponse, Registration, RoundError, RoundMessage},
    state::{
        CallStep, ClaimOutcome, ClaimRejection, CountdownStep, RegistrationError, RoundSnapshot,
        RoundState,
    },
    timer::{RoundTimers, TimerKind},
};
use crate::{
    card::{Mark, Seed},
    ledger::{LedgerError, LedgerGateway, LedgerResult},
    session::{ConnectionId, ServerEvent, SessionRegistry},
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::{mpsc, oneshot};

/// Capacity of the actor inbox
pub const ROUND_INBOX_CAPACITY: usize = 256;

/// Capacity of each connection's outbound event channel
pub const SESSION_CHANNEL_CAPACITY: usize = 256;

/// Handle for sending messages to the round actor
#[derive(Clone)]
pub struct RoundHandle {
    sender: mpsc::Sender<RoundMessage>,
}

impl RoundHandle {
    pub fn new(sender: mpsc::Sender<RoundMessage>) -> Self {
        Self { sender }
    }

    /// Send a raw message to the round
    pub async fn send(&self, message: RoundMessage) -> Result<(), RoundError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoundError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoundMessage,
    ) -> Result<T, RoundError> {
        let (response, rx) = oneshot::channel();
        self.send(build(response)).await?;
        rx.await.map_err(|_| RoundError::Closed)
    }

    /// Attach a connection and return its event stream.
    ///
    /// The first event on the stream is `init`.
    pub async fn connect(
        &self,
        connection: ConnectionId,
    ) -> Result<mpsc::Receiver<ServerEvent>, RoundError> {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        self.send(RoundMessage::Connect { connection, sender })
            .await?;
        Ok(receiver)
    }

    pub async fn register(
        &self,
        connection: ConnectionId,
        username: impl Into<String>,
        seed: Seed,
    ) -> Result<RegisterResponse, RoundError> {
        let username = username.into();
        self.request(|response| RoundMessage::Register {
            connection,
            username,
            seed,
            response,
        })
        .await
    }

    pub async fn check_bingo(
        &self,
        connection: ConnectionId,
        marked: Vec<Mark>,
    ) -> Result<ClaimOutcome, RoundError> {
        self.request(|response| RoundMessage::CheckBingo {
            connection,
            marked,
            response,
        })
        .await
    }

    pub async fn leave(&self, connection: ConnectionId) -> Result<(), RoundError> {
        self.send(RoundMessage::Leave { connection }).await
    }

    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), RoundError> {
        self.send(RoundMessage::Disconnect { connection }).await
    }

    pub async fn play_again(&self, connection: ConnectionId) -> Result<(), RoundError> {
        self.send(RoundMessage::PlayAgain { connection }).await
    }

    /// Overwrite a balance and notify that user's live sessions.
    ///
    /// Returns the number of sessions notified.
    pub async fn push_balance(
        &self,
        username: impl Into<String>,
        balance: i64,
    ) -> Result<LedgerResult<usize>, RoundError> {
        let username = username.into();
        self.request(|response| RoundMessage::BalanceOverride {
            username,
            balance,
            response,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<RoundSnapshot, RoundError> {
        self.request(|response| RoundMessage::GetState { response })
            .await
    }
}

/// Actor owning the round, its sessions and its timers
pub struct RoundActor {
    config: RoundConfig,
    state: RoundState,
    sessions: SessionRegistry,
    ledger: LedgerGateway,
    timers: RoundTimers,
    inbox: mpsc::Receiver<RoundMessage>,
    rng: StdRng,
}

impl RoundActor {
    /// Create a new round actor
    ///
    /// # Arguments
    ///
    /// * `config` - Round configuration
    /// * `ledger` - Balance gateway
    ///
    /// # Returns
    ///
    /// * `(RoundActor, RoundHandle)` - Actor and handle for sending messages
    pub fn new(config: RoundConfig, ledger: LedgerGateway) -> (Self, RoundHandle) {
        let (sender, inbox) = mpsc::channel(ROUND_INBOX_CAPACITY);
        let timers = RoundTimers::new(sender.downgrade());

        let actor = Self {
            config,
            state: RoundState::new(),
            sessions: SessionRegistry::new(),
            ledger,
            timers,
            inbox,
            rng: StdRng::from_os_rng(),
        };

        (actor, RoundHandle::new(sender))
    }

    /// Use a fixed random source for shuffling the call pool
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Run the actor until every handle is dropped
    pub async fn run(mut self) {
        log::info!(
            "Round starting: entry fee {}, payout {}%",
            self.config.entry_fee,
            self.config.payout_percent
        );

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
        }

        self.timers.cancel_all();
        log::info!("Round stopped");
    }

    async fn handle_message(&mut self, message: RoundMessage) {
        match message {
            RoundMessage::Connect { connection, sender } => {
                self.handle_connect(connection, sender);
            }

            RoundMessage::Register {
                connection,
                username,
                seed,
                response,
            } => {
                let result = self.handle_register(connection, &username, seed).await;
                let _ = response.send(result);
            }

            RoundMessage::CheckBingo {
                connection,
                marked,
                response,
            } => {
                let outcome = self.handle_check_bingo(connection, &marked).await;
                let _ = response.send(outcome);
            }

            RoundMessage::Leave { connection } => {
                self.handle_leave(&connection);
            }

            RoundMessage::Disconnect { connection } => {
                self.handle_disconnect(&connection);
            }

            RoundMessage::PlayAgain { connection } => {
                self.sessions.send_to(&connection, ServerEvent::Reset);
            }

            RoundMessage::BalanceOverride {
                username,
                balance,
                response,
            } => {
                let result = self.handle_balance_override(&username, balance).await;
                let _ = response.send(result);
            }

            RoundMessage::GetState { response } => {
                let _ = response.send(self.state.snapshot());
            }

            RoundMessage::Tick { kind, generation } => {
                if !self.timers.is_current(kind, generation) {
                    log::debug!("Dropping stale {:?} tick (generation {})", kind, generation);
                    return;
                }
                match kind {
                    TimerKind::Countdown => self.on_countdown_tick(),
                    TimerKind::Calling => self.on_call_tick(),
                    TimerKind::Settle => self.on_settle().await,
                }
            }
        }
    }

    fn handle_connect(&mut self, connection: ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        self.sessions.insert(connection, sender);
        log::debug!("Connection {} attached", connection);

        self.sessions.send_to(
            &connection,
            ServerEvent::Init {
                called_numbers: self.state.called_numbers().to_vec(),
                balance: self.config.starting_balance,
                locked_seeds: self.state.locked_seeds(),
            },
        );
    }

    /// Handle a registration, reporting any refusal to the requester
    async fn handle_register(
        &mut self,
        connection: ConnectionId,
        username: &str,
        seed: Seed,
    ) -> RegisterResponse {
        let result = self.try_register(connection, username, seed).await;

        if let Err(e) = &result {
            log::debug!(
                "Registration of {} on {} refused: {}",
                username,
                connection,
                e
            );
            self.sessions
                .send_to(&connection, ServerEvent::blocked(e.to_string()));
        }

        result
    }

    async fn try_register(
        &mut self,
        connection: ConnectionId,
        username: &str,
        seed: Seed,
    ) -> RegisterResponse {
        self.state
            .validate_registration(&self.config, &connection, username, seed)?;

        let fee = self.config.entry_fee;
        let available = self
            .ledger
            .ensure_account(username)
            .await
            .map_err(registration_ledger_error)?;
        if available < fee {
            return Err(RegistrationError::InsufficientBalance {
                available,
                required: fee,
            });
        }

        let balance = self
            .ledger
            .debit(username, fee)
            .await
            .map_err(registration_ledger_error)?;

        let card = match self.state.admit(&self.config, connection, username, seed) {
            Ok(player) => player.card.clone(),
            Err(e) => {
                self.refund(username, fee).await;
                return Err(e);
            }
        };

        self.sessions.bind(&connection, username, seed);
        log::info!(
            "{} joined with seed {} ({} players)",
            username,
            seed,
            self.state.player_count()
        );

        self.sessions
            .send_to(&connection, ServerEvent::BalanceUpdate { balance });
        self.sessions.send_to(
            &connection,
            ServerEvent::CardIssued {
                card: card.clone(),
                seed,
            },
        );
        self.broadcast_roster();

        if self.state.start_countdown(self.config.countdown_ticks) {
            self.begin_countdown();
        }

        Ok(Registration {
            username: username.to_string(),
            seed,
            card,
            balance,
        })
    }

    /// Give back an entry fee after a failed admission
    async fn refund(&self, username: &str, fee: i64) {
        match self.ledger.credit(username, fee).await {
            Ok(balance) => log::warn!("Refunded {} to {}, balance {}", fee, username, balance),
            Err(e) => log::error!("Failed to refund {} to {}: {}", fee, username, e),
        }
    }

    async fn handle_check_bingo(
        &mut self,
        connection: ConnectionId,
        marked: &[Mark],
    ) -> ClaimOutcome {
        let line = match self.state.evaluate_claim(&connection, marked) {
            ClaimOutcome::Stale => {
                log::debug!("Ignoring stale claim from {}", connection);
                return ClaimOutcome::Stale;
            }
            ClaimOutcome::Rejected(rejection) => {
                return self.reject_claim(&connection, rejection);
            }
            ClaimOutcome::Bingo(line) => line,
        };

        let Some(username) = self.state.player(&connection).map(|p| p.username.clone()) else {
            return ClaimOutcome::Stale;
        };
        let payout = self.config.payout(self.state.pot());

        let balance = match self.ledger.credit(&username, payout).await {
            Ok(balance) => balance,
            Err(e) => {
                log::error!("Failed to credit {} payout to {}: {}", payout, username, e);
                return self.reject_claim(&connection, ClaimRejection::Ledger(e.client_message()));
            }
        };

        self.timers.cancel(TimerKind::Calling);
        let Some(winner) = self
            .state
            .declare_winner(&connection, line, payout)
            .cloned()
        else {
            return ClaimOutcome::Stale;
        };

        log::info!(
            "{} won with {} after {} calls, paid {}",
            winner.username,
            line,
            self.state.called_numbers().len(),
            payout
        );

        self.sessions
            .send_to(&connection, ServerEvent::BalanceUpdate { balance });
        self.sessions.broadcast(&ServerEvent::Winner {
            username: winner.username,
            card: winner.card,
            win_point: winner.payout,
        });
        self.sessions.broadcast(&ServerEvent::StopCalling);

        self.state.begin_settling();
        self.timers
            .arm_once(TimerKind::Settle, self.config.settle_delay);

        ClaimOutcome::Bingo(line)
    }

    fn reject_claim(&mut self, connection: &ConnectionId, rejection: ClaimRejection) -> ClaimOutcome {
        log::debug!("Claim from {} rejected: {}", connection, rejection);
        self.sessions
            .send_to(connection, ServerEvent::blocked(rejection.to_string()));
        ClaimOutcome::Rejected(rejection)
    }

    fn handle_leave(&mut self, connection: &ConnectionId) {
        self.sessions.unbind(connection);

        if let Some(player) = self.state.remove_player(connection) {
            log::info!(
                "{} left, seed {} released ({} players)",
                player.username,
                player.seed,
                self.state.player_count()
            );
            self.broadcast_roster();
        }
    }

    fn handle_disconnect(&mut self, connection: &ConnectionId) {
        self.sessions.remove(connection);
        log::debug!("Connection {} detached", connection);
        self.handle_leave(connection);
    }

    async fn handle_balance_override(&mut self, username: &str, balance: i64) -> LedgerResult<usize> {
        self.ledger.set_balance(username, balance).await?;
        let notified = self
            .sessions
            .send_to_username(username, &ServerEvent::BalanceUpdate { balance });
        log::info!(
            "Balance of {} set to {} ({} sessions notified)",
            username,
            balance,
            notified
        );
        Ok(notified)
    }

    fn begin_countdown(&mut self) {
        log::info!("Countdown started: {} ticks", self.config.countdown_ticks);
        self.sessions.broadcast(&ServerEvent::Countdown {
            remaining: self.config.countdown_ticks,
        });
        self.timers
            .arm_repeating(TimerKind::Countdown, self.config.countdown_tick);
    }

    fn on_countdown_tick(&mut self) {
        match self.state.tick_countdown() {
            Some(CountdownStep::Remaining(remaining)) => {
                self.sessions
                    .broadcast(&ServerEvent::Countdown { remaining });
            }
            Some(CountdownStep::Finished) => {
                self.timers.cancel(TimerKind::Countdown);
                self.state.begin_calling(&mut self.rng);

                let player_count = self.state.player_count();
                log::info!("Calling started with {} players", player_count);
                self.sessions
                    .broadcast(&ServerEvent::GameStarted { player_count });
                self.timers
                    .arm_repeating(TimerKind::Calling, self.config.call_interval);
            }
            None => {
                self.timers.cancel(TimerKind::Countdown);
            }
        }
    }

    fn on_call_tick(&mut self) {
        match self.state.call_next() {
            Some(CallStep::Called(number)) => {
                log::debug!("Called {}", number);
                self.sessions
                    .broadcast(&ServerEvent::NumberCalled { number });
            }
            Some(CallStep::Exhausted) => {
                self.timers.cancel(TimerKind::Calling);
                self.state.declare_draw();
                log::info!("All numbers called without a winner");

                self.sessions.broadcast(&ServerEvent::StopCalling);
                self.sessions.broadcast(&ServerEvent::Draw);
                self.timers
                    .arm_once(TimerKind::Settle, self.config.settle_delay);
            }
            None => {
                self.timers.cancel(TimerKind::Calling);
            }
        }
    }

    async fn on_settle(&mut self) {
        self.timers.cancel(TimerKind::Settle);
        self.state.reset();
        self.charge_next_round().await;
        log::info!(
            "Round reset ({} players remain, pot {})",
            self.state.player_count(),
            self.state.pot()
        );

        self.sessions.broadcast(&ServerEvent::Reset);
        self.broadcast_roster();

        if self.state.player_count() > 0 && self.state.start_countdown(self.config.countdown_ticks)
        {
            self.begin_countdown();
        }
    }

    /// Charge every remaining player the fee for the next round.
    ///
    /// A player who cannot pay is dropped and its seed freed.
    async fn charge_next_round(&mut self) {
        let fee = self.config.entry_fee;

        for (connection, username) in self.state.unpaid_players() {
            match self.ledger.debit(&username, fee).await {
                Ok(balance) => {
                    self.state.record_fee(&connection, fee);
                    self.sessions
                        .send_to(&connection, ServerEvent::BalanceUpdate { balance });
                }
                Err(e) => {
                    let reason = registration_ledger_error(e);
                    log::info!("{} dropped from the next round: {}", username, reason);
                    self.state.remove_player(&connection);
                    self.sessions.unbind(&connection);
                    self.sessions
                        .send_to(&connection, ServerEvent::blocked(reason.to_string()));
                }
            }
        }
    }

    fn broadcast_roster(&mut self) {
        self.sessions.broadcast(&ServerEvent::PlayerCount {
            count: self.state.player_count(),
        });
        self.sessions.broadcast(&ServerEvent::LockedSeeds {
            seeds: self.state.locked_seeds(),
        });
    }
}

fn registration_ledger_error(error: LedgerError) -> RegistrationError {
    match error {
        LedgerError::InsufficientBalance {
            available,
            required,
        } => RegistrationError::InsufficientBalance {
            available,
            required,
        },
        other => {
            log::error!("Ledger failure during registration: {}", other);
            RegistrationError::Ledger(other.client_message())
        }
    }
}
