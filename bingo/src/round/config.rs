//! Round configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Round configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Charged on registration and again for each later round (default: 10)
    pub entry_fee: i64,

    /// Balance for new or repaired ledger entries (default: 100)
    pub starting_balance: i64,

    /// Share of the round's pot paid to the winner (default: 80)
    pub payout_percent: u8,

    /// Countdown length in ticks (default: 60)
    pub countdown_ticks: u32,

    /// Time between countdown ticks
    pub countdown_tick: Duration,

    /// Time between called numbers
    pub call_interval: Duration,

    /// Pause between a settled round and the reset
    pub settle_delay: Duration,

    pub min_username_len: usize,

    pub max_username_len: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            entry_fee: 10,
            starting_balance: 100,
            payout_percent: 80,
            countdown_ticks: 60,
            countdown_tick: Duration::from_secs(1),
            call_interval: Duration::from_secs(5),
            settle_delay: Duration::from_secs(15),
            min_username_len: 3,
            max_username_len: 20,
        }
    }
}

impl RoundConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.entry_fee < 0 {
            return Err("Entry fee must not be negative".to_string());
        }

        if self.starting_balance < 0 {
            return Err("Starting balance must not be negative".to_string());
        }

        if self.payout_percent > 100 {
            return Err("Payout percent must be between 0 and 100".to_string());
        }

        if self.countdown_tick.is_zero()
            || self.call_interval.is_zero()
            || self.settle_delay.is_zero()
        {
            return Err("Timer periods must be greater than zero".to_string());
        }

        if self.min_username_len == 0 || self.max_username_len < self.min_username_len {
            return Err("Username length bounds are invalid".to_string());
        }

        Ok(())
    }

    /// Winner's share of `pot`, the fees collected for the round
    pub fn payout(&self, pot: i64) -> i64 {
        pot.saturating_mul(i64::from(self.payout_percent)) / 100
    }
}
