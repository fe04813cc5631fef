//! Balance operations used by the round: account setup, entry fee debit and
//! payout credit.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{Balance, LedgerEntry},
    store::LedgerStore,
};
use std::sync::Arc;

/// Gateway between the round and the balance store
#[derive(Clone)]
pub struct LedgerGateway {
    store: Arc<dyn LedgerStore>,
    starting_balance: i64,
}

impl LedgerGateway {
    /// Create a gateway
    ///
    /// # Arguments
    ///
    /// * `store` - Balance store
    /// * `starting_balance` - Balance given to new and repaired accounts
    pub fn new(store: Arc<dyn LedgerStore>, starting_balance: i64) -> Self {
        Self {
            store,
            starting_balance,
        }
    }

    pub fn starting_balance(&self) -> i64 {
        self.starting_balance
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Current balance, or `None` if the user has no entry.
    ///
    /// # Errors
    ///
    /// * `LedgerError::Corrupt` - Entry exists but is not a usable number
    pub async fn get_balance(&self, username: &str) -> LedgerResult<Option<i64>> {
        match self.store.read(username).await? {
            None => Ok(None),
            Some(raw) => match Balance::from_raw(&raw) {
                Balance::Valid(amount) => Ok(Some(amount)),
                Balance::Corrupt => Err(LedgerError::Corrupt {
                    username: username.to_string(),
                    raw: raw.to_string(),
                }),
            },
        }
    }

    /// Overwrite a balance
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Negative amount
    pub async fn set_balance(&self, username: &str, amount: i64) -> LedgerResult<()> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.store.write(username, amount).await
    }

    /// Balance for `username`, creating or repairing the entry first.
    ///
    /// Missing entries are created with the starting balance. Entries that
    /// do not hold a non-negative number are reset to the starting balance.
    pub async fn ensure_account(&self, username: &str) -> LedgerResult<i64> {
        match self.store.read(username).await? {
            Some(raw) => match Balance::from_raw(&raw) {
                Balance::Valid(amount) => Ok(amount),
                Balance::Corrupt => {
                    log::warn!(
                        "Repairing corrupt balance for {}: {} -> {}",
                        username,
                        raw,
                        self.starting_balance
                    );
                    self.store.write(username, self.starting_balance).await?;
                    Ok(self.starting_balance)
                }
            },
            None => {
                log::info!(
                    "Creating ledger entry for {} with {}",
                    username,
                    self.starting_balance
                );
                self.store.write(username, self.starting_balance).await?;
                Ok(self.starting_balance)
            }
        }
    }

    /// Take `amount` from `username`, returning the new balance.
    ///
    /// Nothing is written unless the balance covers the amount.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientBalance` - Balance below `amount`
    /// * `LedgerError::InvalidAmount` - Negative amount
    pub async fn debit(&self, username: &str, amount: i64) -> LedgerResult<i64> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let available = self.ensure_account(username).await?;
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        let new_balance = available - amount;
        self.store.write(username, new_balance).await?;
        Ok(new_balance)
    }

    /// Add `amount` to `username`, returning the new balance
    pub async fn credit(&self, username: &str, amount: i64) -> LedgerResult<i64> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let current = self.ensure_account(username).await?;
        let new_balance = current.saturating_add(amount);
        self.store.write(username, new_balance).await?;
        Ok(new_balance)
    }

    /// All stored entries as raw records
    pub async fn entries(&self) -> LedgerResult<Vec<LedgerEntry>> {
        self.store.entries().await
    }

    pub async fn ping(&self) -> LedgerResult<()> {
        self.store.ping().await
    }
}
