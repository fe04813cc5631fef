//! Balance store abstraction.
//!
//! The round only needs key-value access to balances by username. The
//! trait keeps the round testable without a database and lets the server
//! pick a backend at startup.

use super::{
    errors::{LedgerError, LedgerResult},
    models::LedgerEntry,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::sync::RwLock;

/// Durable key-value store of balances keyed by username
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Raw stored balance, or `None` if the user has no entry
    async fn read(&self, username: &str) -> LedgerResult<Option<Value>>;

    /// Create or overwrite the balance for `username`
    async fn write(&self, username: &str, balance: i64) -> LedgerResult<()>;

    /// All entries, ordered by username
    async fn entries(&self) -> LedgerResult<Vec<LedgerEntry>>;

    /// Check the store is reachable
    async fn ping(&self) -> LedgerResult<()>;
}

/// In-process store for development and tests.
///
/// Not durable. Writes can be made to fail to exercise outage handling.
#[derive(Default)]
pub struct MemoryLedgerStore {
    entries: RwLock<HashMap<String, LedgerEntry>>,
    fail_writes: AtomicBool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry with an arbitrary raw value
    pub fn with_raw(mut self, username: &str, balance: Value) -> Self {
        self.entries.get_mut().insert(
            username.to_string(),
            LedgerEntry {
                username: username.to_string(),
                balance,
                updated_at: Utc::now(),
            },
        );
        self
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn read(&self, username: &str) -> LedgerResult<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries.get(username).map(|entry| entry.balance.clone()))
    }

    async fn write(&self, username: &str, balance: i64) -> LedgerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable(
                "memory ledger is rejecting writes".to_string(),
            ));
        }

        let mut entries = self.entries.write().await;
        entries.insert(
            username.to_string(),
            LedgerEntry {
                username: username.to_string(),
                balance: Value::from(balance),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn entries(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        let mut all: Vec<LedgerEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(all)
    }

    async fn ping(&self) -> LedgerResult<()> {
        Ok(())
    }
}
