//! Ledger module: player balances kept in an external durable store.
//!
//! This module implements:
//! - A key-value [`LedgerStore`] abstraction with PostgreSQL and in-memory backends
//! - [`LedgerGateway`] for entry fee debits, payout credits and admin overrides
//! - Repair of damaged balance records at read time
//!
//! ## Example
//!
//! ```no_run
//! use bingo::ledger::{LedgerGateway, PgLedgerStore, PostgresConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PgLedgerStore::connect(&PostgresConfig::default()).await?;
//!     store.ensure_schema().await?;
//!     let ledger = LedgerGateway::new(Arc::new(store), 100);
//!
//!     let balance = ledger.debit("alice", 10).await?;
//!     println!("alice now has {}", balance);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod gateway;
pub mod models;
pub mod postgres;
pub mod store;

pub use errors::{LedgerError, LedgerResult};
pub use gateway::LedgerGateway;
pub use models::{Balance, LedgerEntry};
pub use postgres::{PgLedgerStore, PostgresConfig};
pub use store::{LedgerStore, MemoryLedgerStore};
