//! Ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored balance record exactly as the store holds it.
///
/// `balance` is kept raw so that damaged records can be listed and
/// repaired instead of failing to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub username: String,
    pub balance: Value,
    pub updated_at: DateTime<Utc>,
}

/// Result of reading a raw balance value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    /// A usable, non-negative amount
    Valid(i64),
    /// Present but not a non-negative number
    Corrupt,
}

impl Balance {
    /// Interpret a stored value.
    ///
    /// Non-negative integers are taken as-is, non-negative finite floats are
    /// floored. Anything else (strings, nulls, negatives) is corrupt.
    pub fn from_raw(raw: &Value) -> Self {
        if let Some(n) = raw.as_i64() {
            return if n >= 0 { Self::Valid(n) } else { Self::Corrupt };
        }

        match raw.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 && f < i64::MAX as f64 => {
                Self::Valid(f.floor() as i64)
            }
            _ => Self::Corrupt,
        }
    }
}
