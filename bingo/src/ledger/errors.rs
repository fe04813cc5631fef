//! Ledger error types.

use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Balance too low for the requested debit
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Amount is negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Stored balance could not be read as a non-negative number
    #[error("Corrupt balance for {username}: {raw}")]
    Corrupt { username: String, raw: String },

    /// Store is unreachable or refused the operation
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Message that is safe to hand to a player.
    ///
    /// Storage details are replaced with a generic message.
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Database(_) | LedgerError::Unavailable(_) => {
                "Balance service unavailable, please try again".to_string()
            }
            LedgerError::Corrupt { .. } => "Balance record is damaged".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_storage_details() {
        let err = LedgerError::Unavailable("connection refused to 10.0.0.5".to_string());
        assert!(!err.client_message().contains("10.0.0.5"));

        let err = LedgerError::InsufficientBalance {
            available: 5,
            required: 10,
        };
        assert_eq!(
            err.client_message(),
            "Insufficient balance: available 5, required 10"
        );
    }
}
