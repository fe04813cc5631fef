//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use bingo::{ledger::PostgresConfig, round::RoundConfig};
use std::{
    fmt,
    net::{Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};

/// Minimum length of the admin bearer secret
pub const MIN_ADMIN_SECRET_LEN: usize = 8;

/// Where balances are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Postgres,
    /// Not durable, for development only
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(LedgerBackend::Postgres),
            "memory" => Ok(LedgerBackend::Memory),
            other => Err(format!(
                "unknown ledger backend '{other}', expected 'postgres' or 'memory'"
            )),
        }
    }
}

impl fmt::Display for LedgerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerBackend::Postgres => write!(f, "postgres"),
            LedgerBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Bearer secret for the admin API (required)
    pub admin_secret: String,
    /// Ledger backend
    pub ledger: LedgerBackend,
    /// Database configuration, used by the postgres backend
    pub database: PostgresConfig,
    /// Round rules and timings
    pub round: RoundConfig,
    /// Prometheus scrape address; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `ledger_override` - Optional ledger backend override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        ledger_override: Option<LedgerBackend>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(bind_override, ledger_override, |key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(
        bind_override: Option<SocketAddr>,
        ledger_override: Option<LedgerBackend>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_required_or(&lookup, "SERVER_BIND", default_bind())?,
        };

        // Security configuration (REQUIRED)
        let admin_secret = lookup("ADMIN_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "ADMIN_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 16".to_string(),
        })?;

        if admin_secret.len() < MIN_ADMIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "ADMIN_SECRET".to_string(),
                reason: format!("Must be at least {MIN_ADMIN_SECRET_LEN} characters"),
            });
        }

        let ledger = match ledger_override {
            Some(ledger) => ledger,
            None => parse_required_or(&lookup, "LEDGER_BACKEND", LedgerBackend::Postgres)?,
        };

        let database_defaults = PostgresConfig::default();
        let database = PostgresConfig {
            database_url: lookup("DATABASE_URL").unwrap_or(database_defaults.database_url),
            max_connections: parse_var_or(
                &lookup,
                "DB_MAX_CONNECTIONS",
                database_defaults.max_connections,
            ),
            min_connections: parse_var_or(
                &lookup,
                "DB_MIN_CONNECTIONS",
                database_defaults.min_connections,
            ),
            connection_timeout_secs: parse_var_or(
                &lookup,
                "DB_CONNECTION_TIMEOUT_SECS",
                database_defaults.connection_timeout_secs,
            ),
        };

        let round_defaults = RoundConfig::default();
        let round = RoundConfig {
            entry_fee: parse_var_or(&lookup, "ENTRY_FEE", round_defaults.entry_fee),
            starting_balance: parse_var_or(
                &lookup,
                "STARTING_BALANCE",
                round_defaults.starting_balance,
            ),
            payout_percent: parse_var_or(&lookup, "PAYOUT_PERCENT", round_defaults.payout_percent),
            countdown_ticks: parse_var_or(
                &lookup,
                "COUNTDOWN_TICKS",
                round_defaults.countdown_ticks,
            ),
            countdown_tick: millis_var_or(&lookup, "COUNTDOWN_TICK_MS", round_defaults.countdown_tick),
            call_interval: millis_var_or(&lookup, "CALL_INTERVAL_MS", round_defaults.call_interval),
            settle_delay: millis_var_or(&lookup, "SETTLE_DELAY_MS", round_defaults.settle_delay),
            ..round_defaults
        };

        let metrics_bind = match lookup("METRICS_BIND") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{raw}' is not an IP:PORT address"),
            })?),
            None => None,
        };

        Ok(ServerConfig {
            bind,
            admin_secret,
            ledger,
            database,
            round,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.round.validate().map_err(|reason| ConfigError::Invalid {
            var: "round settings".to_string(),
            reason,
        })?;

        if self.ledger == LedgerBackend::Postgres
            && self.database.min_connections > self.database.max_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from SERVER_BIND".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 3000))
}

/// Parse a variable, falling back to `default` when it is unset or unparseable
fn parse_var_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a variable, falling back to `default` only when it is unset
fn parse_required_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn millis_var_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(None, None, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "ADMIN_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ADMIN_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_admin_secret_required() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref var, .. } if var == "ADMIN_SECRET"));

        let err = load(&[("ADMIN_SECRET", "short")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("ADMIN_SECRET", "s3cret-admin")]).unwrap();
        assert_eq!(config.bind, default_bind());
        assert_eq!(config.ledger, LedgerBackend::Postgres);
        assert_eq!(config.round, RoundConfig::default());
        assert_eq!(config.metrics_bind, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_settings_from_env() {
        let config = load(&[
            ("ADMIN_SECRET", "s3cret-admin"),
            ("LEDGER_BACKEND", "memory"),
            ("ENTRY_FEE", "25"),
            ("PAYOUT_PERCENT", "90"),
            ("CALL_INTERVAL_MS", "250"),
            ("SERVER_BIND", "0.0.0.0:8080"),
        ])
        .unwrap();

        assert_eq!(config.ledger, LedgerBackend::Memory);
        assert_eq!(config.round.entry_fee, 25);
        assert_eq!(config.round.payout_percent, 90);
        assert_eq!(config.round.call_interval, Duration::from_millis(250));
        assert_eq!(config.bind.port(), 8080);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = load(&[("ADMIN_SECRET", "s3cret-admin"), ("LEDGER_BACKEND", "redis")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "LEDGER_BACKEND"));

        let err = load(&[("ADMIN_SECRET", "s3cret-admin"), ("SERVER_BIND", "nowhere")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "SERVER_BIND"));

        let config = load(&[("ADMIN_SECRET", "s3cret-admin"), ("PAYOUT_PERCENT", "150")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_win() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("ADMIN_SECRET", "s3cret-admin"), ("LEDGER_BACKEND", "postgres")]);
        let bind: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        let config = ServerConfig::from_lookup(Some(bind), Some(LedgerBackend::Memory), |key| {
            vars.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.bind, bind);
        assert_eq!(config.ledger, LedgerBackend::Memory);
    }
}
