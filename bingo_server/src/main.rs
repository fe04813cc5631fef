//! Shared-round bingo server.
//!
//! One round actor owns the game; every WebSocket connection talks to it
//! through a cloned handle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use bingo::{LedgerGateway, LedgerStore, MemoryLedgerStore, PgLedgerStore, RoundActor};
use bingo_server::{
    api,
    config::{LedgerBackend, ServerConfig},
    logging, metrics,
};
use log::{info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run the shared-round bingo server

USAGE:
  bingo_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --ledger     BACKEND     Balance store: postgres | memory  [default: env LEDGER_BACKEND or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  ADMIN_SECRET             Bearer secret for /admin routes (required)
  DATABASE_URL             PostgreSQL connection string
  ENTRY_FEE                Fee debited on registration  [default: 10]
  STARTING_BALANCE         Balance of a new account  [default: 100]
  PAYOUT_PERCENT           Share of the fees paid to the winner  [default: 80]
  METRICS_BIND             Prometheus listener address  [default: disabled]
  RUST_LOG                 Log filter  [default: info,sqlx=warn,hyper=warn]
  (See .env.example for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let ledger_override: Option<LedgerBackend> = pargs.opt_value_from_str("--ledger")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, ledger_override)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        info!("Prometheus metrics at http://{}/metrics", metrics_bind);
    }

    let store: Arc<dyn LedgerStore> = match config.ledger {
        LedgerBackend::Postgres => {
            info!("Connecting to ledger database");
            let store = PgLedgerStore::connect(&config.database)
                .await
                .context("Failed to connect to ledger database")?;
            store
                .ensure_schema()
                .await
                .context("Failed to create ledger table")?;
            info!("Ledger database connected successfully");
            Arc::new(store)
        }
        LedgerBackend::Memory => {
            warn!("Using the in-memory ledger; balances are lost on restart");
            Arc::new(MemoryLedgerStore::new())
        }
    };

    let ledger = LedgerGateway::new(store, config.round.starting_balance);
    let (actor, round) = RoundActor::new(config.round.clone(), ledger.clone());
    tokio::spawn(actor.run());

    info!(
        "Round ready: entry fee {}, payout {}%, {} countdown ticks",
        config.round.entry_fee, config.round.payout_percent, config.round.countdown_ticks
    );

    let app = api::create_router(api::AppState::new(
        round,
        ledger,
        config.admin_secret.as_str(),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
