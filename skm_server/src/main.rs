//! Multi-table Shan Koe Mee server.
//!
//! Spawns one table actor per configured table behind a single WebSocket
//! endpoint.

mod api;
mod config;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use pico_args::Arguments;
use shan_koe_mee::{HandEvaluator, HouseRules, OutcomeRules, ShanEvaluator, TableManager};
use tracing::info;

const HELP: &str = "\
Run a multi-table Shan Koe Mee server

USAGE:
  skm_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:4000]
  --tables     N           Number of tables to create  [default: env NUM_TABLES or 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:4000)
  NUM_TABLES               Number of tables to create on startup
  SWEEP_INTERVAL_SECS      Stale-table sweep interval
  TABLE_MAX_PLAYERS        Seats per table
  TABLE_MIN_BUY_IN         Minimum buy-in
  TABLE_MAX_BUY_IN         Maximum buy-in
  TABLE_DEFAULT_BET        Default per-round bet
  TABLE_AI_SEATS           House AI seats per table
  TABLE_AI_BALANCE         Starting balance for AI seats
  RUST_LOG                 Log filter (e.g., info,skm_server=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let tables_override: Option<usize> = pargs.opt_value_from_str("--tables")?;

    logging::init();

    let config = config::ServerConfig::from_env(bind_override, tables_override)?;
    info!("Starting Shan Koe Mee server at {}", config.bind);

    let evaluator: Arc<dyn HandEvaluator> = Arc::new(ShanEvaluator);
    let rules: Arc<dyn OutcomeRules> = Arc::new(HouseRules::new(evaluator.clone()));
    info!("Creating {} table(s)", config.num_tables);
    let manager = TableManager::new(
        config.table_configs(),
        evaluator,
        rules,
        config.sweep_interval,
    );

    let router = api::create_router(api::AppState { manager });
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;

    Ok(())
}
