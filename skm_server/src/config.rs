//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration.

use std::net::SocketAddr;
use std::time::Duration;

use shan_koe_mee::TableConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Complete server configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Number of tables to create on startup
    pub num_tables: usize,
    /// How often idle tables are checked for stale round state
    pub sweep_interval: Duration,
    /// Defaults applied to every table
    pub table_defaults: TableDefaultsConfig,
}

/// Default table parameters.
#[derive(Clone, Debug)]
pub struct TableDefaultsConfig {
    pub max_players: usize,
    pub min_buy_in: i64,
    pub max_buy_in: i64,
    pub default_bet: i64,
    pub ai_seats: usize,
    pub ai_balance: i64,
}

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration, with CLI overrides taking priority over the
    /// environment and the environment over built-in defaults.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        num_tables_override: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => match std::env::var("SERVER_BIND") {
                Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                    var: "SERVER_BIND".to_string(),
                    value,
                })?,
                Err(_) => "127.0.0.1:4000".parse().expect("default bind is valid"),
            },
        };

        let num_tables = match num_tables_override {
            Some(n) => n,
            None => parse_env_or("NUM_TABLES", 1)?,
        };

        let sweep_interval = Duration::from_secs(parse_env_or("SWEEP_INTERVAL_SECS", 30u64)?);

        let table_defaults = TableDefaultsConfig {
            max_players: parse_env_or("TABLE_MAX_PLAYERS", 6)?,
            min_buy_in: parse_env_or("TABLE_MIN_BUY_IN", 100)?,
            max_buy_in: parse_env_or("TABLE_MAX_BUY_IN", 10_000)?,
            default_bet: parse_env_or("TABLE_DEFAULT_BET", 50)?,
            ai_seats: parse_env_or("TABLE_AI_SEATS", 2)?,
            ai_balance: parse_env_or("TABLE_AI_BALANCE", 10_000)?,
        };

        Ok(Self {
            bind,
            num_tables,
            sweep_interval,
            table_defaults,
        })
    }

    /// Materialize one `TableConfig` per configured table.
    pub fn table_configs(&self) -> Vec<TableConfig> {
        (0..self.num_tables)
            .map(|i| TableConfig {
                table_id: format!("table-{}", i + 1),
                table_name: format!("Table {}", i + 1),
                max_players: self.table_defaults.max_players,
                min_buy_in: self.table_defaults.min_buy_in,
                max_buy_in: self.table_defaults.max_buy_in,
                default_bet: self.table_defaults.default_bet,
                ai_seats: self.table_defaults.ai_seats,
                ai_balance: self.table_defaults.ai_balance,
                ..TableConfig::default()
            })
            .collect()
    }
}
