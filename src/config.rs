use rusqlite::Connection;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::error::{ConfigError, ConnectError};
use crate::sqlite::STOCKS_SCHEMA;

pub const DB_PATH_ENV: &str = "STOCK_DB_PATH";
pub const BUSY_TIMEOUT_ENV: &str = "STOCK_DB_BUSY_TIMEOUT_MS";

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DB_PATH: &str = "stock.db";

/// Stock ledger connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Path to the SQLite database file, or `:memory:`
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// How long a statement waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl LedgerConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    /// Reads `STOCK_DB_PATH` and `STOCK_DB_BUSY_TIMEOUT_MS`, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = lookup(DB_PATH_ENV) {
            config.db_path = path;
        }
        if let Some(raw) = lookup(BUSY_TIMEOUT_ENV) {
            config.busy_timeout_ms =
                raw.trim()
                    .parse()
                    .map_err(|source| ConfigError::InvalidValue {
                        key: BUSY_TIMEOUT_ENV,
                        value: raw.clone(),
                        source,
                    })?;
        }
        Ok(config)
    }
}

/// Opens the database described by `config` and makes sure the `stocks`
/// table exists.
pub fn open_connection(config: &LedgerConfig) -> Result<Connection, ConnectError> {
    let conn = Connection::open(&config.db_path).map_err(|source| ConnectError::Open {
        path: config.db_path.clone(),
        source,
    })?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(ConnectError::Configure)?;
    conn.execute_batch(STOCKS_SCHEMA)
        .map_err(ConnectError::Schema)?;
    info!(path = %config.db_path, "opened stock ledger database");
    Ok(conn)
}
