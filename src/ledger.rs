use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::config::{open_connection, LedgerConfig};
use crate::decode::{query_stocks, ResultRow};
use crate::error::{DecodeError, UpsertError};
use crate::upsert::{upsert_stock, UpsertOutcome};

/// A stock ledger bound to one open connection.
pub struct Ledger {
    config: LedgerConfig,
    connection: Connection,
}

impl Ledger {
    /// Opens the database described by `config`.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        let connection = open_connection(&config)
            .with_context(|| format!("failed to connect to `{}`", config.db_path))?;
        Ok(Self { config, connection })
    }

    /// Wraps an already opened connection. The `stocks` table must exist.
    pub fn from_connection(config: LedgerConfig, connection: Connection) -> Self {
        Self { config, connection }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Checks that the connection can still run a statement.
    pub fn ping(&self) -> rusqlite::Result<()> {
        self.connection
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
    }

    pub fn query_stocks(&self, name: &str) -> Result<Vec<ResultRow>, DecodeError> {
        query_stocks(&self.connection, name)
    }

    pub fn upsert_stock(&mut self, name: &str, delta: i64) -> Result<UpsertOutcome, UpsertError> {
        upsert_stock(&mut self.connection, name, delta)
    }

    /// Shows the current stock for `name`, then adds `amount` to it.
    ///
    /// Returns the rows as they were before the update.
    pub fn restock(&mut self, name: &str, amount: i64) -> Result<Vec<ResultRow>> {
        self.ping().context("ping failed")?;

        let current = self.query_stocks(name).context("stock query failed")?;
        if current.is_empty() {
            info!(name, "no stock found");
        } else {
            info!(name, rows = ?current, "current stock");
        }

        let outcome = self
            .upsert_stock(name, amount)
            .context("stock update failed")?;
        info!(name, amount = outcome.amount(), "stock restocked");
        Ok(current)
    }
}
