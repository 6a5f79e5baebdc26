//! Error types for the stock ledger.
//!
//! Every variant that originates in the store keeps the `rusqlite::Error` as
//! its source so callers can inspect the underlying fault.

use thiserror::Error;

/// Failures while turning a result cursor into [`ResultRow`](crate::decode::ResultRow)s.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The statement could not be prepared or executed.
    #[error("stock query failed")]
    Query(#[source] rusqlite::Error),
    #[error("failed to read column metadata")]
    ColumnMetadata(#[source] rusqlite::Error),
    /// A value in row `row` (0-based), column `column` could not be scanned.
    #[error("failed to scan column `{column}` of row {row}")]
    Scan {
        row: usize,
        column: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("cursor iteration failed")]
    CursorIteration(#[source] rusqlite::Error),
}

/// Phase of an upsert in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertPhase {
    Lookup,
    TransactionStart,
    Update,
    Insert,
    Commit,
}

/// Failures of [`upsert_stock`](crate::upsert::upsert_stock).
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("failed to look up current amount of `{name}`")]
    Lookup {
        name: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to start transaction")]
    TransactionStart(#[source] rusqlite::Error),
    #[error("failed to update amount of `{name}`")]
    Update {
        name: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to insert `{name}`")]
    Insert {
        name: String,
        #[source]
        source: rusqlite::Error,
    },
    /// `current + delta` does not fit in an `i64`.
    #[error("amount of `{name}` overflows: {current} + {delta}")]
    AmountOverflow {
        name: String,
        current: i64,
        delta: i64,
    },
    #[error("failed to commit transaction")]
    Commit(#[source] rusqlite::Error),
}

impl UpsertError {
    pub fn phase(&self) -> UpsertPhase {
        match self {
            Self::Lookup { .. } => UpsertPhase::Lookup,
            Self::TransactionStart(_) => UpsertPhase::TransactionStart,
            Self::Update { .. } | Self::AmountOverflow { .. } => UpsertPhase::Update,
            Self::Insert { .. } => UpsertPhase::Insert,
            Self::Commit(_) => UpsertPhase::Commit,
        }
    }

    /// Whether a write was attempted (and rolled back) before the failure.
    ///
    /// `false` means the store was never touched inside a transaction.
    pub fn changes_attempted(&self) -> bool {
        !matches!(
            self.phase(),
            UpsertPhase::Lookup | UpsertPhase::TransactionStart
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    InvalidValue {
        key: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Failures of [`open_connection`](crate::config::open_connection).
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to open database at `{path}`")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to configure connection")]
    Configure(#[source] rusqlite::Error),
    #[error("failed to create stocks schema")]
    Schema(#[source] rusqlite::Error),
}

/// Failures converting a decoded row into a [`StockRecord`](crate::record::StockRecord).
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("row has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("column `{column}` holds {found}, expected {expected}")]
    UnexpectedType {
        column: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}
