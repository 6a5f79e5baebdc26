//! SQLite-backed stock ledger.
//!
//! # Intention
//!
//! - Read stock rows into schema-less name → value maps ([`decode`]).
//! - Add a quantity to a named item, creating it on first use, inside one
//!   transaction ([`upsert`]).
//!
//! # Architectural Boundaries
//!
//! - Operations take their connection as a parameter; the [`Ledger`] facade
//!   only owns one for convenience.
//! - No locking beyond what SQLite provides: concurrent upserts of the same
//!   name can lose updates.

pub mod config;
pub mod decode;
pub mod error;
pub mod ledger;
pub mod record;
pub mod sqlite;
pub mod upsert;

pub use config::{open_connection, LedgerConfig};
pub use decode::{decode_rows, query_stocks, ResultRow, RowCursor, ScanRow};
pub use error::{ConfigError, ConnectError, DecodeError, RecordError, UpsertError, UpsertPhase};
pub use ledger::Ledger;
pub use record::StockRecord;
pub use sqlite::{Params, SqlQuery, StockStore, StockTx, Value};
pub use upsert::{upsert_stock, UpsertOutcome};
