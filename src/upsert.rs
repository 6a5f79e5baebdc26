//! Insert-or-increment of a stock amount.
//!
//! The current amount is read outside the transaction, then the transaction
//! either updates the row to `current + delta` or inserts it with `delta`.
//! Nothing locks the row between the read and the write, so two callers
//! upserting the same name at once can lose one of the increments. Callers
//! that need exact counts under concurrency must serialize access themselves.

use rusqlite::OptionalExtension;
use tracing::{debug, info, warn};

use crate::error::UpsertError;
use crate::sqlite::{Params, SqlQuery, StockStore, StockTx};

pub const SELECT_AMOUNT: &str = "SELECT amount FROM stocks WHERE name = :name";
pub const UPDATE_AMOUNT: &str = "UPDATE stocks SET amount = :amount WHERE name = :name";
pub const INSERT_STOCK: &str = "INSERT INTO stocks (name, amount) VALUES (:name, :amount)";

/// What a successful upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted { amount: i64 },
    Updated { previous: i64, amount: i64 },
}

impl UpsertOutcome {
    /// Amount stored after the upsert.
    pub fn amount(&self) -> i64 {
        match *self {
            UpsertOutcome::Inserted { amount } | UpsertOutcome::Updated { amount, .. } => amount,
        }
    }
}

/// Adds `delta` to the amount stored for `name`, creating the record with
/// `amount = delta` if there is none.
pub fn upsert_stock<S: StockStore>(
    store: &mut S,
    name: &str,
    delta: i64,
) -> Result<UpsertOutcome, UpsertError> {
    let result = apply(store, name, delta);
    match &result {
        Ok(UpsertOutcome::Inserted { amount }) => {
            info!(name, amount, "inserted stock");
        }
        Ok(UpsertOutcome::Updated { previous, amount }) => {
            info!(name, previous, amount, "updated stock");
        }
        Err(err) => {
            warn!(
                name,
                delta,
                phase = ?err.phase(),
                rolled_back = err.changes_attempted(),
                error = ?err,
                "stock upsert failed"
            );
        }
    }
    result
}

fn apply<S: StockStore>(store: &mut S, name: &str, delta: i64) -> Result<UpsertOutcome, UpsertError> {
    let lookup = SqlQuery::new(SELECT_AMOUNT).with_params(Params::new().with_value(":name", name));
    let current = store
        .query_amount(&lookup)
        .optional()
        .map_err(|source| UpsertError::Lookup {
            name: name.to_string(),
            source,
        })?;
    debug!(name, ?current, "looked up current amount");

    let mut tx = store.begin().map_err(UpsertError::TransactionStart)?;

    // Any early return below drops `tx` uncommitted, which rolls it back.
    let outcome = match current {
        Some(previous) => {
            let amount = previous
                .checked_add(delta)
                .ok_or_else(|| UpsertError::AmountOverflow {
                    name: name.to_string(),
                    current: previous,
                    delta,
                })?;
            let update = SqlQuery::new(UPDATE_AMOUNT).with_params(
                Params::new()
                    .with_value(":amount", amount)
                    .with_value(":name", name),
            );
            tx.execute(&update).map_err(|source| UpsertError::Update {
                name: name.to_string(),
                source,
            })?;
            UpsertOutcome::Updated { previous, amount }
        }
        None => {
            let insert = SqlQuery::new(INSERT_STOCK).with_params(
                Params::new()
                    .with_value(":name", name)
                    .with_value(":amount", delta),
            );
            tx.execute(&insert).map_err(|source| UpsertError::Insert {
                name: name.to_string(),
                source,
            })?;
            UpsertOutcome::Inserted { amount: delta }
        }
    };

    tx.commit().map_err(UpsertError::Commit)?;
    Ok(outcome)
}
