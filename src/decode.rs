//! Schema-less decoding of result sets into name → value maps.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::collections::HashMap;

use crate::error::DecodeError;
use crate::sqlite::{Params, SqlQuery, SqliteCursor, Value};

/// One decoded row, keyed by column name.
pub type ResultRow = HashMap<String, Value>;

pub const SELECT_ALL_STOCKS: &str = "SELECT * FROM stocks";
pub const SELECT_STOCKS_BY_NAME: &str = "SELECT * FROM stocks WHERE name = :name";

/// A live handle over an in-progress query's result rows.
pub trait RowCursor {
    fn column_names(&self) -> rusqlite::Result<Vec<String>>;

    /// Advances to the next row. `Ok(None)` once the rows are exhausted.
    fn step(&mut self) -> rusqlite::Result<Option<&dyn ScanRow>>;
}

/// The row a cursor is positioned on.
pub trait ScanRow {
    fn scan(&self, idx: usize) -> rusqlite::Result<ValueRef<'_>>;
}

impl<C: RowCursor + ?Sized> RowCursor for &mut C {
    fn column_names(&self) -> rusqlite::Result<Vec<String>> {
        (**self).column_names()
    }

    fn step(&mut self) -> rusqlite::Result<Option<&dyn ScanRow>> {
        (**self).step()
    }
}

/// Drains `cursor` into one [`ResultRow`] per row, in cursor order.
///
/// Column names are read once, up front. Byte payloads (blobs, and text,
/// which the driver hands over as bytes) come back as [`Value::Text`];
/// integers, reals and nulls are kept as they are. Any scan failure aborts
/// the whole decode: no partial result is returned. The cursor is dropped
/// before this returns, on success and error alike.
pub fn decode_rows<C: RowCursor>(mut cursor: C) -> Result<Vec<ResultRow>, DecodeError> {
    let columns = cursor
        .column_names()
        .map_err(DecodeError::ColumnMetadata)?;

    let mut rows = Vec::new();
    while let Some(row) = cursor.step().map_err(DecodeError::CursorIteration)? {
        let mut decoded = ResultRow::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let value = row.scan(idx).map_err(|source| DecodeError::Scan {
                row: rows.len(),
                column: column.clone(),
                source,
            })?;
            decoded.insert(column.clone(), normalize(value));
        }
        rows.push(decoded);
    }
    Ok(rows)
}

fn normalize(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Builds the stock read: every row for an empty `name`, otherwise the rows
/// whose name matches exactly.
pub fn stock_query(name: &str) -> SqlQuery {
    if name.is_empty() {
        SqlQuery::new(SELECT_ALL_STOCKS)
    } else {
        SqlQuery::new(SELECT_STOCKS_BY_NAME).with_params(Params::new().with_value(":name", name))
    }
}

/// Reads the stocks matching `name` (all stocks when `name` is empty).
pub fn query_stocks(conn: &Connection, name: &str) -> Result<Vec<ResultRow>, DecodeError> {
    let query = stock_query(name);
    let mut stmt = conn
        .prepare(&query.statement)
        .map_err(DecodeError::Query)?;
    let bindings = query.params.bindings();
    let rows = stmt
        .query(bindings.as_slice())
        .map_err(DecodeError::Query)?;
    decode_rows(SqliteCursor::new(rows))
}
