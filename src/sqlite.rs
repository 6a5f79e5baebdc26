use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, Rows, ToSql, Transaction};
use std::collections::HashMap;

use crate::decode::{RowCursor, ScanRow};

/// DDL for the single table the ledger reads and writes.
pub const STOCKS_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS stocks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE,
        amount INTEGER
    );
"#;

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Storage class name, as SQLite's `typeof()` reports it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(v) => ValueRef::Integer(*v),
            Value::Real(v) => ValueRef::Real(*v),
            Value::Text(v) => ValueRef::Text(v.as_bytes()),
            Value::Blob(v) => ValueRef::Blob(v.as_slice()),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// Named parameter bindings for SQL queries, keyed with their `:` prefix.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: HashMap<String, Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a named value
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Borrowed `(name, value)` pairs in the shape rusqlite binds by name.
    pub fn bindings(&self) -> Vec<(&str, &dyn ToSql)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}

/// SQL Query with typed parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            params: Params::new(),
        }
    }
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Connection capabilities the upsert engine needs.
///
/// Implemented for [`rusqlite::Connection`]; tests substitute their own
/// stores to inject faults.
pub trait StockStore {
    type Tx<'a>: StockTx
    where
        Self: 'a;

    /// Runs a single-row, single-column query and reads the column as an
    /// integer. A query matching no row fails with
    /// [`rusqlite::Error::QueryReturnedNoRows`].
    fn query_amount(&self, query: &SqlQuery) -> rusqlite::Result<i64>;

    fn begin(&mut self) -> rusqlite::Result<Self::Tx<'_>>;
}

/// An open transaction. Dropping it without [`commit`](StockTx::commit)
/// rolls it back.
pub trait StockTx {
    fn execute(&mut self, query: &SqlQuery) -> rusqlite::Result<usize>;

    fn commit(self) -> rusqlite::Result<()>;
}

impl StockStore for Connection {
    type Tx<'a> = Transaction<'a>;

    fn query_amount(&self, query: &SqlQuery) -> rusqlite::Result<i64> {
        let bindings = query.params.bindings();
        self.query_row(&query.statement, bindings.as_slice(), |row| row.get(0))
    }

    fn begin(&mut self) -> rusqlite::Result<Transaction<'_>> {
        self.transaction()
    }
}

impl StockTx for Transaction<'_> {
    fn execute(&mut self, query: &SqlQuery) -> rusqlite::Result<usize> {
        let conn: &Connection = self;
        let bindings = query.params.bindings();
        conn.execute(&query.statement, bindings.as_slice())
    }

    fn commit(self) -> rusqlite::Result<()> {
        Transaction::commit(self)
    }
}

/// [`RowCursor`] over the rows of an executed rusqlite statement.
pub struct SqliteCursor<'stmt> {
    rows: Rows<'stmt>,
}

impl<'stmt> SqliteCursor<'stmt> {
    pub fn new(rows: Rows<'stmt>) -> Self {
        Self { rows }
    }
}

impl RowCursor for SqliteCursor<'_> {
    fn column_names(&self) -> rusqlite::Result<Vec<String>> {
        let stmt = self.rows.as_ref().ok_or(rusqlite::Error::InvalidQuery)?;
        Ok(stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    fn step(&mut self) -> rusqlite::Result<Option<&dyn ScanRow>> {
        Ok(self.rows.next()?.map(|row| row as &dyn ScanRow))
    }
}

impl ScanRow for rusqlite::Row<'_> {
    fn scan(&self, idx: usize) -> rusqlite::Result<ValueRef<'_>> {
        self.get_ref(idx)
    }
}
