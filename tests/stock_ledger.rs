use anyhow::Result;
use rusqlite::Connection;
use rust_stock_ledger::upsert::INSERT_STOCK;
use rust_stock_ledger::{
    open_connection, query_stocks, upsert_stock, Ledger, LedgerConfig, Params, SqlQuery,
    StockRecord, StockStore, StockTx, UpsertError, UpsertOutcome, UpsertPhase, Value,
};
use tempfile::NamedTempFile;

// Helper function to create an in-memory database for testing
fn create_test_db() -> Result<Connection> {
    Ok(open_connection(&LedgerConfig::in_memory())?)
}

// Helper function to create a temporary file-based database
fn create_temp_db() -> Result<(LedgerConfig, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let path = temp_file.path().to_str().unwrap().to_string();
    Ok((LedgerConfig::new(path), temp_file))
}

fn amount_of(conn: &Connection, name: &str) -> Result<Vec<i64>> {
    Ok(query_stocks(conn, name)?
        .iter()
        .map(|row| StockRecord::try_from(row).map(|record| record.amount))
        .collect::<Result<_, _>>()?)
}

#[tokio::test]
async fn test_upsert_scenario() {
    test_upsert_scenario_impl().unwrap();
}

fn test_upsert_scenario_impl() -> Result<()> {
    let mut conn = create_test_db()?;

    let outcome = upsert_stock(&mut conn, "apple", 100)?;
    assert_eq!(outcome, UpsertOutcome::Inserted { amount: 100 });

    let rows = query_stocks(&conn, "apple")?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
    assert_eq!(rows[0].get("name"), Some(&Value::Text("apple".to_string())));
    assert_eq!(rows[0].get("amount"), Some(&Value::Integer(100)));

    let outcome = upsert_stock(&mut conn, "apple", 200)?;
    assert_eq!(
        outcome,
        UpsertOutcome::Updated {
            previous: 100,
            amount: 300
        }
    );
    assert_eq!(amount_of(&conn, "apple")?, vec![300]);

    upsert_stock(&mut conn, "banana", 50)?;
    let records = query_stocks(&conn, "")?
        .iter()
        .map(StockRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        records,
        vec![
            StockRecord {
                id: 1,
                name: "apple".to_string(),
                amount: 300
            },
            StockRecord {
                id: 2,
                name: "banana".to_string(),
                amount: 50
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_upsert_is_additive() {
    test_upsert_is_additive_impl().unwrap();
}

fn test_upsert_is_additive_impl() -> Result<()> {
    let mut conn = create_test_db()?;
    upsert_stock(&mut conn, "pear", 10)?;

    upsert_stock(&mut conn, "pear", 7)?;
    upsert_stock(&mut conn, "pear", 7)?;
    assert_eq!(amount_of(&conn, "pear")?, vec![24]);

    // Negative deltas decrement.
    upsert_stock(&mut conn, "pear", -30)?;
    assert_eq!(amount_of(&conn, "pear")?, vec![-6]);
    Ok(())
}

#[tokio::test]
async fn test_lookup_of_unknown_name_is_empty() {
    test_lookup_of_unknown_name_is_empty_impl().unwrap();
}

fn test_lookup_of_unknown_name_is_empty_impl() -> Result<()> {
    let mut conn = create_test_db()?;
    assert!(query_stocks(&conn, "")?.is_empty());

    upsert_stock(&mut conn, "apple", 1)?;
    assert!(query_stocks(&conn, "durian")?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_null_and_blob_columns() {
    test_null_and_blob_columns_impl().unwrap();
}

fn test_null_and_blob_columns_impl() -> Result<()> {
    let mut conn = create_test_db()?;
    conn.execute(
        "INSERT INTO stocks (name, amount) VALUES ('fig', NULL)",
        [],
    )?;
    // 'kiwi' stored as a blob rather than text.
    let mut tx = conn.begin()?;
    tx.execute(&SqlQuery::new(INSERT_STOCK).with_params(
        Params::new()
            .with_value(":name", b"kiwi".to_vec())
            .with_value(":amount", 3_i64),
    ))?;
    tx.commit()?;
    let kind: String = conn.query_row(
        "SELECT typeof(name) FROM stocks WHERE id = 2",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(kind, "blob");

    let rows = query_stocks(&conn, "")?;
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].get("amount"), Some(&Value::Null));
    assert!(rows[0]["amount"].is_null());
    assert_ne!(rows[0].get("amount"), Some(&Value::Integer(0)));

    assert_eq!(rows[1].get("name"), Some(&Value::Text("kiwi".to_string())));
    assert_eq!(rows[1].get("amount"), Some(&Value::Integer(3)));
    Ok(())
}

#[tokio::test]
async fn test_failed_update_is_rolled_back() {
    test_failed_update_is_rolled_back_impl().unwrap();
}

fn test_failed_update_is_rolled_back_impl() -> Result<()> {
    let mut conn = create_test_db()?;
    upsert_stock(&mut conn, "apple", 100)?;
    conn.execute_batch(
        r#"
        CREATE TRIGGER no_negative_stock BEFORE UPDATE ON stocks
        WHEN NEW.amount < 0
        BEGIN
            SELECT RAISE(ABORT, 'negative stock');
        END;
        "#,
    )?;

    let err = upsert_stock(&mut conn, "apple", -500).unwrap_err();
    assert!(matches!(err, UpsertError::Update { ref name, .. } if name == "apple"));
    assert!(err.changes_attempted());
    assert!(conn.is_autocommit());

    assert_eq!(amount_of(&conn, "apple")?, vec![100]);
    Ok(())
}

#[tokio::test]
async fn test_failed_insert_is_rolled_back() {
    test_failed_insert_is_rolled_back_impl().unwrap();
}

fn test_failed_insert_is_rolled_back_impl() -> Result<()> {
    let mut conn = create_test_db()?;
    conn.execute_batch(
        r#"
        CREATE TRIGGER no_negative_insert BEFORE INSERT ON stocks
        WHEN NEW.amount < 0
        BEGIN
            SELECT RAISE(ABORT, 'negative stock');
        END;
        "#,
    )?;

    let err = upsert_stock(&mut conn, "plum", -1).unwrap_err();
    assert_eq!(err.phase(), UpsertPhase::Insert);
    assert!(conn.is_autocommit());
    assert!(query_stocks(&conn, "plum")?.is_empty());

    upsert_stock(&mut conn, "plum", 4)?;
    assert_eq!(amount_of(&conn, "plum")?, vec![4]);
    Ok(())
}

#[tokio::test]
async fn test_lookup_failures_change_nothing() {
    test_lookup_failures_change_nothing_impl().unwrap();
}

fn test_lookup_failures_change_nothing_impl() -> Result<()> {
    // A NULL amount cannot be read as the current quantity.
    let mut conn = create_test_db()?;
    conn.execute("INSERT INTO stocks (name, amount) VALUES ('fig', NULL)", [])?;
    let err = upsert_stock(&mut conn, "fig", 5).unwrap_err();
    assert_eq!(err.phase(), UpsertPhase::Lookup);
    assert!(!err.changes_attempted());
    assert_eq!(query_stocks(&conn, "fig")?[0].get("amount"), Some(&Value::Null));

    // No stocks table at all.
    let mut bare = Connection::open_in_memory()?;
    let err = upsert_stock(&mut bare, "fig", 5).unwrap_err();
    assert!(matches!(err, UpsertError::Lookup { .. }));
    Ok(())
}

#[tokio::test]
async fn test_ledger_persists_between_connections() {
    test_ledger_persists_between_connections_impl().unwrap();
}

fn test_ledger_persists_between_connections_impl() -> Result<()> {
    let (config, _temp_file) = create_temp_db()?;

    let mut ledger = Ledger::open(config.clone())?;
    assert_eq!(ledger.config(), &config);
    ledger.ping()?;
    let before = ledger.restock("apple", 200)?;
    assert!(before.is_empty());
    let before = ledger.restock("apple", 200)?;
    assert_eq!(before[0].get("amount"), Some(&Value::Integer(200)));
    drop(ledger);

    let ledger = Ledger::open(config)?;
    let rows = ledger.query_stocks("apple")?;
    assert_eq!(rows[0].get("amount"), Some(&Value::Integer(400)));
    Ok(())
}

#[tokio::test]
async fn test_restock_reports_phase() {
    test_restock_reports_phase_impl().unwrap();
}

fn test_restock_reports_phase_impl() -> Result<()> {
    // A connection without the stocks table: ping works, the query does not.
    let mut ledger =
        Ledger::from_connection(LedgerConfig::in_memory(), Connection::open_in_memory()?);
    let err = ledger.restock("apple", 1).unwrap_err();
    assert_eq!(err.to_string(), "stock query failed");
    assert!(err.downcast_ref::<rust_stock_ledger::DecodeError>().is_some());
    assert!(ledger.connection().is_autocommit());
    Ok(())
}
