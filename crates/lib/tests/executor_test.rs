//! # Safe SQL Executor Tests
//!
//! Runs statements through `SqlExecutor` against the seeded in-memory
//! inventory database, and checks that rejected statements never reach a
//! backend.

mod common;

use crate::common::setup_tracing;
use serde_json::json;
use stockquery::{executor::SqlExecutor, EngineError, SqlQuery};
use stockquery_test_utils::{RecordingStorage, TestSetup};

#[tokio::test]
async fn test_rows_keep_column_order_and_types() {
    setup_tracing();

    // 1. Setup
    let setup = TestSetup::new().await.expect("fixture database");
    let executor = SqlExecutor::new(setup.storage(), 100);

    // 2. Act
    let rows = executor
        .execute(&SqlQuery::new(
            "SELECT sku, name, stock_quantity, price FROM products WHERE id = 1",
        ))
        .await
        .unwrap();

    // 3. Assert
    assert_eq!(rows.len(), 1);
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["sku", "name", "stock_quantity", "price"]);
    assert_eq!(rows[0]["name"], json!("KitKat"));
    assert_eq!(rows[0]["stock_quantity"], json!(5));
}

#[tokio::test]
async fn test_row_limit_is_appended() {
    setup_tracing();

    let setup = TestSetup::new().await.unwrap();
    let executor = SqlExecutor::new(setup.storage(), 2);

    let rows = executor
        .execute(&SqlQuery::new("SELECT name FROM products ORDER BY id;"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_existing_limit_is_respected() {
    setup_tracing();

    let setup = TestSetup::new().await.unwrap();
    let executor = SqlExecutor::new(setup.storage(), 2);

    let rows = executor
        .execute(&SqlQuery::new("SELECT name FROM products ORDER BY id LIMIT 3"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_bound_parameters_match_substrings() {
    setup_tracing();

    let setup = TestSetup::new().await.unwrap();
    let executor = SqlExecutor::new(setup.storage(), 100);

    let rows = executor
        .execute(&SqlQuery::with_params(
            "SELECT name FROM products WHERE LOWER(name) LIKE LOWER(?) ORDER BY name",
            vec!["%MILK%".to_string()],
        ))
        .await
        .unwrap();

    assert_eq!(rows, vec![json!({"name": "Dairy Milk"}).as_object().unwrap().clone()]);
}

#[tokio::test]
async fn test_mutations_never_reach_the_backend() {
    setup_tracing();

    // 1. Setup: a backend that records whatever reaches it.
    let storage = RecordingStorage::new(Vec::new());
    let executor = SqlExecutor::new(Box::new(storage.clone()), 100);

    // 2. Act
    let statements = [
        "DELETE FROM products",
        "DROP TABLE customers",
        "SELECT * FROM products; DELETE FROM products",
        "SELECT * FROM products; SELECT * FROM customers",
        "WITH gone AS (SELECT 1) UPDATE products SET price = 0",
        "   ",
        "PRAGMA table_info(products)",
    ];
    for sql in statements {
        let err = executor.execute(&SqlQuery::new(sql)).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsafeQuery(_)), "{sql}");
    }

    // 3. Assert
    assert!(storage.executed().is_empty());
}

#[tokio::test]
async fn test_validated_statements_reach_the_backend_capped() {
    setup_tracing();

    let storage = RecordingStorage::new(Vec::new());
    let executor = SqlExecutor::new(Box::new(storage.clone()), 100);

    executor
        .execute(&SqlQuery::with_params(
            "SELECT * FROM customers WHERE phone LIKE ?",
            vec!["%98765%".to_string()],
        ))
        .await
        .unwrap();

    assert_eq!(
        storage.executed(),
        vec![(
            "SELECT * FROM customers WHERE phone LIKE ? LIMIT 100".to_string(),
            vec!["%98765%".to_string()]
        )]
    );
}

#[tokio::test]
async fn test_database_errors_carry_the_statement() {
    setup_tracing();

    let setup = TestSetup::new().await.unwrap();
    let executor = SqlExecutor::new(setup.storage(), 100);

    let err = executor
        .execute(&SqlQuery::new("SELECT no_such_column FROM products"))
        .await
        .unwrap_err();

    match err {
        EngineError::Execution { sql, .. } => {
            assert_eq!(sql, "SELECT no_such_column FROM products LIMIT 100");
        }
        other => panic!("expected execution failure, got {other:?}"),
    }
}
