//! # The Safe SQL Executor
//!
//! Every statement that reaches the database passes through `SqlExecutor`. It
//! rejects anything that is not a single read-only query, caps the number of
//! returned rows, and runs the statement through a `Storage` backend. Callers get
//! the rows in the statement's column order.

use crate::{
    errors::EngineError,
    providers::db::storage::Storage,
    types::{Row, SqlQuery},
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Statement keywords that are never allowed, even inside an otherwise valid SELECT.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "REPLACE", "GRANT",
    "REVOKE", "ATTACH", "DETACH", "PRAGMA", "VACUUM",
];

static FORBIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", FORBIDDEN_KEYWORDS.join("|")))
        .expect("forbidden keyword regex is valid")
});
static LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\b").expect("limit regex is valid"));

/// Rejects anything that is not a single read-only `SELECT`/`WITH` statement.
///
/// Keywords are matched as whole words, so a column named `updated_at` passes
/// while `please DELETE nothing` does not. A trailing `;` is allowed.
pub fn validate_read_only(sql: &str) -> Result<(), EngineError> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(EngineError::UnsafeQuery("empty statement".to_string()));
    }
    if trimmed.trim_end_matches(|c: char| c == ';' || c.is_whitespace()).contains(';') {
        return Err(EngineError::UnsafeQuery(
            "multiple statements are not allowed".to_string(),
        ));
    }
    let upper = trimmed.to_uppercase();
    if !(upper.starts_with("SELECT") || upper.starts_with("WITH")) {
        return Err(EngineError::UnsafeQuery(
            "only SELECT or WITH statements are allowed".to_string(),
        ));
    }
    if let Some(keyword) = FORBIDDEN_RE.find(trimmed) {
        return Err(EngineError::UnsafeQuery(format!(
            "forbidden keyword '{}'",
            keyword.as_str().to_uppercase()
        )));
    }
    Ok(())
}

/// Appends ` LIMIT {limit}` when the statement has no `LIMIT` of its own.
pub fn apply_row_limit(sql: &str, limit: u32) -> String {
    if LIMIT_RE.is_match(sql) {
        return sql.trim().to_string();
    }
    let body = sql.trim().trim_end_matches(';').trim_end();
    format!("{body} LIMIT {limit}")
}

/// Runs validated, row-capped statements against a storage backend.
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    storage: Box<dyn Storage>,
    row_limit: u32,
}

impl SqlExecutor {
    pub fn new(storage: Box<dyn Storage>, row_limit: u32) -> Self {
        Self { storage, row_limit }
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    /// Validates and executes `query`, returning its rows.
    ///
    /// A failed validation never reaches the database.
    pub async fn execute(&self, query: &SqlQuery) -> Result<Vec<Row>, EngineError> {
        if let Err(e) = validate_read_only(&query.sql) {
            warn!(sql = %query.sql, "Rejected unsafe statement: {e}");
            return Err(e);
        }
        let sql = apply_row_limit(&query.sql, self.row_limit);
        debug!(sql = %sql, params = ?query.params, backend = self.storage.name(), "Executing statement");

        self.storage
            .query_rows(&sql, &query.params)
            .await
            .map_err(|e| match e {
                EngineError::Execution { .. } => e,
                other => EngineError::Execution {
                    sql: sql.clone(),
                    message: other.to_string(),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_select_and_with() {
        assert!(validate_read_only("SELECT 1").is_ok());
        assert!(validate_read_only("  select * from products").is_ok());
        assert!(validate_read_only("WITH t AS (SELECT 1) SELECT * FROM t").is_ok());
    }

    #[test]
    fn rejects_blank_and_non_select() {
        assert!(matches!(
            validate_read_only("   "),
            Err(EngineError::UnsafeQuery(_))
        ));
        assert!(matches!(
            validate_read_only("DROP TABLE products"),
            Err(EngineError::UnsafeQuery(_))
        ));
        assert!(matches!(
            validate_read_only("PRAGMA table_info(products)"),
            Err(EngineError::UnsafeQuery(_))
        ));
    }

    #[test]
    fn rejects_forbidden_words_anywhere() {
        assert!(validate_read_only("SELECT 'please DELETE nothing'").is_err());
        assert!(validate_read_only("SELECT 1; drop table customers").is_err());
        assert!(validate_read_only("SELECT * FROM x; ATTACH DATABASE 'a' AS b").is_err());
    }

    #[test]
    fn rejects_more_than_one_statement() {
        let err = validate_read_only("SELECT 1; SELECT 2").unwrap_err();
        assert!(err.to_string().contains("multiple statements"));
        assert!(validate_read_only("SELECT 1 ;  ").is_ok());
        assert!(validate_read_only("SELECT 1;;").is_ok());
    }

    #[test]
    fn rejects_schema_changes_behind_a_select() {
        assert!(validate_read_only("WITH t AS (SELECT 1) CREATE TABLE x (id INTEGER)").is_err());
        assert!(validate_read_only("SELECT * FROM pragma_table_info('products')").is_ok());
    }

    #[test]
    fn column_names_containing_keywords_are_allowed() {
        assert!(validate_read_only("SELECT updated_at, created_at FROM products").is_ok());
        assert!(validate_read_only("SELECT deleted_flag FROM invoices").is_ok());
    }

    #[test]
    fn appends_limit_only_when_missing() {
        assert_eq!(
            apply_row_limit("SELECT * FROM products;", 100),
            "SELECT * FROM products LIMIT 100"
        );
        assert_eq!(
            apply_row_limit("SELECT * FROM products LIMIT 5", 100),
            "SELECT * FROM products LIMIT 5"
        );
        assert_eq!(
            apply_row_limit("select * from products limit 5;", 100),
            "select * from products limit 5;"
        );
    }
}
