use crate::{
    errors::EngineError,
    providers::db::storage::{ExampleStore, SettingsStore, Storage},
    types::{ExampleMetadata, Row},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug},
};
use tracing::{debug, info};
use turso::{Database, Value as TursoValue};

pub mod sql;

/// A provider for interacting with a local SQLite database using Turso.
///
/// This provider holds a `Database` instance, which manages a connection pool.
/// When cloned, it shares the same underlying database, allowing for concurrent and
/// shared access to the same database file or in-memory instance.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path or in-memory.
    ///
    /// # Arguments
    ///
    /// * `db_path`: The path to the SQLite database file. Use ":memory:" for a unique,
    ///   isolated in-memory database. To share an in-memory database across multiple
    ///   `SqliteProvider` instances (e.g., in tests), create one provider and
    ///   then `.clone()` it.
    pub async fn new(db_path: &str) -> Result<Self, EngineError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| EngineError::StorageConnection(e.to_string()))?;

        // WAL lets the example store write while inventory reads are in flight.
        let conn = db
            .connect()
            .map_err(|e| EngineError::StorageConnection(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| EngineError::StorageConnection(e.to_string()))?;

        Ok(Self { db })
    }

    /// A helper for tests to pre-populate data by executing multiple SQL statements.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), EngineError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| EngineError::StorageConnection(e.to_string()))?;

        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ())
                .await
                .map_err(|e| EngineError::StorageOperationFailed(e.to_string()))?;
        }
        Ok(())
    }

    /// Ensures that the tables owned by the engine exist.
    /// This function is idempotent and safe to call on every application startup.
    pub async fn initialize_schema(&self) -> Result<(), EngineError> {
        self.execute_all(sql::ALL_TABLE_CREATION_SQL).await
    }

    /// Creates the inventory tables. Used to stand up fixture databases.
    pub async fn initialize_inventory_schema(&self) -> Result<(), EngineError> {
        self.execute_all(sql::INVENTORY_TABLES).await
    }

    async fn execute_all(&self, statements: &[&str]) -> Result<(), EngineError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| EngineError::StorageConnection(e.to_string()))?;

        for statement in statements {
            conn.execute(statement, ())
                .await
                .map_err(|e| EngineError::StorageOperationFailed(e.to_string()))?;
        }
        Ok(())
    }

    async fn fetch_rows(
        &self,
        query: &str,
        params: Vec<TursoValue>,
    ) -> Result<Vec<Row>, EngineError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| EngineError::StorageConnection(e.to_string()))?;

        let mut stmt = conn
            .prepare(query)
            .await
            .map_err(|e| EngineError::StorageOperationFailed(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut rows = stmt
            .query(params)
            .await
            .map_err(|e| EngineError::StorageOperationFailed(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| EngineError::StorageOperationFailed(e.to_string()))?
        {
            let mut row_map = Row::new();
            for (i, name) in column_names.iter().enumerate() {
                let value = row
                    .get_value(i)
                    .map_err(|e| EngineError::StorageOperationFailed(e.to_string()))?;
                row_map.insert(name.clone(), turso_value_to_json(value));
            }
            results.push(row_map);
        }
        Ok(results)
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteProvider {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}

/// Converts a Turso value to a serde_json::Value.
fn turso_value_to_json(v: TursoValue) -> Value {
    match v {
        TursoValue::Null => Value::Null,
        TursoValue::Integer(i) => Value::Number(i.into()),
        TursoValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        TursoValue::Text(s) => Value::String(s),
        TursoValue::Blob(_) => Value::String("<blob>".to_string()),
    }
}

fn text_of(row: &Row, field: &str) -> Option<String> {
    row.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Lowercase word tokens used for keyword-overlap similarity.
fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Storage for SqliteProvider {
    fn name(&self) -> &str {
        "SQLite"
    }

    async fn query_rows(&self, sql: &str, params: &[String]) -> Result<Vec<Row>, EngineError> {
        debug!(query = %sql, "--> Executing SQLite query");
        let params = params
            .iter()
            .map(|p| TursoValue::Text(p.clone()))
            .collect();
        self.fetch_rows(sql, params).await
    }
}

#[async_trait]
impl ExampleStore for SqliteProvider {
    async fn add_example(
        &self,
        id: &str,
        content: &str,
        metadata: &ExampleMetadata,
    ) -> Result<(), EngineError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| EngineError::StorageConnection(e.to_string()))?;
        let question = metadata
            .question
            .clone()
            .map(TursoValue::Text)
            .unwrap_or(TursoValue::Null);
        conn.execute(
            sql::INSERT_TRAINING_EXAMPLE,
            vec![
                TursoValue::Text(id.to_string()),
                TursoValue::Text(metadata.kind.clone()),
                question,
                TursoValue::Text(content.to_string()),
            ],
        )
        .await?;
        debug!(id = %id, kind = %metadata.kind, "Stored training example");
        Ok(())
    }

    /// Ranks examples by how many question words they share with `question`.
    /// Ties keep insertion order.
    async fn query_similar(
        &self,
        question: &str,
        k: usize,
        kind: Option<&str>,
    ) -> Result<Vec<String>, EngineError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let rows = match kind {
            Some(kind) => {
                self.fetch_rows(
                    sql::SELECT_EXAMPLES_BY_KIND,
                    vec![TursoValue::Text(kind.to_string())],
                )
                .await?
            }
            None => self.fetch_rows(sql::SELECT_ALL_EXAMPLES, Vec::new()).await?,
        };

        let wanted = tokens(question);
        let mut scored: Vec<(usize, String)> = rows
            .iter()
            .filter_map(|row| {
                let content = text_of(row, "content")?;
                let basis = text_of(row, "question").unwrap_or_else(|| content.clone());
                let score = tokens(&basis).intersection(&wanted).count();
                Some((score, content))
            })
            .collect();
        // `sort_by` is stable, so equal scores stay in insertion order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let results: Vec<String> = scored.into_iter().take(k).map(|(_, c)| c).collect();
        info!(
            "Retrieved {} similar example(s) for few-shot context.",
            results.len()
        );
        Ok(results)
    }

    async fn count(&self) -> Result<usize, EngineError> {
        let rows = self.fetch_rows(sql::COUNT_EXAMPLES, Vec::new()).await?;
        let count = rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok(count as usize)
    }
}

#[async_trait]
impl SettingsStore for SqliteProvider {
    async fn settings_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>, EngineError> {
        let rows = self
            .fetch_rows(
                sql::SELECT_SETTINGS_LIKE,
                vec![TursoValue::Text(format!("{prefix}%"))],
            )
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| Some((text_of(row, "key")?, text_of(row, "value")?)))
            .collect())
    }
}
