use crate::{
    errors::EngineError,
    types::{ExampleMetadata, Row},
};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::collections::HashMap;
use std::fmt::Debug;

/// A trait for running read-only statements against a storage backend.
///
/// Validation and row capping happen in `SqlExecutor` before a statement gets
/// here, so implementations only execute and collect rows.
#[async_trait]
pub trait Storage: Send + Sync + DynClone + Debug {
    /// Returns the name of the storage provider (e.g., "SQLite").
    fn name(&self) -> &str;

    /// Executes `sql` with `params` bound to its `?` placeholders, in order.
    async fn query_rows(&self, sql: &str, params: &[String]) -> Result<Vec<Row>, EngineError>;
}

dyn_clone::clone_trait_object!(Storage);

/// A store of training examples that can be searched by similarity to a question.
#[async_trait]
pub trait ExampleStore: Send + Sync + DynClone + Debug {
    /// Adds an example under a stable id. An existing id is left untouched.
    async fn add_example(
        &self,
        id: &str,
        content: &str,
        metadata: &ExampleMetadata,
    ) -> Result<(), EngineError>;

    /// Up to `k` example contents most similar to `question`, best first.
    /// `kind` restricts the search to one metadata kind.
    async fn query_similar(
        &self,
        question: &str,
        k: usize,
        kind: Option<&str>,
    ) -> Result<Vec<String>, EngineError>;

    /// Number of stored examples.
    async fn count(&self) -> Result<usize, EngineError>;
}

dyn_clone::clone_trait_object!(ExampleStore);

/// Read access to the key/value application settings.
#[async_trait]
pub trait SettingsStore: Send + Sync + DynClone + Debug {
    /// Every setting whose key starts with `prefix`.
    async fn settings_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>, EngineError>;
}

dyn_clone::clone_trait_object!(SettingsStore);
