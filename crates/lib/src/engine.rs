//! # Query Engine
//!
//! The service object that answers questions end to end:
//!
//! 1. normalize the question and take its per-key cache guard,
//! 2. serve cached SQL, or route the question (template, conversational reply
//!    or generated SQL),
//! 3. execute through the read-only guard,
//! 4. write freshly routed SQL back to the cache when it is safe to reuse.
//!
//! Every failure is reported in the returned [`QueryResponse`]; `ask` never
//! returns an error.

use crate::{
    cache::QueryCache,
    constants::{DEFAULT_CONTEXT_EXAMPLES, DEFAULT_ROW_LIMIT},
    dates::{Clock, DateResolver},
    errors::EngineError,
    executor::SqlExecutor,
    generator::FallbackGenerator,
    providers::{
        ai::AiProvider,
        db::storage::{ExampleStore, SettingsStore, Storage},
    },
    question::normalize,
    router::QueryRouter,
    training::load_training_dir,
    types::{
        AppConfig, EngineStatus, ExampleMetadata, FailureKind, GenerationOptions, Intent,
        QueryResponse, QuerySource, Row, SqlCandidate, SqlQuery, TrainingItem,
    },
};
use std::{path::Path, sync::Arc, time::Instant};
use tracing::{error, info, warn};

/// Builds a [`QueryEngine`]. Only the storage backend is required.
pub struct QueryEngineBuilder {
    storage: Option<Box<dyn Storage>>,
    settings: Option<Box<dyn SettingsStore>>,
    examples: Option<Box<dyn ExampleStore>>,
    ai_provider: Option<Box<dyn AiProvider>>,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<QueryCache>,
    row_limit: u32,
    context_examples: usize,
    options: GenerationOptions,
}

impl Default for QueryEngineBuilder {
    fn default() -> Self {
        Self {
            storage: None,
            settings: None,
            examples: None,
            ai_provider: None,
            clock: None,
            cache: None,
            row_limit: DEFAULT_ROW_LIMIT,
            context_examples: DEFAULT_CONTEXT_EXAMPLES,
            options: GenerationOptions::default(),
        }
    }
}

impl QueryEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the row limit, context depth and sampling options of `config`.
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.row_limit = config.row_limit;
        self.context_examples = config.context_examples;
        self.options = config.generator.options();
        self
    }

    /// Sets the database the executor runs statements against.
    pub fn storage(mut self, storage: Box<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets where the company identity is read from.
    pub fn settings(mut self, settings: Box<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the example store used for training and few-shot retrieval.
    pub fn examples(mut self, examples: Box<dyn ExampleStore>) -> Self {
        self.examples = Some(examples);
        self
    }

    /// Sets the generative model. Without one, only template and
    /// conversational questions can be answered until `attach_generator`.
    pub fn ai_provider(mut self, provider: Box<dyn AiProvider>) -> Self {
        self.ai_provider = Some(provider);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the cache. Defaults to an in-memory cache.
    pub fn cache(mut self, cache: QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub fn context_examples(mut self, context_examples: usize) -> Self {
        self.context_examples = context_examples;
        self
    }

    pub fn generation_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn build(self) -> Result<QueryEngine, EngineError> {
        let storage = self.storage.ok_or_else(|| {
            EngineError::StorageConnection("a storage provider is required".to_string())
        })?;
        let dates = self.clock.map(DateResolver::new).unwrap_or_default();
        let router = QueryRouter::new(dates, self.settings, self.context_examples);

        let engine = QueryEngine {
            router,
            cache: self.cache.unwrap_or_else(QueryCache::in_memory),
            executor: SqlExecutor::new(storage, self.row_limit),
            examples: self.examples,
            options: self.options,
        };
        if let Some(provider) = self.ai_provider {
            engine.attach_generator(provider).await;
        }
        Ok(engine)
    }
}

#[derive(Debug)]
pub struct QueryEngine {
    router: QueryRouter,
    cache: QueryCache,
    executor: SqlExecutor,
    examples: Option<Box<dyn ExampleStore>>,
    options: GenerationOptions,
}

impl QueryEngine {
    /// Makes `provider` available for questions no template answers.
    pub async fn attach_generator(&self, provider: Box<dyn AiProvider>) {
        let generator = FallbackGenerator::new(provider, self.examples.clone(), self.options);
        self.router.attach_generator(generator).await;
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Answers `question`. Failures come back as `success: false` with the
    /// failure class set.
    pub async fn ask(&self, question: &str) -> QueryResponse {
        let started = Instant::now();
        let key = normalize(question);
        if key.is_empty() {
            return Outcome::failed(String::new(), FailureKind::Generation, "empty question")
                .finish(started, None, None);
        }

        let _guard = self.cache.lock_key(&key).await;

        if let Some(sql) = self.cache.get(&key).await {
            info!(question = %key, "Cache hit");
            let extracted = Instant::now();
            let outcome = self.run(SqlQuery::new(sql)).await;
            return outcome.timed(started, extracted).finish(
                started,
                Some(QuerySource::Cache),
                None,
            );
        }
        info!(question = %key, "Cache miss");

        let routed = match self.router.route(question).await {
            Ok(routed) => routed,
            Err(e) => {
                error!(question = %key, "Could not produce SQL: {e}");
                return Outcome::failed(String::new(), failure_kind(&e), e.to_string())
                    .timed(started, Instant::now())
                    .finish(started, None, None);
            }
        };
        let extracted = Instant::now();
        let intent = Some(routed.intent_match.intent);

        let query = match &routed.candidate {
            SqlCandidate::Query(query) => query.clone(),
            sentinel => {
                let outcome = match sentinel.to_wire_string() {
                    Ok(wire) => Outcome::succeeded(wire, Vec::new()),
                    Err(e) => Outcome::failed(String::new(), FailureKind::Generation, e.to_string()),
                };
                return outcome.timed(started, extracted).finish(
                    started,
                    Some(routed.source),
                    intent,
                );
            }
        };

        let outcome = self.run(query.clone()).await.timed(started, extracted);
        let cacheable = matches!(routed.source, QuerySource::Template | QuerySource::Generated)
            && !query.is_parameterized()
            && !routed.is_time_sensitive();
        if outcome.failure.is_none() && cacheable {
            if let Err(e) = self.cache.set(&key, &query.sql).await {
                warn!(question = %key, "Query cache write failed: {e}");
            }
        }
        outcome.finish(started, Some(routed.source), intent)
    }

    async fn run(&self, query: SqlQuery) -> Outcome {
        match self.executor.execute(&query).await {
            Ok(rows) => {
                info!(rows = rows.len(), "Query executed");
                Outcome::succeeded(query.sql, rows)
            }
            Err(e) => {
                error!(sql = %query.sql, "Query failed: {e}");
                let sql = match &e {
                    EngineError::Execution { sql, .. } => sql.clone(),
                    _ => query.sql,
                };
                Outcome::failed(sql, failure_kind(&e), e.to_string())
            }
        }
    }

    /// Stores one training item as an example. Returns the example id, the
    /// md5 of its content, so training the same content twice is a no-op.
    pub async fn train(&self, item: TrainingItem) -> Result<String, EngineError> {
        let store = self.examples.as_ref().ok_or_else(|| {
            EngineError::Training("no example store is configured".to_string())
        })?;
        let (content, question) = match &item {
            TrainingItem::Ddl(text) | TrainingItem::Documentation(text) => (text.clone(), None),
            TrainingItem::QuestionSql { question, sql } => (
                format!("Question: {question}\nSQL: {sql}"),
                Some(question.clone()),
            ),
        };
        let id = format!("{:x}", md5::compute(content.as_bytes()));
        let metadata = ExampleMetadata {
            kind: item.kind().to_string(),
            question,
        };
        store.add_example(&id, &content, &metadata).await?;
        info!(id = %id, kind = %metadata.kind, "Stored training example");
        Ok(id)
    }

    /// Trains every item found under `dir`. Returns how many were stored.
    pub async fn train_from_dir(&self, dir: impl AsRef<Path>) -> Result<usize, EngineError> {
        let items = load_training_dir(dir).await?;
        let count = items.len();
        for item in items {
            self.train(item).await?;
        }
        Ok(count)
    }

    pub async fn clear_cache(&self) -> Result<(), EngineError> {
        self.cache.clear().await
    }

    pub async fn status(&self) -> EngineStatus {
        let trained = match &self.examples {
            Some(store) => store.count().await.unwrap_or_else(|e| {
                warn!("Could not count training examples: {e}");
                0
            }) > 0,
            None => false,
        };
        EngineStatus {
            generator_ready: self.router.has_generator().await,
            trained,
            cached_queries: self.cache.len().await,
        }
    }
}

fn failure_kind(error: &EngineError) -> FailureKind {
    match error {
        EngineError::UnsafeQuery(_) => FailureKind::UnsafeQuery,
        EngineError::Execution { .. } => FailureKind::Execution,
        _ => FailureKind::Generation,
    }
}

fn millis(duration: std::time::Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// The part of a response known once SQL has been produced and run.
struct Outcome {
    sql: String,
    results: Vec<Row>,
    failure: Option<(FailureKind, String)>,
    extraction_ms: f64,
    execution_ms: f64,
}

impl Outcome {
    fn succeeded(sql: String, results: Vec<Row>) -> Self {
        Self {
            sql,
            results,
            failure: None,
            extraction_ms: 0.0,
            execution_ms: 0.0,
        }
    }

    fn failed(sql: String, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            sql,
            results: Vec::new(),
            failure: Some((kind, message.into())),
            extraction_ms: 0.0,
            execution_ms: 0.0,
        }
    }

    /// Splits the time so far into extraction (until `extracted`) and execution.
    fn timed(mut self, started: Instant, extracted: Instant) -> Self {
        self.extraction_ms = millis(extracted.duration_since(started));
        self.execution_ms = millis(extracted.elapsed());
        self
    }

    fn finish(
        self,
        started: Instant,
        source: Option<QuerySource>,
        intent: Option<Intent>,
    ) -> QueryResponse {
        let (error, failure) = match self.failure {
            Some((kind, message)) => (Some(message), Some(kind)),
            None => (None, None),
        };
        QueryResponse {
            sql: self.sql,
            results: self.results,
            sql_extraction_time_ms: self.extraction_ms,
            execution_time_ms: self.execution_ms,
            total_time_ms: millis(started.elapsed()),
            success: failure.is_none(),
            error,
            failure,
            source,
            intent,
        }
    }
}
