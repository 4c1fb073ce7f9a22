//! # Query Engine Tests
//!
//! End-to-end tests of `QueryEngine::ask` over the seeded database: cache
//! write-back policy, sentinels, failure classes and the training surface.

mod common;

use crate::common::{seeded_engine, setup_tracing};
use stockquery::{
    types::TrainingItem, EngineError, FailureKind, Intent, QueryCache, QueryEngineBuilder,
    QuerySource,
};
use stockquery_test_utils::{MockAiProvider, MockExampleStore, RecordingStorage, TestSetup};

#[tokio::test]
async fn test_template_answer_is_cached_and_reused() {
    setup_tracing();

    // 1. Setup
    let setup = TestSetup::new().await.unwrap();
    let engine = seeded_engine(&setup, None, MockExampleStore::new(), QueryCache::in_memory()).await;

    // 2. Act
    let first = engine.ask("Low stock?").await;
    let second = engine.ask("low   STOCK").await;

    // 3. Assert
    assert!(first.success, "{:?}", first.error);
    assert_eq!(first.source, Some(QuerySource::Template));
    assert_eq!(first.intent, Some(Intent::LowStock));
    assert_eq!(first.results.len(), 3);
    assert!(first.total_time_ms >= first.sql_extraction_time_ms);

    assert!(second.success);
    assert_eq!(second.source, Some(QuerySource::Cache));
    assert_eq!(second.sql, first.sql);
    assert_eq!(second.results, first.results);
    assert_eq!(engine.cache().len().await, 1);
}

#[tokio::test]
async fn test_conversational_reply_is_never_executed_or_cached() {
    setup_tracing();

    // 1. Setup: a backend that records every statement.
    let storage = RecordingStorage::new(Vec::new());
    let engine = QueryEngineBuilder::new()
        .storage(Box::new(storage.clone()))
        .build()
        .await
        .unwrap();

    // 2. Act
    let reply = engine.ask("hi").await;
    let farewell = engine.ask("Thanks, bye!").await;

    // 3. Assert
    assert!(reply.success);
    assert!(reply.sql.starts_with("CONVERSATIONAL:"));
    assert!(reply.results.is_empty());
    assert_eq!(reply.source, Some(QuerySource::Conversational));
    assert_eq!(farewell.intent, Some(Intent::Farewell));
    assert!(storage.executed().is_empty());
    assert!(engine.cache().is_empty().await);
}

#[tokio::test]
async fn test_fallback_needs_a_model_until_one_is_attached() {
    setup_tracing();

    // 1. Setup: no model at startup.
    let setup = TestSetup::new().await.unwrap();
    let engine = seeded_engine(&setup, None, MockExampleStore::new(), QueryCache::in_memory()).await;
    let question = "average invoice value by payment method";

    // 2. Act & Assert: the fallback path fails cleanly.
    let failed = engine.ask(question).await;
    assert!(!failed.success);
    assert_eq!(failed.failure, Some(FailureKind::Generation));
    assert_eq!(failed.sql, "");
    assert!(failed.error.unwrap().contains("model not initialized"));
    assert!(!engine.status().await.generator_ready);

    // Template routes keep working meanwhile.
    assert!(engine.ask("out of stock").await.success);

    // 3. Act: a model becomes available.
    let ai = MockAiProvider::new(vec![
        "```sql\nSELECT payment_method, AVG(total_amount) AS average FROM invoices GROUP BY payment_method\n```",
    ]);
    engine.attach_generator(Box::new(ai)).await;
    let answered = engine.ask(question).await;

    // 4. Assert: generated, executed and cached.
    assert!(answered.success, "{:?}", answered.error);
    assert_eq!(answered.source, Some(QuerySource::Generated));
    assert_eq!(answered.results.len(), 2);
    assert!(engine.status().await.generator_ready);
    assert_eq!(
        engine.cache().get(question).await.as_deref(),
        Some("SELECT payment_method, AVG(total_amount) AS average FROM invoices GROUP BY payment_method")
    );
}

#[tokio::test]
async fn test_time_sensitive_and_parameterized_queries_are_not_cached() {
    setup_tracing();

    let setup = TestSetup::new().await.unwrap();
    let engine = seeded_engine(&setup, None, MockExampleStore::new(), QueryCache::in_memory()).await;

    let period = engine.ask("sales this month").await;
    let named = engine.ask("kitkat stock").await;

    assert!(period.success && named.success);
    assert_eq!(period.results.len(), 1);
    assert_eq!(named.results.len(), 1);
    assert!(engine.cache().is_empty().await);
}

#[tokio::test]
async fn test_unsafe_generated_sql_is_rejected() {
    setup_tracing();

    // 1. Setup: the model tries to delete data.
    let setup = TestSetup::new().await.unwrap();
    let ai = MockAiProvider::new(vec!["DELETE FROM products"]);
    let engine = seeded_engine(&setup, Some(ai), MockExampleStore::new(), QueryCache::in_memory()).await;

    // 2. Act
    let response = engine.ask("remove every product").await;

    // 3. Assert: rejected with the SQL reported, nothing cached, data intact.
    assert!(!response.success);
    assert_eq!(response.failure, Some(FailureKind::UnsafeQuery));
    assert_eq!(response.sql, "DELETE FROM products");
    assert!(engine.cache().is_empty().await);
    let still_there = engine.ask("out of stock").await;
    assert_eq!(still_there.results.len(), 1);
}

#[tokio::test]
async fn test_execution_failure_reports_the_statement() {
    setup_tracing();

    let setup = TestSetup::new().await.unwrap();
    let ai = MockAiProvider::new(vec!["SELECT nope FROM products"]);
    let engine = seeded_engine(&setup, Some(ai), MockExampleStore::new(), QueryCache::in_memory()).await;

    let response = engine.ask("which products are nope").await;

    assert!(!response.success);
    assert_eq!(response.failure, Some(FailureKind::Execution));
    assert_eq!(response.sql, "SELECT nope FROM products LIMIT 100");
    assert!(engine.cache().is_empty().await);
}

#[tokio::test]
async fn test_blank_question_is_a_generation_failure() {
    setup_tracing();

    let engine = QueryEngineBuilder::new()
        .storage(Box::new(RecordingStorage::default()))
        .build()
        .await
        .unwrap();

    let response = engine.ask("   ?  ").await;

    assert!(!response.success);
    assert_eq!(response.failure, Some(FailureKind::Generation));
}

#[tokio::test]
async fn test_persisted_cache_serves_a_new_engine() -> anyhow::Result<()> {
    setup_tracing();

    // 1. Setup
    let setup = TestSetup::new().await?;
    let dir = tempfile::tempdir()?;

    // 2. Act: answer once, then start a second engine on the same directory.
    let first = seeded_engine(&setup, None, MockExampleStore::new(), QueryCache::load(dir.path()).await).await;
    assert_eq!(first.ask("pending credit").await.source, Some(QuerySource::Template));
    let second = seeded_engine(&setup, None, MockExampleStore::new(), QueryCache::load(dir.path()).await).await;
    let response = second.ask("Pending credit.").await;

    // 3. Assert
    assert_eq!(response.source, Some(QuerySource::Cache));
    assert_eq!(response.results.len(), 1);

    second.clear_cache().await?;
    assert_eq!(second.status().await.cached_queries, 0);
    Ok(())
}

#[tokio::test]
async fn test_training_is_idempotent_and_feeds_status() {
    setup_tracing();

    // 1. Setup
    let setup = TestSetup::new().await.unwrap();
    let examples = MockExampleStore::new();
    let engine = seeded_engine(&setup, None, examples.clone(), QueryCache::in_memory()).await;
    assert!(!engine.status().await.trained);

    // 2. Act
    let item = TrainingItem::QuestionSql {
        question: "how many products".to_string(),
        sql: "SELECT COUNT(*) FROM products".to_string(),
    };
    let first_id = engine.train(item.clone()).await.unwrap();
    let second_id = engine.train(item).await.unwrap();

    // 3. Assert
    assert_eq!(first_id, second_id);
    assert_eq!(first_id.len(), 32);
    assert_eq!(
        examples.contents(),
        vec!["Question: how many products\nSQL: SELECT COUNT(*) FROM products".to_string()]
    );
    assert!(engine.status().await.trained);
}

#[tokio::test]
async fn test_training_without_a_store_fails() {
    setup_tracing();

    let engine = QueryEngineBuilder::new()
        .storage(Box::new(RecordingStorage::default()))
        .build()
        .await
        .unwrap();

    let err = engine
        .train(TrainingItem::Documentation("Credit is given minus repaid.".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Training(_)));
}

#[tokio::test]
async fn test_train_from_dir_stores_every_item() -> anyhow::Result<()> {
    setup_tracing();

    // 1. Setup: a training directory with documentation and pairs.
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("documentation"))?;
    std::fs::create_dir_all(dir.path().join("question_sql_pairs"))?;
    std::fs::write(
        dir.path().join("documentation/credit.md"),
        "Credit is given minus repaid.",
    )?;
    std::fs::write(
        dir.path().join("question_sql_pairs/basic.json"),
        r#"[
            {"question": "how many products", "sql": "SELECT COUNT(*) FROM products"},
            {"question": "how many customers", "sql": "SELECT COUNT(*) FROM customers"}
        ]"#,
    )?;
    let setup = TestSetup::new().await?;
    let examples = MockExampleStore::new();
    let engine = seeded_engine(&setup, None, examples.clone(), QueryCache::in_memory()).await;

    // 2. Act
    let count = engine.train_from_dir(dir.path()).await?;

    // 3. Assert
    assert_eq!(count, 3);
    assert_eq!(examples.contents().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_builder_requires_storage() {
    setup_tracing();

    let err = QueryEngineBuilder::new().build().await.unwrap_err();

    assert!(matches!(err, EngineError::StorageConnection(_)));
}

#[tokio::test]
async fn test_concurrent_identical_questions_route_once() {
    setup_tracing();

    // 1. Setup: the model can answer exactly once.
    let setup = TestSetup::new().await.unwrap();
    let ai = MockAiProvider::new(vec!["SELECT payment_method, AVG(total_amount) AS average FROM invoices GROUP BY payment_method"]);
    let engine = seeded_engine(&setup, Some(ai.clone()), MockExampleStore::new(), QueryCache::in_memory()).await;

    // 2. Act: the same question asked five times at once.
    let asks = (0..5).map(|_| engine.ask("average invoice value by payment method"));
    let responses = futures::future::join_all(asks).await;

    // 3. Assert: one generation, every other caller served from the cache.
    assert_eq!(ai.get_calls().len(), 1);
    assert!(responses.iter().all(|r| r.success));
    let cached = responses
        .iter()
        .filter(|r| r.source == Some(QuerySource::Cache))
        .count();
    assert_eq!(cached, 4);
}
