//! # Query Cache Tests
//!
//! Covers the in-memory contract, persistence across restarts, degraded
//! loading and the per-question in-flight guard.

mod common;

use crate::common::setup_tracing;
use std::sync::Arc;
use std::time::Duration;
use stockquery::{constants::CACHE_FILE_NAME, QueryCache};

#[tokio::test]
async fn test_set_get_and_clear() {
    setup_tracing();

    let cache = QueryCache::in_memory();
    cache.set("Top products?", "SELECT 1").await.unwrap();

    // Keys are normalized, so case, spacing and punctuation do not matter.
    assert_eq!(cache.get("top   PRODUCTS").await.as_deref(), Some("SELECT 1"));
    assert_eq!(cache.len().await, 1);

    cache.clear().await.unwrap();
    assert_eq!(cache.get("top products").await, None);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_entries_survive_a_restart() -> anyhow::Result<()> {
    setup_tracing();

    // 1. Setup: a cache directory that does not exist yet.
    let dir = tempfile::tempdir()?;
    let cache_dir = dir.path().join("ai_cache");

    // 2. Act: write through one instance, then load a fresh one.
    let first = QueryCache::load(&cache_dir).await;
    first.set("low stock", "SELECT * FROM products").await?;
    first.set("out of stock", "SELECT name FROM products").await?;
    let second = QueryCache::load(&cache_dir).await;

    // 3. Assert
    assert_eq!(
        second.get("low stock").await.as_deref(),
        Some("SELECT * FROM products")
    );
    assert_eq!(second.len().await, 2);
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(cache_dir.join(CACHE_FILE_NAME))?)?;
    assert_eq!(on_disk["out of stock"], "SELECT name FROM products");
    assert!(!cache_dir.join("query_cache.json.tmp").exists());
    Ok(())
}

#[tokio::test]
async fn test_clear_is_persisted() -> anyhow::Result<()> {
    setup_tracing();

    let dir = tempfile::tempdir()?;
    let cache = QueryCache::load(dir.path()).await;
    cache.set("low stock", "SELECT 1").await?;
    cache.clear().await?;

    let reloaded = QueryCache::load(dir.path()).await;
    assert!(reloaded.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_file_degrades_to_empty() -> anyhow::Result<()> {
    setup_tracing();

    // 1. Setup: garbage where the cache file should be.
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join(CACHE_FILE_NAME), "{ not json")?;

    // 2. Act
    let cache = QueryCache::load(dir.path()).await;

    // 3. Assert: loading did not fail and the next write repairs the file.
    assert!(cache.is_empty().await);
    cache.set("hi there", "SELECT 1").await?;
    let reloaded = QueryCache::load(dir.path()).await;
    assert_eq!(reloaded.get("hi there").await.as_deref(), Some("SELECT 1"));
    Ok(())
}

#[tokio::test]
async fn test_persist_failure_keeps_the_entry_in_memory() -> anyhow::Result<()> {
    setup_tracing();

    // A regular file where the cache directory should be makes writes fail.
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "")?;
    let cache = QueryCache::load(&blocker).await;

    let err = cache.set("low stock", "SELECT 1").await.unwrap_err();

    assert!(matches!(err, stockquery::EngineError::CachePersistence(_)));
    assert_eq!(cache.get("low stock").await.as_deref(), Some("SELECT 1"));
    Ok(())
}

#[tokio::test]
async fn test_same_question_is_single_flight() {
    setup_tracing();

    // 1. Setup: the first caller holds the guard for "low stock".
    let cache = Arc::new(QueryCache::in_memory());
    let guard = cache.lock_key("Low stock").await;

    // 2. Act: a second caller with the same normalized question waits, then
    //    sees the value written under the first guard.
    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            let _guard = cache.lock_key("low stock?").await;
            cache.get("low stock").await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    // A different question is not blocked.
    let other = tokio::time::timeout(Duration::from_secs(1), cache.lock_key("out of stock")).await;
    assert!(other.is_ok());

    cache.set("low stock", "SELECT 1").await.unwrap();
    drop(guard);

    // 3. Assert
    let seen = waiter.await.unwrap();
    assert_eq!(seen.as_deref(), Some("SELECT 1"));
}
