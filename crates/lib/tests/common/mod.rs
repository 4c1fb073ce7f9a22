#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared setup for the integration tests: tracing initialization and small
//! builders around the fixtures in `stockquery-test-utils`.

use dotenvy::dotenv;
use std::sync::Once;
use stockquery::{
    dates::DateResolver, router::QueryRouter, QueryEngine, QueryEngineBuilder, QueryCache,
};
use stockquery_test_utils::{fixed_clock, MockAiProvider, MockExampleStore, TestSetup};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// A date resolver frozen on the fixture day.
pub fn fixture_dates() -> DateResolver {
    DateResolver::new(fixed_clock())
}

/// A router over the fixture day without settings or generator.
pub fn bare_router() -> QueryRouter {
    QueryRouter::new(fixture_dates(), None, 2)
}

/// An engine over the seeded database with the given model and example store.
pub async fn seeded_engine(
    setup: &TestSetup,
    ai: Option<MockAiProvider>,
    examples: MockExampleStore,
    cache: QueryCache,
) -> QueryEngine {
    let mut builder = QueryEngineBuilder::new()
        .storage(setup.storage())
        .settings(setup.settings())
        .examples(Box::new(examples))
        .clock(fixed_clock())
        .cache(cache);
    if let Some(ai) = ai {
        builder = builder.ai_provider(Box::new(ai));
    }
    builder.build().await.expect("engine builds")
}
