//! # Intent Router Tests
//!
//! Exercises `QueryRouter::route` end to end: rule precedence, template
//! rendering with the fixture clock, conversational sentinels and delegation
//! to the fallback generator.

mod common;

use crate::common::{bare_router, fixture_dates, setup_tracing};
use stockquery::{
    generator::FallbackGenerator,
    router::QueryRouter,
    types::{GenerationOptions, Intent, QuerySource, SqlCandidate},
    EngineError,
};
use stockquery_test_utils::{MockAiProvider, MockExampleStore, MockSettings};

async fn router_with_generator(ai: MockAiProvider, examples: MockExampleStore) -> QueryRouter {
    let router = bare_router();
    let generator = FallbackGenerator::new(
        Box::new(ai),
        Some(Box::new(examples)),
        GenerationOptions::default(),
    );
    router.attach_generator(generator).await;
    router
}

#[tokio::test]
async fn test_stock_alert_renders_exact_template() {
    setup_tracing();

    // 1. Setup
    let router = bare_router();

    // 2. Act
    let routed = router.route("Low stock?").await.expect("template route");

    // 3. Assert
    assert_eq!(routed.source, QuerySource::Template);
    assert_eq!(routed.intent_match.intent, Intent::LowStock);
    let query = routed.candidate.as_query().expect("a query");
    assert_eq!(query.sql, stockquery::templates::analytics::low_stock().sql);
    assert!(!routed.is_time_sensitive());
}

#[tokio::test]
async fn test_greeting_is_a_sentinel_not_sql() {
    setup_tracing();

    let routed = bare_router().route("Hi!").await.unwrap();

    assert_eq!(routed.source, QuerySource::Conversational);
    assert!(routed.candidate.is_sentinel());
    let wire = routed.candidate.to_wire_string().unwrap();
    assert!(wire.starts_with("CONVERSATIONAL:Hello!"));
}

#[tokio::test]
async fn test_identity_reads_company_settings() {
    setup_tracing();

    // 1. Setup: settings carry a company name and a blank email.
    let settings = MockSettings::new(&[
        ("invoice_company_name", "Sri Lakshmi Traders"),
        ("invoice_company_email", "  "),
    ]);
    let router = QueryRouter::new(fixture_dates(), Some(Box::new(settings)), 2);

    // 2. Act
    let routed = router.route("who are you").await.unwrap();

    // 3. Assert: blank values fall back to defaults.
    match routed.candidate {
        SqlCandidate::Identity(payload) => {
            assert_eq!(payload.kind, "identity");
            assert_eq!(payload.company_name, "Sri Lakshmi Traders");
            assert_eq!(payload.email, "");
            assert!(payload.message.contains("**Sri Lakshmi Traders**"));
        }
        other => panic!("expected identity payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_identity_without_settings_uses_default_name() {
    setup_tracing();

    let routed = bare_router().route("Introduce yourself").await.unwrap();

    let wire = routed.candidate.to_wire_string().unwrap();
    assert!(wire.starts_with("IDENTITY:{"));
    assert!(wire.contains(r#""company_name":"Inventory Management System""#));
}

#[tokio::test]
async fn test_complete_months_resolve_against_the_clock() {
    setup_tracing();

    let routed = bare_router()
        .route("customers in the last 2 complete months")
        .await
        .unwrap();

    assert_eq!(routed.intent_match.intent, Intent::CustomerLookup);
    assert!(routed.is_time_sensitive());
    let query = routed.candidate.as_query().unwrap();
    assert!(query.sql.contains(
        "DATE(i.created_at) >= DATE('2025-01-01') AND DATE(i.created_at) < DATE('2025-03-01')"
    ));
    assert!(query.sql.contains(r#"AS "PRODUCTS BOUGHT""#));
}

#[tokio::test]
async fn test_entity_values_are_bound_not_spliced() {
    setup_tracing();

    let routed = bare_router()
        .route("customer details for O'Brien")
        .await
        .unwrap();

    let query = routed.candidate.as_query().unwrap();
    assert!(!query.sql.contains("o'brien"));
    assert_eq!(query.params, vec!["%o'brien%".to_string()]);
}

#[tokio::test]
async fn test_delegation_without_model_is_a_generation_failure() {
    setup_tracing();

    let err = bare_router()
        .route("average invoice value by payment method")
        .await
        .unwrap_err();

    match err {
        EngineError::Generation(message) => assert_eq!(message, "model not initialized"),
        other => panic!("expected generation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_purchase_relationship_uses_three_examples() {
    setup_tracing();

    // 1. Setup: a model answering with a fenced block.
    let examples = MockExampleStore::new();
    let ai = MockAiProvider::new(vec!["```sql\nSELECT c.name FROM customers c\n```"]);
    let router = router_with_generator(ai.clone(), examples.clone()).await;

    // 2. Act
    let routed = router.route("  Kisses bought by customer?  ").await.unwrap();

    // 3. Assert: delegated with the bypass depth, raw wording sent to the model.
    assert_eq!(routed.intent_match.intent, Intent::PurchaseRelationship);
    assert_eq!(routed.source, QuerySource::Generated);
    assert_eq!(
        routed.candidate.as_query().unwrap().sql,
        "SELECT c.name FROM customers c"
    );
    assert_eq!(
        examples.get_queries(),
        vec![("Kisses bought by customer?".to_string(), 3)]
    );
    let calls = ai.get_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "Kisses bought by customer?");
    assert!(calls[0].0.contains("CREATE TABLE IF NOT EXISTS invoices"));
}

#[tokio::test]
async fn test_generic_fallback_uses_configured_depth() {
    setup_tracing();

    let examples = MockExampleStore::new();
    let ai = MockAiProvider::new(vec![
        "SELECT payment_method, AVG(total_amount) FROM invoices GROUP BY payment_method",
    ]);
    let router = router_with_generator(ai, examples.clone()).await;

    let routed = router
        .route("average invoice value by payment method")
        .await
        .unwrap();

    assert_eq!(routed.intent_match.intent, Intent::Fallback);
    assert_eq!(examples.get_queries()[0].1, 2);
}

#[tokio::test]
async fn test_retrieval_failure_degrades_to_empty_context() {
    setup_tracing();

    // 1. Setup: the example store is down.
    let ai = MockAiProvider::new(vec!["SELECT 1"]);
    let router = router_with_generator(ai.clone(), MockExampleStore::failing()).await;

    // 2. Act
    let routed = router.route("top 5 products").await.unwrap();

    // 3. Assert: generation still ran, without an examples section.
    assert_eq!(routed.intent_match.intent, Intent::TopSold);
    assert!(!ai.get_calls()[0].0.contains("RELEVANT EXAMPLES:"));
}

#[tokio::test]
async fn test_model_errors_are_never_replaced_by_templates() {
    setup_tracing();

    let router = router_with_generator(MockAiProvider::failing(), MockExampleStore::new()).await;

    let err = router.route("top 5 products").await.unwrap_err();

    assert!(matches!(err, EngineError::Generation(_)));
}

#[tokio::test]
async fn test_model_returning_no_sql_is_a_failure() {
    setup_tracing();

    let router =
        router_with_generator(MockAiProvider::new(vec!["```sql\n```"]), MockExampleStore::new())
            .await;

    let err = router.route("top 5 products").await.unwrap_err();

    assert!(matches!(err, EngineError::Generation(_)));
}
