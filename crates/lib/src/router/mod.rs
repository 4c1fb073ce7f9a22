//! # Intent Router
//!
//! Maps a question to a `SqlCandidate`. Matching is an explicit ordered list of
//! rules (see [`rules::RULES`]); the first rule that claims the question wins.
//! Categories overlap on purpose, so the order is part of the behavior: a
//! "product + customer" question must reach the generator before the product
//! rule can see it, and stock alerts must win over everything but small talk.
//!
//! Classification is synchronous and side-effect free. Only two outcomes
//! touch collaborators: identity answers read the settings store, and
//! delegated questions call the [`FallbackGenerator`].

pub mod product;
pub mod rules;

use crate::{
    constants::{COMPANY_SETTINGS_PREFIX, DEFAULT_COMPANY_NAME},
    dates::DateResolver,
    errors::EngineError,
    generator::FallbackGenerator,
    providers::db::storage::SettingsStore,
    question::normalize,
    types::{
        Entities, IdentityPayload, Intent, IntentMatch, QuerySource, RoutedQuery, SqlCandidate,
        SqlQuery,
    },
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// What a rule decided for a question, before any collaborator is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A canned conversational reply.
    Reply { intent: Intent, text: &'static str },
    /// Company details pulled from the settings store.
    Identity,
    /// A synthesized template query.
    Template {
        intent_match: IntentMatch,
        query: SqlQuery,
    },
    /// Hand the question to the generator with `examples` few-shot examples.
    Delegate {
        intent: Intent,
        entities: Entities,
        examples: usize,
    },
}

impl Decision {
    pub fn intent(&self) -> Intent {
        match self {
            Decision::Reply { intent, .. } => *intent,
            Decision::Identity => Intent::Identity,
            Decision::Template { intent_match, .. } => intent_match.intent,
            Decision::Delegate { intent, .. } => *intent,
        }
    }
}

#[derive(Debug)]
pub struct QueryRouter {
    dates: DateResolver,
    settings: Option<Box<dyn SettingsStore>>,
    generator: RwLock<Option<Arc<FallbackGenerator>>>,
    context_examples: usize,
}

impl QueryRouter {
    pub fn new(
        dates: DateResolver,
        settings: Option<Box<dyn SettingsStore>>,
        context_examples: usize,
    ) -> Self {
        Self {
            dates,
            settings,
            generator: RwLock::new(None),
            context_examples,
        }
    }

    /// Makes the generator available for delegated questions. Replaces any
    /// previously attached generator.
    pub async fn attach_generator(&self, generator: FallbackGenerator) {
        *self.generator.write().await = Some(Arc::new(generator));
        info!("Fallback generator attached.");
    }

    pub async fn has_generator(&self) -> bool {
        self.generator.read().await.is_some()
    }

    /// Runs the ordered rules over the normalized `question`.
    pub fn classify(&self, question: &str) -> Decision {
        let input = rules::RuleInput::new(question, &self.dates);
        for (name, rule) in rules::RULES {
            if let Some(decision) = rule(&input) {
                info!(rule = %name, intent = ?decision.intent(), "Question matched rule");
                return decision;
            }
        }
        info!("No rule matched, delegating to the generator");
        Decision::Delegate {
            intent: Intent::Fallback,
            entities: input.base_entities(),
            examples: self.context_examples,
        }
    }

    /// Produces the SQL candidate for a raw question.
    ///
    /// Fails with `EngineError::Generation` when the question needs the
    /// generator and none is attached, or when the generator fails. Never
    /// substitutes a template for a failed generation.
    pub async fn route(&self, question: &str) -> Result<RoutedQuery, EngineError> {
        let normalized = normalize(question);
        match self.classify(&normalized) {
            Decision::Reply { intent, text } => Ok(RoutedQuery {
                intent_match: IntentMatch::new(intent, Entities::default()),
                candidate: SqlCandidate::Conversational(text.to_string()),
                source: QuerySource::Conversational,
            }),
            Decision::Identity => Ok(RoutedQuery {
                intent_match: IntentMatch::new(Intent::Identity, Entities::default()),
                candidate: SqlCandidate::Identity(self.identity().await),
                source: QuerySource::Conversational,
            }),
            Decision::Template {
                intent_match,
                query,
            } => Ok(RoutedQuery {
                intent_match,
                candidate: SqlCandidate::Query(query),
                source: QuerySource::Template,
            }),
            Decision::Delegate {
                intent,
                entities,
                examples,
            } => {
                let generator = self.generator.read().await.clone().ok_or_else(|| {
                    EngineError::Generation("model not initialized".to_string())
                })?;
                // The model sees the user's own wording, not the normalized key.
                let sql = generator.generate(question.trim(), examples).await?;
                Ok(RoutedQuery {
                    intent_match: IntentMatch::new(intent, entities),
                    candidate: SqlCandidate::Query(SqlQuery::new(sql)),
                    source: QuerySource::Generated,
                })
            }
        }
    }

    /// Company details from `invoice_company_*` settings, with defaults.
    async fn identity(&self) -> IdentityPayload {
        let settings = match &self.settings {
            Some(store) => store
                .settings_with_prefix(COMPANY_SETTINGS_PREFIX)
                .await
                .unwrap_or_else(|e| {
                    warn!("Could not read company settings: {e}");
                    Default::default()
                }),
            None => Default::default(),
        };
        let field = |suffix: &str| {
            settings
                .get(&format!("{COMPANY_SETTINGS_PREFIX}{suffix}"))
                .filter(|v| !v.trim().is_empty())
                .cloned()
        };
        let company_name = field("name").unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string());
        IdentityPayload {
            kind: "identity".to_string(),
            message: format!(
                "I'm the AI assistant for **{company_name}**. I can help you with inventory queries, customer information, sales analytics, and more."
            ),
            company_name,
            address: field("address").unwrap_or_default(),
            phone: field("phone").unwrap_or_default(),
            email: field("email").unwrap_or_default(),
        }
    }
}

/// Removes leading and trailing words found in `words` until none remain.
pub(crate) fn strip_qualifiers(text: &str, words: &[&str]) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    while tokens.first().is_some_and(|t| words.contains(t)) {
        tokens.remove(0);
    }
    while tokens.last().is_some_and(|t| words.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}
