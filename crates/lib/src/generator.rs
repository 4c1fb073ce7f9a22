//! # Fallback Generator
//!
//! Asks the generative model for SQL when no template rule matches. Few-shot
//! context comes from the example store; model calls are serialized through a
//! mutex so the model handle is never used by two requests at once.

use crate::{
    constants::{CONTEXT_SEPARATOR, QUESTION_SQL_KIND},
    errors::EngineError,
    prompts::{build_system_prompt, clean_generated_sql},
    providers::{ai::AiProvider, db::storage::ExampleStore},
    types::GenerationOptions,
};
use std::fmt::{self, Debug};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub struct FallbackGenerator {
    provider: Mutex<Box<dyn AiProvider>>,
    examples: Option<Box<dyn ExampleStore>>,
    options: GenerationOptions,
}

impl FallbackGenerator {
    pub fn new(
        provider: Box<dyn AiProvider>,
        examples: Option<Box<dyn ExampleStore>>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            provider: Mutex::new(provider),
            examples,
            options,
        }
    }

    /// The `k` most similar question/SQL examples joined into one block.
    ///
    /// Retrieval problems yield an empty context rather than an error.
    pub async fn retrieve_context(&self, question: &str, k: usize) -> String {
        let Some(store) = &self.examples else {
            return String::new();
        };
        match store.query_similar(question, k, Some(QUESTION_SQL_KIND)).await {
            Ok(examples) => examples.join(CONTEXT_SEPARATOR),
            Err(e) => {
                warn!("Example retrieval failed, continuing without context: {e}");
                String::new()
            }
        }
    }

    /// Generates cleaned SQL for `question` using `k` retrieved examples.
    pub async fn generate(&self, question: &str, k: usize) -> Result<String, EngineError> {
        let context = self.retrieve_context(question, k).await;
        if context.is_empty() {
            warn!("No few-shot context found for question.");
        }
        let system_prompt = build_system_prompt(&context);
        debug!(system_prompt = %system_prompt, "Rendered generation prompt");

        let raw = {
            let provider = self.provider.lock().await;
            provider
                .generate(&system_prompt, question, &self.options)
                .await
        }
        .map_err(|e| {
            error!("Generative model call failed: {e}");
            EngineError::Generation(e.to_string())
        })?;
        debug!(raw = %raw, "Raw model output");

        let sql = clean_generated_sql(&raw);
        if sql.is_empty() {
            return Err(EngineError::Generation(
                "model returned no SQL".to_string(),
            ));
        }
        info!(sql = %sql, "Generated SQL");
        Ok(sql)
    }
}

impl Debug for FallbackGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackGenerator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
