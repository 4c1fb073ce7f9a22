pub mod gemini;
pub mod local;

use crate::{errors::EngineError, types::GenerationOptions};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a generative model.
///
/// This trait defines a common interface for generating SQL from a natural language
/// question using different Large Language Models (e.g., Gemini, local models).
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    ///
    /// The result should be a string containing the model's raw response.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, EngineError>;
}

dyn_clone::clone_trait_object!(AiProvider);
