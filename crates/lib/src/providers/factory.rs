//! # AI Provider Factory
//!
//! Centralizes the construction of the generative model provider from
//! configuration, so every consumer (cli, tests) builds it the same way.

use crate::{
    errors::EngineError,
    providers::ai::{gemini::GeminiProvider, local::LocalAiProvider, AiProvider},
    types::GeneratorConfig,
};
use tracing::info;

/// Creates the AI provider named by `config.provider`.
///
/// - `gemini`: requires `api_key`; `api_url` defaults to the public
///   `generateContent` endpoint of `model_name`.
/// - `local`: requires `api_url` of an OpenAI-compatible chat-completions endpoint.
pub fn create_provider(config: &GeneratorConfig) -> Result<Box<dyn AiProvider>, EngineError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                EngineError::MissingAiProvider(
                    "api_key must be set to use the gemini provider.".to_string(),
                )
            })?;
            let model_name = config.model_name.as_deref().unwrap_or("gemini-2.0-flash");
            let api_url = config.api_url.clone().unwrap_or_else(|| {
                format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{model_name}:generateContent"
                )
            });
            info!("Configuring Gemini provider with URL: {}", api_url);
            Ok(Box::new(GeminiProvider::new(api_url, api_key)?))
        }
        "local" => {
            let api_url = config.api_url.clone().ok_or_else(|| {
                EngineError::MissingAiProvider(
                    "api_url must be set to use the local provider.".to_string(),
                )
            })?;
            info!("Configuring Local AI provider with URL: {}", api_url);
            Ok(Box::new(LocalAiProvider::new(
                api_url,
                config.api_key.clone(),
                config.model_name.clone(),
            )?))
        }
        other => Err(EngineError::MissingAiProvider(format!(
            "Unsupported AI provider: '{other}'"
        ))),
    }
}
