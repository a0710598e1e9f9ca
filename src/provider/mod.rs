//! Text-completion provider abstraction.
//!
//! A [`CompletionProvider`] takes a single prompt and returns a structured JSON object.
//! Transport failures and replies that are not a JSON object both surface as
//! [`ProviderError`]; callers in the cognition and conversation layers turn them into
//! deterministic fallbacks.

pub mod openai;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{api_key_from_env, CompletionConfig};
use crate::error::ProviderError;

/// One prompt with its sampling knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_tokens,
        }
    }
}

/// Contract for language-model backends.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name used in logs (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Run the prompt and return the reply as a JSON object.
    async fn complete(&self, request: &CompletionRequest) -> Result<Value, ProviderError>;
}

/// Create the configured completion provider.
///
/// Returns `Ok(None)` when the provider is disabled (`"none"`) or its API key is
/// missing; the engine then runs entirely on fallbacks.
pub fn create_provider(config: &CompletionConfig) -> anyhow::Result<Option<Arc<dyn CompletionProvider>>> {
    match config.provider.as_str() {
        "none" => Ok(None),
        "openai" => match api_key_from_env(&config.api_key_env) {
            Some(key) => {
                let provider = openai::OpenAiProvider::new(config, key)?;
                Ok(Some(Arc::new(provider)))
            }
            None => {
                tracing::warn!(
                    env = %config.api_key_env,
                    "completion API key not set; running on fallback classification"
                );
                Ok(None)
            }
        },
        other => anyhow::bail!("unknown completion provider: {other}. Supported: openai, none"),
    }
}

/// Pull the outermost JSON object out of a model reply.
///
/// Models sometimes wrap JSON in code fences or prose; everything outside the first
/// `{` and the last `}` is discarded. Anything that is not an object is a parse error.
pub fn parse_json_reply(text: &str) -> Result<Value, ProviderError> {
    let start = text
        .find('{')
        .ok_or_else(|| ProviderError::Parse("reply contains no JSON object".into()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ProviderError::Parse("reply JSON object is not closed".into()))?;

    let value: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| ProviderError::Parse(format!("invalid JSON in reply: {e}")))?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(ProviderError::Parse("reply is not a JSON object".into()))
    }
}
