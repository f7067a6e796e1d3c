//! Completion provider trait shared by the summarizer and generation engine

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which model tier a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Fast, cheap model used for summarization
    Fast,
    /// Stronger model used for final generation
    Strong,
}

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub tier: ModelTier,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32, tier: ModelTier) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature,
            tier,
        }
    }
}

/// Trait for remote text completion
///
/// Implementations:
/// - `AnthropicClient`: Anthropic messages API
/// - `OllamaClient`: local Ollama server
/// - `RetryingClient`: bounded retry on rate limits around any provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete a prompt, returning the generated text
    ///
    /// Rate limiting must be reported as `Error::RateLimited`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Model used for a tier
    fn model(&self, tier: ModelTier) -> String;
}
