//! Remote completion providers
//!
//! Trait-based so the summarizer and generation engine receive their clients
//! by injection, and tests substitute fakes.

pub mod anthropic;
pub mod llm;
pub mod ollama;
pub mod retry;

use std::sync::Arc;

pub use anthropic::AnthropicClient;
pub use llm::{CompletionProvider, CompletionRequest, ModelTier};
pub use ollama::OllamaClient;
pub use retry::{RetryPolicy, RetryingClient};

use crate::config::{LlmBackend, LlmConfig, RetryConfig};
use crate::error::Result;

/// Build the configured backend wrapped in the retry policy
///
/// Missing credentials surface here as `Error::Config`.
pub fn build_provider(llm: &LlmConfig, retry: &RetryConfig) -> Result<Arc<dyn CompletionProvider>> {
    llm.validate()?;

    let inner: Arc<dyn CompletionProvider> = match llm.backend {
        LlmBackend::Anthropic => Arc::new(AnthropicClient::new(llm)?),
        LlmBackend::Ollama => Arc::new(OllamaClient::new(llm)?),
    };

    tracing::info!(
        "LLM provider: {} (fast={}, strong={})",
        inner.name(),
        inner.model(ModelTier::Fast),
        inner.model(ModelTier::Strong)
    );

    Ok(Arc::new(RetryingClient::new(inner, RetryPolicy::from(retry))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_build_provider_requires_key_for_anthropic() {
        let llm = LlmConfig {
            api_key: None,
            ..Default::default()
        };
        let result = build_provider(&llm, &RetryConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_build_provider_ollama_without_key() {
        let llm = LlmConfig {
            backend: LlmBackend::Ollama,
            base_url: "http://localhost:11434".to_string(),
            ..Default::default()
        };
        let provider = build_provider(&llm, &RetryConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
