//! Ollama completion client for local models

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::anthropic::retry_after;
use super::llm::{CompletionProvider, CompletionRequest, ModelTier};

/// Ollama API client serving both model tiers
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    base_url: String,
    fast_model: String,
    strong_model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fast_model: config.fast_model.clone(),
            strong_model: config.strong_model.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let model = match request.tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Strong => &self.strong_model,
        };
        let url = format!("{}/api/generate", self.base_url);

        tracing::debug!("Ollama generate with model: {}", model);

        let body = GenerateRequest {
            model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Generation request failed: {}", e)))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::rate_limited("ollama", retry_after(response.headers())));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse generation response: {}", e)))?;

        Ok(generate_response.response)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self, tier: ModelTier) -> String {
        match tier {
            ModelTier::Fast => self.fast_model.clone(),
            ModelTier::Strong => self.strong_model.clone(),
        }
    }
}
