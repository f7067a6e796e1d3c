//! Anthropic messages API client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::llm::{CompletionProvider, CompletionRequest, ModelTier};

const API_VERSION: &str = "2023-06-01";

/// Anthropic client serving both model tiers
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    fast_model: String,
    strong_model: String,
}

impl AnthropicClient {
    /// Create a new client; fails without an API key
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config("Anthropic backend requires an API key"))?
            .to_string();

        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            fast_model: config.fast_model.clone(),
            strong_model: config.strong_model.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| Error::config("API key contains invalid header characters"))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Parse a `retry-after` header given in seconds
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let model = match request.tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Strong => &self.strong_model,
        };

        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        tracing::debug!(
            "Anthropic request: model={} max_tokens={} prompt_chars={}",
            model,
            request.max_tokens,
            request.prompt.len()
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        // 529 is Anthropic's "overloaded"; treat it like a rate limit
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 529 {
            return Err(Error::rate_limited("anthropic", retry_after(response.headers())));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("Anthropic returned {}: {}", status, text)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse Anthropic response: {}", e)))?;

        let text = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(Error::llm("Anthropic response missing text content"));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self, tier: ModelTier) -> String {
        match tier {
            ModelTier::Fast => self.fast_model.clone(),
            ModelTier::Strong => self.strong_model.clone(),
        }
    }
}
