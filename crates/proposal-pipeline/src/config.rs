//! Configuration for the proposal pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable consulted when no API key is set in the config file
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Remote LLM configuration (both tiers)
    pub llm: LlmConfig,
    /// Summarizer thresholds and budgets
    pub summarization: SummarizationConfig,
    /// Context aggregation limits
    pub context: ContextConfig,
    /// Final generation parameters
    pub generation: GenerationConfig,
    /// Rate-limit retry policy
    pub retry: RetryConfig,
}

impl PipelineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file, filling missing credentials from the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml_str(&text)?;
        config.llm.apply_env();
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;
        self.validate_limits()
    }

    /// Threshold and policy checks, independent of credentials
    pub fn validate_limits(&self) -> Result<()> {
        let s = &self.summarization;
        if s.chunk_threshold == 0 {
            return Err(Error::config("summarization.chunk_threshold must be > 0"));
        }
        if s.small_threshold > s.chunk_threshold {
            return Err(Error::config(format!(
                "summarization.small_threshold ({}) exceeds chunk_threshold ({})",
                s.small_threshold, s.chunk_threshold
            )));
        }
        if s.max_summary_chars == 0 || s.max_chunk_summary_chars == 0 {
            return Err(Error::config("summary size caps must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be at least 1"));
        }
        if self.generation.redaction_sentinel.trim().is_empty() {
            return Err(Error::config("generation.redaction_sentinel must not be blank"));
        }

        Ok(())
    }
}

/// Which remote completion service to talk to
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Anthropic messages API (requires an API key)
    #[default]
    Anthropic,
    /// Local Ollama server
    Ollama,
}

/// LLM configuration for the fast (summarization) and strong (generation) tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider
    pub backend: LlmBackend,
    /// API base URL
    pub base_url: String,
    /// API key (Anthropic only)
    pub api_key: Option<String>,
    /// Model used for summarization
    pub fast_model: String,
    /// Model used for final generation
    pub strong_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Anthropic,
            base_url: "https://api.anthropic.com".to_string(),
            api_key: None,
            fast_model: "claude-3-5-haiku-latest".to_string(),
            strong_model: "claude-sonnet-4-0".to_string(),
            timeout_secs: 180,
        }
    }
}

impl LlmConfig {
    /// Fill the API key from the environment when the file leaves it unset
    pub fn apply_env(&mut self) {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            self.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        }
    }

    /// Missing credentials are fatal
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::config("llm.base_url is empty"));
        }
        if self.backend == LlmBackend::Anthropic
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::config(format!(
                "llm.api_key is not set and {} is empty",
                API_KEY_ENV
            )));
        }
        Ok(())
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Summarizer thresholds (all sizes in characters)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Inputs up to this size are passed through without an LLM call
    pub small_threshold: usize,
    /// Inputs above this size are map-reduced; also the per-chunk budget
    pub chunk_threshold: usize,
    /// Cap on every LLM-produced summary
    pub max_summary_chars: usize,
    /// Cap on a single chunk summary (and on raw text used in its place)
    pub max_chunk_summary_chars: usize,
    /// Max tokens for single-chunk and consolidation calls
    pub summary_max_tokens: u32,
    /// Max tokens for per-chunk calls
    pub chunk_max_tokens: u32,
    /// Sampling temperature for summarization
    pub temperature: f32,
    /// Concurrent summarization calls (1 = sequential)
    pub max_concurrent_calls: usize,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            small_threshold: 2_000,
            chunk_threshold: 15_000,
            max_summary_chars: 2_000,
            max_chunk_summary_chars: 1_500,
            summary_max_tokens: 1_024,
            chunk_max_tokens: 512,
            temperature: 0.2,
            max_concurrent_calls: 1,
        }
    }
}

/// Context aggregation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Web pages larger than this are summarized, smaller ones are inlined
    pub web_summary_threshold: usize,
    /// Knowledge-base files larger than this are summarized
    pub knowledge_summary_threshold: usize,
    /// Prior Q/A pairs included in the prompt
    pub max_prior_questions: usize,
    /// Chat-derived answers included in the prompt
    pub max_chat_responses: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            web_summary_threshold: 3_000,
            knowledge_summary_threshold: 3_000,
            max_prior_questions: 10,
            max_chat_responses: 10,
        }
    }
}

/// Final generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Max output tokens for the strong model
    pub max_tokens: u32,
    /// Low temperature for near-deterministic output
    pub temperature: f32,
    /// Marker the model emits in place of withheld content
    pub redaction_sentinel: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4_096,
            temperature: 0.2,
            redaction_sentinel: "[REDACTED]".to_string(),
        }
    }
}

/// Rate-limit retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
