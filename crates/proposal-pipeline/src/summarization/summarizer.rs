//! Three-tier document summarizer
//!
//! - **Passthrough**: inputs up to `small_threshold` are returned verbatim
//!   with locally extracted key points and fields. No remote call.
//! - **Single call**: inputs up to `chunk_threshold` get one labeled-summary
//!   call on the fast tier.
//! - **Map-reduce**: larger inputs are chunked, each chunk is summarized with
//!   a lighter prompt, and the ordered chunk summaries are consolidated by one
//!   more labeled-summary call.
//!
//! Remote failures never abort summarization; every path degrades to local
//! extraction. Every LLM-derived summary is capped at `max_summary_chars`.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::SummarizationConfig;
use crate::error::Result;
use crate::providers::{CompletionProvider, CompletionRequest, ModelTier};
use crate::types::{DocumentSummary, ProjectType, SummaryMethod};

use super::chunker::TextChunker;
use super::local::{extract_fields, extract_key_points, truncate_chars};
use super::prompt::{
    build_chunk_prompt, build_consolidation_prompt, build_summary_prompt, parse_summary_response,
    ParsedSummary,
};

/// Extra map passes allowed when chunk summaries alone exceed the chunk budget
const MAX_REDUCE_PASSES: usize = 2;

/// Summarizer over an injected fast-tier completion client
pub struct Summarizer {
    client: Arc<dyn CompletionProvider>,
    config: SummarizationConfig,
    chunker: TextChunker,
}

impl Summarizer {
    /// Create a summarizer
    ///
    /// `client` should already apply the retry policy.
    pub fn new(client: Arc<dyn CompletionProvider>, config: SummarizationConfig) -> Self {
        let chunker = TextChunker::new(config.chunk_threshold);
        Self {
            client,
            config,
            chunker,
        }
    }

    pub fn config(&self) -> &SummarizationConfig {
        &self.config
    }

    /// Summarize `text` for the given target type
    ///
    /// `label` names the source in prompts and logs.
    pub async fn summarize(&self, text: &str, label: &str, target: ProjectType) -> DocumentSummary {
        let original_length = text.chars().count();

        if original_length <= self.config.small_threshold {
            tracing::debug!("Passthrough summary for {} ({} chars)", label, original_length);
            return DocumentSummary::new(
                original_length,
                text.to_string(),
                extract_key_points(text),
                extract_fields(text),
                target,
                SummaryMethod::Passthrough,
            );
        }

        if original_length <= self.config.chunk_threshold {
            self.summarize_single(text, label, target, original_length).await
        } else {
            self.summarize_chunked(text, label, target, original_length).await
        }
    }

    async fn summarize_single(
        &self,
        text: &str,
        label: &str,
        target: ProjectType,
        original_length: usize,
    ) -> DocumentSummary {
        tracing::info!("Summarizing {} ({} chars) in one call", label, original_length);

        let prompt = build_summary_prompt(text, label, target, self.config.max_summary_chars);
        match self.call(prompt, self.config.summary_max_tokens).await {
            Ok(response) => self
                .from_response(&response, text, original_length, target, SummaryMethod::SingleCall)
                .unwrap_or_else(|| {
                    tracing::warn!("Empty summary response for {}, using local extraction", label);
                    self.local_summary(text, original_length, target)
                }),
            Err(e) => {
                tracing::warn!("Summary call failed for {}: {}. Using local extraction", label, e);
                self.local_summary(text, original_length, target)
            }
        }
    }

    async fn summarize_chunked(
        &self,
        text: &str,
        label: &str,
        target: ProjectType,
        original_length: usize,
    ) -> DocumentSummary {
        let chunks = self.chunker.split(text);
        let chunk_count = chunks.len();
        tracing::info!(
            "Summarizing {} ({} chars) as {} chunks",
            label,
            original_length,
            chunk_count
        );

        let mut combined = self.map_chunks(&chunks, label).await;

        // Chunk summaries of very large inputs can themselves exceed the budget
        let mut passes = 0;
        while combined.chars().count() > self.config.chunk_threshold && passes < MAX_REDUCE_PASSES {
            passes += 1;
            let parts = self.chunker.split(&combined);
            tracing::debug!("Reduce pass {} for {} over {} parts", passes, label, parts.len());
            combined = self.map_chunks(&parts, label).await;
        }
        let combined = truncate_chars(&combined, self.config.chunk_threshold).to_string();

        let prompt = build_consolidation_prompt(
            &combined,
            label,
            target,
            chunk_count,
            self.config.max_summary_chars,
        );

        let consolidated = match self.call(prompt, self.config.summary_max_tokens).await {
            Ok(response) => self.from_response(
                &response,
                &combined,
                original_length,
                target,
                SummaryMethod::MapReduce,
            ),
            Err(e) => {
                tracing::warn!(
                    "Consolidation failed for {}: {}. Using concatenated chunk summaries",
                    label,
                    e
                );
                None
            }
        };

        consolidated
            .unwrap_or_else(|| self.local_summary(&combined, original_length, target))
            .with_chunk_count(chunk_count)
    }

    /// Summarize chunks in order, with bounded concurrency
    async fn map_chunks(&self, chunks: &[String], label: &str) -> String {
        let total = chunks.len();
        let concurrency = self.config.max_concurrent_calls.max(1);

        let summaries: Vec<String> = stream::iter(chunks.iter().enumerate())
            .map(|(index, chunk)| self.summarize_chunk(chunk, label, index, total))
            .buffered(concurrency)
            .collect()
            .await;

        summaries
            .iter()
            .enumerate()
            .map(|(i, summary)| format!("[Part {}/{}]\n{}", i + 1, total, summary))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn summarize_chunk(&self, chunk: &str, label: &str, index: usize, total: usize) -> String {
        let cap = self.config.max_chunk_summary_chars;
        let prompt = build_chunk_prompt(chunk, label, index, total, cap);

        match self.call(prompt, self.config.chunk_max_tokens).await {
            Ok(summary) if !summary.trim().is_empty() => {
                truncate_chars(summary.trim(), cap).to_string()
            }
            Ok(_) => {
                tracing::warn!("Empty summary for chunk {}/{} of {}", index + 1, total, label);
                truncate_chars(chunk.trim(), cap).to_string()
            }
            Err(e) => {
                tracing::warn!(
                    "Chunk {}/{} of {} failed: {}. Using truncated text",
                    index + 1,
                    total,
                    label,
                    e
                );
                truncate_chars(chunk.trim(), cap).to_string()
            }
        }
    }

    async fn call(&self, prompt: String, max_tokens: u32) -> Result<String> {
        let request = CompletionRequest::new(
            prompt,
            max_tokens,
            self.config.temperature,
            ModelTier::Fast,
        );
        self.client.complete(&request).await
    }

    /// Build a summary from a labeled response; `None` if it has no usable text
    ///
    /// An unlabeled response is used whole as the summary text. A labeled
    /// response without a meaningful SUMMARY is unusable. Fields the model
    /// left empty are filled by local extraction over `source_text`.
    fn from_response(
        &self,
        response: &str,
        source_text: &str,
        original_length: usize,
        target: ProjectType,
        method: SummaryMethod,
    ) -> Option<DocumentSummary> {
        let (text, parsed) = match parse_summary_response(response) {
            Some(mut parsed) => match parsed.summary.take() {
                Some(text) => (text, parsed),
                None => {
                    tracing::warn!("Labeled summary response has no SUMMARY text");
                    return None;
                }
            },
            None => {
                tracing::debug!("Summary response had no labels, using it verbatim");
                (response.trim().to_string(), ParsedSummary::default())
            }
        };
        let full_summary = truncate_chars(text.trim(), self.config.max_summary_chars)
            .trim_end()
            .to_string();
        if full_summary.is_empty() {
            return None;
        }

        let mut fields = parsed.fields;
        fields.merge_missing(extract_fields(source_text));

        let key_points = if parsed.key_points.is_empty() {
            extract_key_points(source_text)
        } else {
            parsed.key_points
        };

        Some(DocumentSummary::new(
            original_length,
            full_summary,
            key_points,
            fields,
            target,
            method,
        ))
    }

    /// Offline summary truncated to the summary cap
    fn local_summary(&self, text: &str, original_length: usize, target: ProjectType) -> DocumentSummary {
        let full_summary = truncate_chars(text.trim(), self.config.max_summary_chars)
            .trim_end()
            .to_string();
        DocumentSummary::new(
            original_length,
            full_summary,
            extract_key_points(text),
            extract_fields(text),
            target,
            SummaryMethod::LocalFallback,
        )
    }
}
