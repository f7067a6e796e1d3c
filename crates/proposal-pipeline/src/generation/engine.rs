//! Final generation call and post-processing
//!
//! The raw response is parsed into labeled sections, inline redaction
//! sentinels are stripped and citations validated per section. Sections left
//! empty are backfilled from the fallback template; when nothing usable
//! remains the whole fallback set replaces the model output.

use serde::Serialize;
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::progress::ProgressTracker;
use crate::providers::{CompletionProvider, CompletionRequest, ModelTier};

use super::citation::{tidy_whitespace, validate_with_report, CitationReport};
use super::context::AssembledPrompt;
use super::fallback::{fallback_section, fallback_sections};
use super::sections::{parse_labeled_sections, GeneratedSections, UNLABELED_SECTION_KEY};

/// What happened to one generation call's output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Every section came from the fallback template
    pub used_fallback: bool,
    /// Keys filled from the fallback template individually
    pub backfilled: Vec<String>,
    pub citations_removed: usize,
    pub citations_kept: usize,
    /// Labels of removed citations
    pub removed_labels: Vec<String>,
}

/// Sections plus report
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub sections: GeneratedSections,
    pub report: GenerationReport,
}

/// Calls the strong model and enforces the citation contract
pub struct GenerationEngine {
    client: Arc<dyn CompletionProvider>,
    config: GenerationConfig,
}

impl GenerationEngine {
    pub fn new(client: Arc<dyn CompletionProvider>, config: GenerationConfig) -> Self {
        Self { client, config }
    }

    /// Generate the final sections for an assembled prompt
    pub async fn generate(&self, prompt: &AssembledPrompt) -> GeneratedSections {
        self.generate_with_report(prompt, None).await.sections
    }

    pub async fn generate_with_report(
        &self,
        prompt: &AssembledPrompt,
        progress: Option<&ProgressTracker>,
    ) -> GenerationOutcome {
        if let Some(p) = progress {
            p.generating();
        }

        let request = CompletionRequest::new(
            prompt.prompt.as_str(),
            self.config.max_tokens,
            self.config.temperature,
            ModelTier::Strong,
        );
        tracing::info!(
            "Generating {} section(s) with {} ({})",
            prompt.sections.len(),
            self.client.name(),
            self.client.model(ModelTier::Strong)
        );

        let outcome = match self.client.complete(&request).await {
            Ok(raw) => {
                if let Some(p) = progress {
                    p.validating();
                }
                self.finalize(&raw, prompt)
            }
            Err(e) => {
                tracing::warn!("Generation call failed, using fallback sections: {}", e);
                Self::total_fallback(prompt)
            }
        };

        tracing::info!(
            "Generated {} section(s): fallback={}, backfilled={}, citations kept={} removed={}",
            outcome.sections.len(),
            outcome.report.used_fallback,
            outcome.report.backfilled.len(),
            outcome.report.citations_kept,
            outcome.report.citations_removed
        );
        outcome
    }

    /// Post-process a raw model response
    pub fn finalize(&self, raw: &str, prompt: &AssembledPrompt) -> GenerationOutcome {
        let parsed = parse_labeled_sections(raw);
        let labeled = !(parsed.len() == 1 && parsed.contains_key(UNLABELED_SECTION_KEY))
            || prompt.sections.iter().any(|k| k == UNLABELED_SECTION_KEY);

        let mut citations = CitationReport::default();
        let mut usable = GeneratedSections::new();

        for (key, body) in parsed {
            let body = self.strip_sentinel(&body);
            let (body, report) = validate_with_report(&body, &prompt.registry);
            citations.merge(report);
            if body.trim().is_empty() {
                tracing::debug!("Section '{}' is empty or redacted", key);
            } else {
                usable.insert(key, body);
            }
        }

        if usable.is_empty() {
            tracing::warn!("Every section was empty or redacted, using fallback sections");
            return Self::total_fallback(prompt);
        }

        let mut backfilled = Vec::new();
        if labeled {
            for key in &prompt.sections {
                if !usable.contains_key(key) {
                    usable.insert(key.clone(), fallback_section(&prompt.fallback_facts, key));
                    backfilled.push(key.clone());
                }
            }
            if !backfilled.is_empty() {
                tracing::warn!("Backfilled {} section(s): {:?}", backfilled.len(), backfilled);
            }
        } else {
            tracing::warn!("Response had no section labels, keeping it as one section");
        }

        GenerationOutcome {
            sections: usable,
            report: GenerationReport {
                used_fallback: false,
                backfilled,
                citations_removed: citations.removed.len(),
                citations_kept: citations.kept,
                removed_labels: citations.removed,
            },
        }
    }

    /// Remove inline sentinels; a body made only of sentinels becomes empty
    fn strip_sentinel(&self, body: &str) -> String {
        let sentinel = self.config.redaction_sentinel.as_str();
        if sentinel.is_empty() || !body.contains(sentinel) {
            return body.trim().to_string();
        }
        tidy_whitespace(&body.replace(sentinel, ""))
    }

    fn total_fallback(prompt: &AssembledPrompt) -> GenerationOutcome {
        GenerationOutcome {
            sections: fallback_sections(&prompt.fallback_facts),
            report: GenerationReport {
                used_fallback: true,
                ..Default::default()
            },
        }
    }
}
