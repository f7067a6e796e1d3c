//! End-to-end pipeline: context in, validated sections out

use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::generation::{ContextAggregator, GeneratedSections, GenerationEngine, GenerationReport};
use crate::progress::ProgressTracker;
use crate::providers::{build_provider, CompletionProvider};
use crate::summarization::Summarizer;
use crate::types::{GenerationContext, SummaryUpdate};

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    /// Section key -> validated text
    pub sections: GeneratedSections,
    /// Fresh summaries for the caller to persist
    pub summary_updates: Vec<SummaryUpdate>,
    pub report: GenerationReport,
}

/// Summarize, aggregate, generate and validate
pub struct ProposalPipeline {
    aggregator: ContextAggregator,
    engine: GenerationEngine,
}

impl ProposalPipeline {
    /// Build a pipeline over injected clients
    ///
    /// `fast` serves summarization and `strong` the final generation call.
    /// Both should already apply the retry policy.
    pub fn new(
        config: PipelineConfig,
        fast: Arc<dyn CompletionProvider>,
        strong: Arc<dyn CompletionProvider>,
    ) -> Result<Self> {
        config.validate_limits()?;

        let summarizer = Summarizer::new(fast, config.summarization);
        let aggregator = ContextAggregator::new(
            summarizer,
            config.context,
            config.generation.redaction_sentinel.clone(),
        );
        let engine = GenerationEngine::new(strong, config.generation);

        Ok(Self { aggregator, engine })
    }

    /// Build the configured provider and use it for both tiers
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let provider = build_provider(&config.llm, &config.retry)?;
        Self::new(config, provider.clone(), provider)
    }

    /// Run one generation request
    ///
    /// Only configuration problems are errors; remote failures degrade to
    /// local summaries and fallback sections.
    pub async fn run(
        &self,
        context: &GenerationContext,
        progress: Option<ProgressTracker>,
    ) -> Result<PipelineOutput> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "generation_run",
            %run_id,
            project = %context.project_name,
            project_type = context.project_type.display_name()
        );

        async move {
            let progress = progress.as_ref();
            if let Some(p) = progress {
                p.building_prompt();
            }

            let assembled = self.aggregator.build_prompt(context, progress).await;
            let outcome = self.engine.generate_with_report(&assembled, progress).await;

            if let Some(p) = progress {
                p.complete();
            }
            tracing::info!("Run complete: {} section(s)", outcome.sections.len());

            Ok(PipelineOutput {
                run_id,
                sections: outcome.sections,
                summary_updates: assembled.summary_updates,
                report: outcome.report,
            })
        }
        .instrument(span)
        .await
    }
}
