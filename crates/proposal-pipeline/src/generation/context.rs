//! Context aggregation: sources in, closed-world prompt out
//!
//! Every source resolves to one prompt block. Cached summaries for the same
//! target type are reused as-is; large sources go through the summarizer and
//! the fresh summary is returned to the caller for persistence.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ContextConfig;
use crate::progress::ProgressTracker;
use crate::summarization::Summarizer;
use crate::types::{
    DocumentSummary, GenerationContext, KnowledgeCategory, ProjectType, SourceRef, SummaryUpdate,
};

use super::citation::ValidSourceRegistry;
use super::fallback::FallbackFacts;
use super::prompt::{Brief, PromptBuilder, PromptMaterial, SourceBlock};

/// Everything the engine needs for one generation call
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub prompt: String,
    /// Citations the prompt lists and the validator enforces
    pub registry: ValidSourceRegistry,
    /// Expected section keys, in document order
    pub sections: Vec<String>,
    pub fallback_facts: FallbackFacts,
    /// Summaries computed during this call, for the caller to persist
    pub summary_updates: Vec<SummaryUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Document,
    Web,
    Knowledge(KnowledgeCategory),
}

enum Action<'a> {
    /// Body known without a remote call
    Ready(String),
    /// Run through the summarizer
    Summarize(&'a str),
}

struct Job<'a> {
    group: Group,
    source: SourceRef,
    citation: String,
    action: Action<'a>,
}

/// Builds the generation prompt and its source registry
pub struct ContextAggregator {
    summarizer: Summarizer,
    config: ContextConfig,
    redaction_sentinel: String,
}

impl ContextAggregator {
    pub fn new(summarizer: Summarizer, config: ContextConfig, redaction_sentinel: impl Into<String>) -> Self {
        Self {
            summarizer,
            config,
            redaction_sentinel: redaction_sentinel.into(),
        }
    }

    /// Assemble the prompt for `context`
    ///
    /// Never fails: summarization degrades locally. Prompt order follows
    /// input order regardless of summarization concurrency.
    pub async fn build_prompt(
        &self,
        context: &GenerationContext,
        progress: Option<&ProgressTracker>,
    ) -> AssembledPrompt {
        let target = context.project_type;
        let jobs = self.plan(context);
        let total = jobs
            .iter()
            .filter(|job| matches!(job.action, Action::Summarize(_)))
            .count();

        tracing::info!(
            "Assembling {} prompt from {} source(s), {} to summarize",
            target.display_name(),
            jobs.len(),
            total
        );
        if total > 0 {
            if let Some(p) = progress {
                p.summarizing_sources(0, total);
            }
        }

        let done = AtomicUsize::new(0);
        let concurrency = self.summarizer.config().max_concurrent_calls.max(1);
        let resolved: Vec<(String, Option<SummaryUpdate>)> = stream::iter(jobs.iter())
            .map(|job| {
                let done = &done;
                async move {
                    match &job.action {
                        Action::Ready(body) => (body.clone(), None),
                        Action::Summarize(text) => {
                            let summary = self.summarizer.summarize(text, &job.citation, target).await;
                            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                            if let Some(p) = progress {
                                p.summarizing_sources(finished, total);
                            }
                            (summary.render(), Some(update(job.source.clone(), target, summary)))
                        }
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut material = PromptMaterial {
            company_profile: context.company_profile.as_ref(),
            prior_questions: cap(&context.prior_questions, self.config.max_prior_questions),
            chat_responses: cap(&context.chat_responses, self.config.max_chat_responses),
            ..Default::default()
        };
        let mut summary_updates = Vec::new();

        for (job, (body, fresh)) in jobs.into_iter().zip(resolved) {
            let block = SourceBlock::new(job.citation, body);
            match job.group {
                Group::Document => material.documents.push(block),
                Group::Web => material.web_sources.push(block),
                Group::Knowledge(category) => match material.knowledge.last_mut() {
                    Some((current, blocks)) if *current == category => blocks.push(block),
                    _ => material.knowledge.push((category, vec![block])),
                },
            }
            summary_updates.extend(fresh);
        }

        let registry = ValidSourceRegistry::from_context(context);
        let brief = Brief {
            project_type: target,
            project_name: &context.project_name,
            organization_name: &context.organization_name,
            company_name: context.company_name(),
            target_length_pages: context.target_length_pages,
            redaction_sentinel: &self.redaction_sentinel,
        };
        let prompt = PromptBuilder::build(&brief, &material, &registry);

        tracing::debug!(
            "Prompt assembled: {} chars, {} valid source(s), {} new summaries",
            prompt.chars().count(),
            registry.len(),
            summary_updates.len()
        );

        AssembledPrompt {
            prompt,
            registry,
            sections: target.section_keys(),
            fallback_facts: FallbackFacts::from_context(context),
            summary_updates,
        }
    }

    /// Decide, in prompt order, how each source gets its body
    fn plan<'a>(&self, context: &'a GenerationContext) -> Vec<Job<'a>> {
        let target = context.project_type;
        let mut jobs = Vec::new();

        for doc in &context.documents {
            let action = match reusable(doc.cached_summary.as_ref(), target) {
                Some(body) => Action::Ready(body),
                None if doc.content.trim().is_empty() => {
                    Action::Ready("(no text could be extracted from this document)".to_string())
                }
                None => Action::Summarize(&doc.content),
            };
            jobs.push(Job {
                group: Group::Document,
                source: SourceRef::Document {
                    filename: doc.filename.clone(),
                },
                citation: doc.citation_label(),
                action,
            });
        }

        for web in &context.web_sources {
            let action = match reusable(web.cached_summary.as_ref(), target) {
                Some(body) => Action::Ready(body),
                None if web.content.trim().is_empty() => Action::Ready(
                    web.snippet
                        .as_deref()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .unwrap_or("(no page content retrieved)")
                        .to_string(),
                ),
                None if web.content.chars().count() > self.config.web_summary_threshold => {
                    Action::Summarize(&web.content)
                }
                None => Action::Ready(web.content.clone()),
            };
            jobs.push(Job {
                group: Group::Web,
                source: SourceRef::Web {
                    url: web.url.clone(),
                },
                citation: web.citation_label(),
                action,
            });
        }

        for (category, entries) in &context.knowledge_base {
            for entry in entries.iter().take(category.max_items()) {
                let action = match reusable(entry.cached_summary.as_ref(), target) {
                    Some(body) => Action::Ready(body),
                    None if entry.content.trim().is_empty() => {
                        Action::Ready("(empty file)".to_string())
                    }
                    None if entry.content.chars().count()
                        > self.config.knowledge_summary_threshold =>
                    {
                        Action::Summarize(&entry.content)
                    }
                    None => Action::Ready(entry.content.clone()),
                };
                jobs.push(Job {
                    group: Group::Knowledge(*category),
                    source: SourceRef::KnowledgeBase {
                        category: *category,
                        filename: entry.filename.clone(),
                    },
                    citation: entry.citation_label(*category),
                    action,
                });
            }
            if entries.len() > category.max_items() {
                tracing::debug!(
                    "Knowledge base '{}' capped at {} of {} entries",
                    category.display_name(),
                    category.max_items(),
                    entries.len()
                );
            }
        }

        jobs
    }
}

/// Cached summary body, when it was written for this target type
fn reusable(cached: Option<&DocumentSummary>, target: ProjectType) -> Option<String> {
    cached.filter(|s| s.target == target).map(DocumentSummary::render)
}

fn cap<T>(items: &[T], max: usize) -> &[T] {
    &items[..items.len().min(max)]
}

fn update(source: SourceRef, target: ProjectType, summary: DocumentSummary) -> SummaryUpdate {
    SummaryUpdate {
        source,
        target,
        summary,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummarizationConfig;
    use crate::testing::ScriptedProvider;
    use crate::types::{
        CompanyProfile, DocumentSource, ExtractedFields, KnowledgeEntry, PriorQuestion,
        SummaryMethod, WebSource,
    };
    use std::sync::Arc;

    const LLM_SUMMARY: &str = "SUMMARY: condensed by model\nSCOPE: Not specified";

    fn aggregator(provider: Arc<ScriptedProvider>, concurrency: usize) -> ContextAggregator {
        let config = SummarizationConfig {
            max_concurrent_calls: concurrency,
            ..Default::default()
        };
        ContextAggregator::new(
            Summarizer::new(provider, config),
            ContextConfig::default(),
            "[REDACTED]",
        )
    }

    fn cached(target: ProjectType, text: &str) -> DocumentSummary {
        DocumentSummary::new(
            10_000,
            text.to_string(),
            Vec::new(),
            ExtractedFields::default(),
            target,
            SummaryMethod::SingleCall,
        )
    }

    fn context() -> GenerationContext {
        let mut context = GenerationContext::new(ProjectType::Rfp, "Bridges", "City");
        context.documents.push(DocumentSource::new("small.pdf", "Inspect 42 bridges."));
        context.documents.push(DocumentSource::new("large.pdf", "x".repeat(5_000)));
        context
    }

    #[tokio::test]
    async fn test_small_sources_need_no_calls() {
        let provider = Arc::new(ScriptedProvider::constant(LLM_SUMMARY));
        let mut context = GenerationContext::new(ProjectType::Rfi, "P", "O");
        context.documents.push(DocumentSource::new("brief.txt", "Short brief."));
        let mut web = WebSource::new("News", "https://x.gov", "");
        web.snippet = Some("Snippet text".to_string());
        context.web_sources.push(web);

        let assembled = aggregator(provider.clone(), 1).build_prompt(&context, None).await;

        assert_eq!(provider.calls(), 0);
        assert!(assembled.prompt.contains("[Source: brief.txt]\nShort brief."));
        assert!(assembled.prompt.contains("[Source: News (https://x.gov)]\nSnippet text"));
        assert_eq!(assembled.sections, ProjectType::Rfi.section_keys());
        // passthrough summaries are still handed back
        assert_eq!(assembled.summary_updates.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_reused_only_for_same_target() {
        let provider = Arc::new(ScriptedProvider::constant(LLM_SUMMARY));
        let mut context = context();
        context.documents[1].cached_summary = Some(cached(ProjectType::Rfp, "cached rfp summary"));

        let assembled = aggregator(provider.clone(), 1).build_prompt(&context, None).await;
        assert_eq!(provider.calls(), 0);
        assert!(assembled.prompt.contains("cached rfp summary"));
        assert!(assembled
            .summary_updates
            .iter()
            .all(|u| u.source != SourceRef::Document { filename: "large.pdf".to_string() }));

        context.documents[1].cached_summary = Some(cached(ProjectType::Rfi, "cached rfi summary"));
        let assembled = aggregator(provider.clone(), 1).build_prompt(&context, None).await;
        assert_eq!(provider.calls(), 1);
        assert!(!assembled.prompt.contains("cached rfi summary"));
        assert!(assembled.prompt.contains("condensed by model"));

        let fresh = assembled
            .summary_updates
            .iter()
            .find(|u| u.source == SourceRef::Document { filename: "large.pdf".to_string() })
            .unwrap();
        assert_eq!(fresh.target, ProjectType::Rfp);
        assert_eq!(fresh.summary.method, SummaryMethod::SingleCall);
    }

    #[tokio::test]
    async fn test_web_threshold_and_kb_caps() {
        let provider = Arc::new(ScriptedProvider::constant(LLM_SUMMARY));
        let mut context = GenerationContext::new(ProjectType::Rfp, "P", "O");
        context
            .web_sources
            .push(WebSource::new("Short", "https://a.org", "inline me"));
        context
            .web_sources
            .push(WebSource::new("Long", "https://b.org", "y".repeat(3_500)));
        context.knowledge_base.insert(
            KnowledgeCategory::CaseStudies,
            (1..=4)
                .map(|i| KnowledgeEntry::new(format!("case-{}.docx", i), "case text"))
                .collect(),
        );

        let assembled = aggregator(provider.clone(), 1).build_prompt(&context, None).await;

        assert_eq!(provider.calls(), 1);
        assert!(assembled.prompt.contains("[Source: Short (https://a.org)]\ninline me"));
        assert!(assembled.prompt.contains("case-2.docx (Knowledge Base: Case Studies)"));
        assert!(!assembled.prompt.contains("case-3.docx"));
        assert!(!assembled.registry.contains("case-3.docx (Knowledge Base: Case Studies)"));
    }

    #[tokio::test]
    async fn test_order_is_stable_under_concurrency() {
        let provider = Arc::new(ScriptedProvider::new(|request, _| {
            let tag = if request.prompt.contains("first.pdf") { "FIRST" } else { "SECOND" };
            Ok(format!("SUMMARY: {} summary", tag))
        }));
        let mut context = GenerationContext::new(ProjectType::Rfp, "P", "O");
        context.documents.push(DocumentSource::new("first.pdf", "a".repeat(3_000)));
        context.documents.push(DocumentSource::new("second.pdf", "b".repeat(3_000)));

        let assembled = aggregator(provider, 4).build_prompt(&context, None).await;

        let first = assembled.prompt.find("FIRST summary").unwrap();
        let second = assembled.prompt.find("SECOND summary").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_registry_and_prompt_agree() {
        let provider = Arc::new(ScriptedProvider::constant(LLM_SUMMARY));
        let mut context = context();
        context.company_profile = Some(CompanyProfile {
            company_name: "Acme".to_string(),
            ..Default::default()
        });
        context.prior_questions = (0..15)
            .map(|i| PriorQuestion {
                question: format!("Question {}?", i),
                answer: "Yes".to_string(),
            })
            .collect();

        let assembled = aggregator(provider, 1).build_prompt(&context, None).await;

        for entry in assembled.registry.iter() {
            assert!(assembled.prompt.contains(&format!("- {}", entry)));
        }
        assert!(assembled.registry.contains("Company Profile"));
        assert!(assembled.prompt.contains("Question 9?"));
        assert!(!assembled.prompt.contains("Question 10?"));
        assert_eq!(assembled.fallback_facts.company_name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_progress_reports_summaries() {
        let provider = Arc::new(ScriptedProvider::constant(LLM_SUMMARY));
        let (tracker, mut rx) = ProgressTracker::channel(16);

        aggregator(provider, 1)
            .build_prompt(&context(), Some(&tracker))
            .await;

        let mut stages = Vec::new();
        while let Ok(update) = rx.try_recv() {
            stages.push(update.stage);
        }
        assert_eq!(
            stages.last(),
            Some(&crate::progress::ProgressStage::SummarizingSources { done: 2, total: 2 })
        );
    }
}
