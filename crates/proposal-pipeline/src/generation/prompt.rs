//! Generation prompt layout
//!
//! The prompt is a fixed sequence of blocks: project documents, web
//! research, company profile, knowledge base (category order), prior
//! answers, then the instruction block. Empty blocks are omitted.

use crate::types::{ChatResponse, CompanyProfile, KnowledgeCategory, PriorQuestion, ProjectType};

use super::citation::ValidSourceRegistry;

/// Words requested per target page
pub const WORDS_PER_PAGE: u32 = 500;

/// One source as it appears in the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBlock {
    /// Exact citation string for this source
    pub citation: String,
    /// Summary or inlined text
    pub body: String,
}

impl SourceBlock {
    pub fn new(citation: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            citation: citation.into(),
            body: body.into(),
        }
    }
}

/// Resolved material, already in prompt order
#[derive(Debug, Clone, Default)]
pub struct PromptMaterial<'a> {
    pub documents: Vec<SourceBlock>,
    pub web_sources: Vec<SourceBlock>,
    pub company_profile: Option<&'a CompanyProfile>,
    pub knowledge: Vec<(KnowledgeCategory, Vec<SourceBlock>)>,
    pub prior_questions: &'a [PriorQuestion],
    pub chat_responses: &'a [ChatResponse],
}

/// Header for the instruction block
#[derive(Debug, Clone)]
pub struct Brief<'a> {
    pub project_type: ProjectType,
    pub project_name: &'a str,
    pub organization_name: &'a str,
    pub company_name: Option<&'a str>,
    pub target_length_pages: u32,
    pub redaction_sentinel: &'a str,
}

/// Prompt builder for proposal generation
pub struct PromptBuilder;

impl PromptBuilder {
    /// Assemble the full generation prompt
    pub fn build(brief: &Brief<'_>, material: &PromptMaterial<'_>, registry: &ValidSourceRegistry) -> String {
        let mut blocks = Vec::new();

        if !material.documents.is_empty() {
            blocks.push(Self::source_section("PROJECT DOCUMENTS", &material.documents));
        }
        if !material.web_sources.is_empty() {
            blocks.push(Self::source_section("WEB RESEARCH", &material.web_sources));
        }
        if let Some(profile) = material.company_profile {
            blocks.push(Self::profile_section(profile));
        }
        for (category, entries) in &material.knowledge {
            if !entries.is_empty() {
                let title = format!("KNOWLEDGE BASE: {}", category.display_name().to_uppercase());
                blocks.push(Self::source_section(&title, entries));
            }
        }
        if let Some(section) = Self::prior_answers_section(material) {
            blocks.push(section);
        }
        blocks.push(Self::instructions(brief, registry));

        blocks.join("\n\n")
    }

    fn header(title: &str) -> String {
        format!("=== {} ===", title)
    }

    fn source_section(title: &str, sources: &[SourceBlock]) -> String {
        let body = sources
            .iter()
            .map(|s| format!("[Source: {}]\n{}", s.citation, s.body.trim()))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        format!("{}\n{}", Self::header(title), body)
    }

    fn profile_section(profile: &CompanyProfile) -> String {
        let lines = profile.prompt_lines();
        let body = if lines.is_empty() {
            "(profile on file, no details provided)".to_string()
        } else {
            lines.join("\n")
        };
        format!(
            "{}\n[Source: {}]\n{}",
            Self::header("COMPANY PROFILE"),
            crate::types::COMPANY_PROFILE_SOURCE,
            body
        )
    }

    fn prior_answers_section(material: &PromptMaterial<'_>) -> Option<String> {
        if material.prior_questions.is_empty() && material.chat_responses.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        for qa in material.prior_questions {
            parts.push(format!("Q: {}\nA: {}", qa.question.trim(), qa.answer.trim()));
        }
        for chat in material.chat_responses {
            parts.push(format!("Topic: {}\nAnswer: {}", chat.topic.trim(), chat.answer.trim()));
        }

        Some(format!(
            "{}\nAnswers previously provided by the company. Use them as context; they are not citable sources.\n\n{}",
            Self::header("PRIOR ANSWERS"),
            parts.join("\n\n")
        ))
    }

    fn instructions(brief: &Brief<'_>, registry: &ValidSourceRegistry) -> String {
        let kind = brief.project_type.display_name();
        let responder = brief
            .company_name
            .map(|name| format!(" on behalf of {}", name))
            .unwrap_or_default();
        let pages = brief.target_length_pages.max(1);

        let sections = brief
            .project_type
            .section_labels()
            .iter()
            .map(|label| format!("{}:", label))
            .collect::<Vec<_>>()
            .join("\n");

        let sources = if registry.is_empty() {
            "(none) Do not include any [Source: ...] citations.".to_string()
        } else {
            registry.render_list()
        };

        format!(
            r#"{header}
Write the {kind} response for "{project}" issued by {org}{responder}.

Produce exactly these sections, in this order. Start each with its label alone on its own line:
{sections}

Target length: about {pages} page(s), roughly {words} words in total.

VALID SOURCES (cite as [Source: <exact string from this list>]):
{sources}

RULES:
1. Use only facts stated in the material above.
2. Never invent metrics, percentages, dollar amounts, dates, client names, project names or references.
3. Cite only sources from the VALID SOURCES list, copying the string exactly. Never cite anything else.
4. When the material does not support a statement, leave the statement out.
5. If a section cannot be written from the material, write {sentinel} as its entire content."#,
            header = Self::header("INSTRUCTIONS"),
            kind = kind,
            project = brief.project_name,
            org = brief.organization_name,
            responder = responder,
            sections = sections,
            pages = pages,
            words = pages * WORDS_PER_PAGE,
            sources = sources,
            sentinel = brief.redaction_sentinel,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief(project_type: ProjectType) -> Brief<'static> {
        Brief {
            project_type,
            project_name: "Bridge Inspections",
            organization_name: "City of Springfield",
            company_name: Some("Acme Engineering"),
            target_length_pages: 4,
            redaction_sentinel: "[REDACTED]",
        }
    }

    #[test]
    fn test_blocks_in_fixed_order() {
        let profile = CompanyProfile {
            company_name: "Acme Engineering".to_string(),
            ..Default::default()
        };
        let prior = vec![PriorQuestion {
            question: "Insured?".to_string(),
            answer: "Yes".to_string(),
        }];
        let material = PromptMaterial {
            documents: vec![SourceBlock::new("spec.pdf", "Inspect 42 bridges")],
            web_sources: vec![SourceBlock::new("News (https://x.gov)", "Budget approved")],
            company_profile: Some(&profile),
            knowledge: vec![(
                KnowledgeCategory::WonProposals,
                vec![SourceBlock::new("won.docx (Knowledge Base: Won Proposals)", "We won")],
            )],
            prior_questions: &prior,
            chat_responses: &[],
        };
        let registry = ValidSourceRegistry::from_labels(["spec.pdf"]);
        let prompt = PromptBuilder::build(&brief(ProjectType::Rfp), &material, &registry);

        let order = [
            "=== PROJECT DOCUMENTS ===",
            "=== WEB RESEARCH ===",
            "=== COMPANY PROFILE ===",
            "=== KNOWLEDGE BASE: WON PROPOSALS ===",
            "=== PRIOR ANSWERS ===",
            "=== INSTRUCTIONS ===",
        ];
        let positions: Vec<usize> = order.iter().map(|h| prompt.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("[Source: spec.pdf]\nInspect 42 bridges"));
    }

    #[test]
    fn test_instructions_list_sections_length_and_sources() {
        let registry = ValidSourceRegistry::from_labels(["spec.pdf", "Company Profile"]);
        let prompt =
            PromptBuilder::build(&brief(ProjectType::Rfi), &PromptMaterial::default(), &registry);

        for label in ProjectType::Rfi.section_labels() {
            assert!(prompt.contains(&format!("\n{}:", label)));
        }
        assert!(prompt.contains("roughly 2000 words"));
        assert!(prompt.contains("- spec.pdf\n- Company Profile"));
        assert!(prompt.contains("on behalf of Acme Engineering"));
        assert!(prompt.contains("write [REDACTED] as its entire content"));
        assert!(!prompt.contains("PROJECT DOCUMENTS"));
    }

    #[test]
    fn test_empty_registry_forbids_citations() {
        let prompt = PromptBuilder::build(
            &brief(ProjectType::Rfp),
            &PromptMaterial::default(),
            &ValidSourceRegistry::default(),
        );
        assert!(prompt.contains("(none) Do not include any [Source: ...] citations."));
    }
}
