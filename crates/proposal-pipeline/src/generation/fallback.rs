//! Deterministic fallback sections
//!
//! Used when model output is unusable. Text is built only from structural
//! facts of the request, so it carries no citations and needs no validation.

use serde::{Deserialize, Serialize};

use crate::types::{GenerationContext, KnowledgeCategory, ProjectType};

use super::sections::GeneratedSections;

/// Structural facts the fallback templates may use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackFacts {
    pub project_type: ProjectType,
    pub project_name: String,
    pub organization_name: String,
    pub company_name: Option<String>,
    /// Knowledge-base categories present in the request, in prompt order
    pub categories: Vec<KnowledgeCategory>,
}

impl FallbackFacts {
    pub fn from_context(context: &GenerationContext) -> Self {
        Self {
            project_type: context.project_type,
            project_name: context.project_name.trim().to_string(),
            organization_name: context.organization_name.trim().to_string(),
            company_name: context.company_name().map(str::to_string),
            categories: context.knowledge_categories(),
        }
    }

    fn company(&self) -> &str {
        self.company_name.as_deref().unwrap_or("Our firm")
    }

    fn organization(&self) -> &str {
        if self.organization_name.is_empty() {
            "the issuing organization"
        } else {
            &self.organization_name
        }
    }

    fn project(&self) -> &str {
        if self.project_name.is_empty() {
            "this project"
        } else {
            &self.project_name
        }
    }

    fn category_phrase(&self) -> Option<String> {
        let names: Vec<String> = self
            .categories
            .iter()
            .map(|c| c.display_name().to_lowercase())
            .collect();
        match names.len() {
            0 => None,
            1 => Some(names[0].clone()),
            n => Some(format!("{} and {}", names[..n - 1].join(", "), names[n - 1])),
        }
    }
}

/// Template text for one section key
///
/// Unknown keys get a generic paragraph, so the result is never empty.
pub fn fallback_section(facts: &FallbackFacts, key: &str) -> String {
    let company = facts.company();
    let org = facts.organization();
    let project = facts.project();
    let kind = facts.project_type.display_name();

    let experience = match facts.category_phrase() {
        Some(phrase) => format!(
            "Supporting material from our {} is available on request.",
            phrase
        ),
        None => "Supporting material is available on request.".to_string(),
    };

    match key {
        "executive_summary" => format!(
            "{company} is pleased to submit this {kind} response to {org} for {project}. \
             This document outlines our understanding of the engagement and how we would work \
             with {org} to deliver it."
        ),
        "company_overview" => format!(
            "{company} is a professional services firm prepared to support {org}. \
             Detailed company information will be provided on request."
        ),
        "relevant_experience" | "past_performance" => format!(
            "{company} has delivered engagements comparable to {project}. {experience}"
        ),
        "capabilities" => format!(
            "{company} offers the capabilities needed to support {org} on {project}. {experience}"
        ),
        "approach" | "technical_approach" => format!(
            "Our approach to {project} begins with a discovery phase to confirm objectives and \
             requirements with {org}, followed by planning, execution and regular progress reviews."
        ),
        "questions_and_answers" => format!(
            "{company} welcomes the opportunity to answer any questions {org} has about {project}."
        ),
        "understanding_of_requirements" => format!(
            "{company} has reviewed the requirements issued by {org} for {project} and will \
             confirm each of them during project kickoff."
        ),
        "project_timeline" => format!(
            "A detailed schedule for {project} will be agreed with {org} at kickoff, aligned \
             with the dates in the solicitation."
        ),
        "team_qualifications" => format!(
            "{company} will staff {project} with qualified professionals. {experience}"
        ),
        "pricing_approach" => format!(
            "Pricing for {project} will be provided in accordance with the submission \
             instructions from {org}."
        ),
        "conclusion" => format!(
            "{company} appreciates the opportunity to respond to {org} and looks forward to \
             discussing {project} further."
        ),
        _ => format!(
            "{company} will provide this information to {org} on request."
        ),
    }
}

/// Complete fallback set for the request's project type
pub fn fallback_sections(facts: &FallbackFacts) -> GeneratedSections {
    facts
        .project_type
        .section_keys()
        .into_iter()
        .map(|key| {
            let text = fallback_section(facts, &key);
            (key, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::citation::extract_citations;

    fn facts(project_type: ProjectType) -> FallbackFacts {
        FallbackFacts {
            project_type,
            project_name: "Bridge Inspections".to_string(),
            organization_name: "City of Springfield".to_string(),
            company_name: Some("Acme Engineering".to_string()),
            categories: vec![KnowledgeCategory::WonProposals, KnowledgeCategory::TeamBios],
        }
    }

    #[test]
    fn test_fallback_covers_every_section() {
        for project_type in [ProjectType::Rfi, ProjectType::Rfp] {
            let sections = fallback_sections(&facts(project_type));
            let keys: Vec<String> = sections.keys().cloned().collect();
            let mut expected = project_type.section_keys();
            expected.sort();

            assert_eq!(keys, expected);
            for (key, text) in &sections {
                assert!(!text.trim().is_empty(), "{} is empty", key);
                assert!(extract_citations(text).is_empty());
            }
        }
    }

    #[test]
    fn test_fallback_uses_known_facts() {
        let sections = fallback_sections(&facts(ProjectType::Rfp));
        assert!(sections["executive_summary"].contains("Acme Engineering"));
        assert!(sections["executive_summary"].contains("City of Springfield"));
        assert!(sections["team_qualifications"].contains("won proposals and team bios"));
    }

    #[test]
    fn test_missing_facts_still_produce_text() {
        let bare = FallbackFacts {
            project_type: ProjectType::Rfi,
            project_name: String::new(),
            organization_name: String::new(),
            company_name: None,
            categories: Vec::new(),
        };
        let text = fallback_section(&bare, "executive_summary");
        assert!(text.starts_with("Our firm"));
        assert!(text.contains("the issuing organization"));
        assert!(!fallback_section(&bare, "unknown_key").is_empty());
    }
}
