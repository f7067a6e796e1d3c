//! Per-request generation context

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::source::{DocumentSource, KnowledgeCategory, KnowledgeEntry, WebSource};

/// Kind of document being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Request for information response
    Rfi,
    /// Request for proposal response
    Rfp,
}

const RFI_SECTIONS: &[&str] = &[
    "EXECUTIVE_SUMMARY",
    "COMPANY_OVERVIEW",
    "RELEVANT_EXPERIENCE",
    "CAPABILITIES",
    "APPROACH",
    "QUESTIONS_AND_ANSWERS",
];

const RFP_SECTIONS: &[&str] = &[
    "EXECUTIVE_SUMMARY",
    "UNDERSTANDING_OF_REQUIREMENTS",
    "TECHNICAL_APPROACH",
    "PROJECT_TIMELINE",
    "TEAM_QUALIFICATIONS",
    "PAST_PERFORMANCE",
    "PRICING_APPROACH",
    "CONCLUSION",
];

impl ProjectType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Rfi => "RFI",
            Self::Rfp => "RFP",
        }
    }

    /// Section labels the model is asked to produce, in document order
    pub fn section_labels(&self) -> &'static [&'static str] {
        match self {
            Self::Rfi => RFI_SECTIONS,
            Self::Rfp => RFP_SECTIONS,
        }
    }

    /// Section keys (lowercased labels), in document order
    pub fn section_keys(&self) -> Vec<String> {
        self.section_labels()
            .iter()
            .map(|label| label.to_lowercase())
            .collect()
    }
}

/// Structured company profile record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub company_name: String,
    pub description: Option<String>,
    pub mission: Option<String>,
    pub capabilities: Vec<String>,
    pub certifications: Vec<String>,
    pub differentiators: Vec<String>,
    pub years_in_business: Option<u32>,
    pub employee_count: Option<u32>,
    pub headquarters: Option<String>,
    pub website: Option<String>,
}

impl CompanyProfile {
    /// Labeled profile lines for the prompt, skipping empty fields
    pub fn prompt_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if !self.company_name.trim().is_empty() {
            lines.push(format!("Company Name: {}", self.company_name.trim()));
        }
        let optional = [
            ("Description", &self.description),
            ("Mission", &self.mission),
            ("Headquarters", &self.headquarters),
            ("Website", &self.website),
        ];
        for (label, value) in optional {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                lines.push(format!("{}: {}", label, v));
            }
        }
        if let Some(years) = self.years_in_business {
            lines.push(format!("Years in Business: {}", years));
        }
        if let Some(count) = self.employee_count {
            lines.push(format!("Employees: {}", count));
        }
        let lists = [
            ("Capabilities", &self.capabilities),
            ("Certifications", &self.certifications),
            ("Differentiators", &self.differentiators),
        ];
        for (label, items) in lists {
            if !items.is_empty() {
                lines.push(format!("{}: {}", label, items.join("; ")));
            }
        }

        lines
    }
}

/// Free-text question answered earlier for this project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorQuestion {
    pub question: String,
    pub answer: String,
}

/// Answer captured from the conversational assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub topic: String,
    pub answer: String,
}

/// Everything one generation call may draw on
///
/// Built by the calling layer for a single request and dropped afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    pub project_type: ProjectType,
    pub project_name: String,
    /// Issuing organization (the prospective client)
    pub organization_name: String,
    #[serde(default)]
    pub documents: Vec<DocumentSource>,
    #[serde(default)]
    pub web_sources: Vec<WebSource>,
    #[serde(default)]
    pub company_profile: Option<CompanyProfile>,
    #[serde(default)]
    pub knowledge_base: BTreeMap<KnowledgeCategory, Vec<KnowledgeEntry>>,
    #[serde(default)]
    pub prior_questions: Vec<PriorQuestion>,
    #[serde(default)]
    pub chat_responses: Vec<ChatResponse>,
    #[serde(default = "default_target_length_pages")]
    pub target_length_pages: u32,
}

fn default_target_length_pages() -> u32 {
    5
}

impl GenerationContext {
    /// Empty context for a project
    pub fn new(
        project_type: ProjectType,
        project_name: impl Into<String>,
        organization_name: impl Into<String>,
    ) -> Self {
        Self {
            project_type,
            project_name: project_name.into(),
            organization_name: organization_name.into(),
            documents: Vec::new(),
            web_sources: Vec::new(),
            company_profile: None,
            knowledge_base: BTreeMap::new(),
            prior_questions: Vec::new(),
            chat_responses: Vec::new(),
            target_length_pages: default_target_length_pages(),
        }
    }

    /// Company name from the profile, if any
    pub fn company_name(&self) -> Option<&str> {
        self.company_profile
            .as_ref()
            .map(|p| p.company_name.trim())
            .filter(|name| !name.is_empty())
    }

    /// Knowledge-base categories that have at least one entry, in prompt order
    pub fn knowledge_categories(&self) -> Vec<KnowledgeCategory> {
        self.knowledge_base
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(category, _)| *category)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_keys_are_lowercased_labels() {
        let keys = ProjectType::Rfp.section_keys();
        assert_eq!(keys.first().map(String::as_str), Some("executive_summary"));
        assert_eq!(keys.len(), RFP_SECTIONS.len());
        assert!(ProjectType::Rfi
            .section_keys()
            .contains(&"questions_and_answers".to_string()));
    }

    #[test]
    fn test_profile_lines_skip_empty_fields() {
        let profile = CompanyProfile {
            company_name: "Acme Engineering".to_string(),
            description: Some("  ".to_string()),
            certifications: vec!["ISO 9001".to_string(), "SOC 2".to_string()],
            years_in_business: Some(12),
            ..Default::default()
        };
        let lines = profile.prompt_lines();

        assert_eq!(lines[0], "Company Name: Acme Engineering");
        assert!(lines.contains(&"Certifications: ISO 9001; SOC 2".to_string()));
        assert!(lines.contains(&"Years in Business: 12".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Description")));
    }

    #[test]
    fn test_context_from_json() {
        let context: GenerationContext = serde_json::from_str(
            r#"{
                "project_type": "rfp",
                "project_name": "Bridge Inspection",
                "organization_name": "City of Springfield",
                "knowledge_base": {
                    "won_proposals": [{"filename": "a.docx", "content": "text"}],
                    "team_bios": []
                }
            }"#,
        )
        .unwrap();

        assert_eq!(context.project_type, ProjectType::Rfp);
        assert_eq!(context.target_length_pages, 5);
        assert_eq!(
            context.knowledge_categories(),
            vec![KnowledgeCategory::WonProposals]
        );
        assert_eq!(context.company_name(), None);
    }
}
