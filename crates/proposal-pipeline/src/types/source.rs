//! Source material fed into a generation call
//!
//! Each source kind carries only what the pipeline reads: an identifier,
//! raw content and an optional cached summary. The persistence layer adapts
//! its rows into these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::ProjectType;
use super::summary::DocumentSummary;

/// Citation label used for the company profile
pub const COMPANY_PROFILE_SOURCE: &str = "Company Profile";

/// An uploaded project document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    /// Original filename (used verbatim in citations)
    pub filename: String,
    /// Extracted text
    pub content: String,
    /// Previously computed summary, if persisted
    #[serde(default)]
    pub cached_summary: Option<DocumentSummary>,
}

impl DocumentSource {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            cached_summary: None,
        }
    }

    pub fn citation_label(&self) -> String {
        self.filename.clone()
    }
}

/// A scraped web page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSource {
    pub title: String,
    pub url: String,
    /// Scraped page text
    #[serde(default)]
    pub content: String,
    /// Search-result snippet used when the page body is empty
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub cached_summary: Option<DocumentSummary>,
}

impl WebSource {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            snippet: None,
            cached_summary: None,
        }
    }

    /// `title (url)`
    pub fn citation_label(&self) -> String {
        format!("{} ({})", self.title, self.url)
    }
}

/// Knowledge-base categories, in prompt order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeCategory {
    WonProposals,
    ScopesOfWork,
    CaseStudies,
    PastPerformance,
    Certifications,
    TeamBios,
}

impl KnowledgeCategory {
    /// All categories in the order they appear in prompts
    pub const ALL: [KnowledgeCategory; 6] = [
        Self::WonProposals,
        Self::ScopesOfWork,
        Self::CaseStudies,
        Self::PastPerformance,
        Self::Certifications,
        Self::TeamBios,
    ];

    /// Display name, also used inside citation labels
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::WonProposals => "Won Proposals",
            Self::ScopesOfWork => "Scopes of Work",
            Self::CaseStudies => "Case Studies",
            Self::PastPerformance => "Past Performance",
            Self::Certifications => "Certifications",
            Self::TeamBios => "Team Bios",
        }
    }

    /// Maximum entries of this category placed in a prompt
    pub fn max_items(&self) -> usize {
        match self {
            Self::WonProposals => 3,
            Self::ScopesOfWork => 2,
            Self::CaseStudies => 2,
            Self::PastPerformance => 2,
            Self::Certifications => 3,
            Self::TeamBios => 2,
        }
    }
}

/// A file from the company knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub filename: String,
    pub content: String,
    #[serde(default)]
    pub cached_summary: Option<DocumentSummary>,
}

impl KnowledgeEntry {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            cached_summary: None,
        }
    }

    /// `filename (Knowledge Base: category)`
    pub fn citation_label(&self, category: KnowledgeCategory) -> String {
        format!(
            "{} (Knowledge Base: {})",
            self.filename,
            category.display_name()
        )
    }
}

/// Address of a source, used to hand fresh summaries back for persistence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    Document { filename: String },
    Web { url: String },
    KnowledgeBase { category: KnowledgeCategory, filename: String },
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document { filename } => write!(f, "document:{}", filename),
            Self::Web { url } => write!(f, "web:{}", url),
            Self::KnowledgeBase { category, filename } => {
                write!(f, "kb:{}:{}", category.display_name(), filename)
            }
        }
    }
}

/// A summary computed during this call that the caller should persist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryUpdate {
    pub source: SourceRef,
    pub target: ProjectType,
    pub summary: DocumentSummary,
    pub generated_at: DateTime<Utc>,
}
