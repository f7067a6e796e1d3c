//! Document summary types

use serde::{Deserialize, Serialize};

use super::context::ProjectType;

/// How a summary was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMethod {
    /// Small input returned verbatim, no LLM call
    Passthrough,
    /// One LLM call over the whole text
    SingleCall,
    /// Per-chunk summaries consolidated by a final call
    MapReduce,
    /// LLM path failed, local pattern matching used instead
    LocalFallback,
}

/// Structured fields pulled out of a source document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub scope: Option<String>,
    pub requirements: Option<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    pub deliverables: Option<String>,
    pub technical_specs: Option<String>,
    pub evaluation_criteria: Option<String>,
}

impl ExtractedFields {
    /// True when no field was found
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Present fields with their display labels, in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Scope", &self.scope),
            ("Requirements", &self.requirements),
            ("Timeline", &self.timeline),
            ("Budget", &self.budget),
            ("Deliverables", &self.deliverables),
            ("Technical Specifications", &self.technical_specs),
            ("Evaluation Criteria", &self.evaluation_criteria),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
    }

    /// Fill fields that are still empty from another extraction
    pub fn merge_missing(&mut self, other: ExtractedFields) {
        macro_rules! fill {
            ($($field:ident),*) => {
                $(if self.$field.is_none() { self.$field = other.$field; })*
            };
        }
        fill!(
            scope,
            requirements,
            timeline,
            budget,
            deliverables,
            technical_specs,
            evaluation_criteria
        );
    }
}

/// Bounded, information-dense summary of one source for one target type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Input length in characters
    pub original_length: usize,
    /// `full_summary` length in characters
    pub summary_length: usize,
    /// Ordered key points
    pub key_points: Vec<String>,
    /// Structured fields
    pub extracted_fields: ExtractedFields,
    /// Summary text used in prompts
    pub full_summary: String,
    /// Target type the summary prompt was written for
    pub target: ProjectType,
    /// How the summary was produced
    pub method: SummaryMethod,
    /// Number of chunks for map-reduce summaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
}

impl DocumentSummary {
    /// Build a summary, deriving `summary_length` from the text
    pub fn new(
        original_length: usize,
        full_summary: String,
        key_points: Vec<String>,
        extracted_fields: ExtractedFields,
        target: ProjectType,
        method: SummaryMethod,
    ) -> Self {
        Self {
            original_length,
            summary_length: full_summary.chars().count(),
            key_points,
            extracted_fields,
            full_summary,
            target,
            method,
            chunk_count: None,
        }
    }

    pub fn with_chunk_count(mut self, chunks: usize) -> Self {
        self.chunk_count = Some(chunks);
        self
    }

    /// Render the summary as a prompt block
    pub fn render(&self) -> String {
        let mut out = self.full_summary.trim().to_string();

        if !self.extracted_fields.is_empty() {
            out.push_str("\n\nKey Details:");
            for (label, value) in self.extracted_fields.iter() {
                out.push_str(&format!("\n- {}: {}", label, value));
            }
        }

        if !self.key_points.is_empty() {
            out.push_str("\n\nKey Points:");
            for point in &self.key_points {
                out.push_str(&format!("\n- {}", point));
            }
        }

        out
    }
}
