//! Summarization prompt templates and response parsing

use crate::generation::sections::parse_with_labels;
use crate::types::{ExtractedFields, ProjectType};

use super::local::MAX_KEY_POINTS;

/// Labels requested from the model, in template order
pub const SUMMARY_LABELS: &[&str] = &[
    "SUMMARY",
    "SCOPE",
    "REQUIREMENTS",
    "TIMELINE",
    "BUDGET",
    "DELIVERABLES",
    "TECHNICAL_SPECS",
    "EVALUATION_CRITERIA",
    "KEY_POINTS",
];

fn focus(target: ProjectType) -> &'static str {
    match target {
        ProjectType::Rfp => "Focus on mandatory requirements, scope, deliverables, evaluation criteria, submission deadlines and budget constraints that a proposal must address.",
        ProjectType::Rfi => "Focus on what information the issuer is requesting, their stated needs and challenges, the questions they ask, and any submission deadlines.",
    }
}

fn labeled_template(max_summary_chars: usize) -> String {
    format!(
        r#"Respond using exactly these labels, each starting its own line:
SUMMARY: <dense summary of at most {max} characters>
SCOPE: <scope of work, or "Not specified">
REQUIREMENTS: <requirements, or "Not specified">
TIMELINE: <dates and deadlines, or "Not specified">
BUDGET: <budget or pricing constraints, or "Not specified">
DELIVERABLES: <deliverables, or "Not specified">
TECHNICAL_SPECS: <technical specifications, or "Not specified">
EVALUATION_CRITERIA: <how responses are evaluated, or "Not specified">
KEY_POINTS:
- <key point>
- <key point>

Only use information stated in the text. Do not invent figures, dates, names or requirements."#,
        max = max_summary_chars
    )
}

/// Prompt for a single-call summary of a whole document
pub fn build_summary_prompt(
    text: &str,
    label: &str,
    target: ProjectType,
    max_summary_chars: usize,
) -> String {
    format!(
        r#"You are analyzing a source document to prepare an {kind} response.
Document: {label}

{focus}

{template}

DOCUMENT:
{text}"#,
        kind = target.display_name(),
        label = label,
        focus = focus(target),
        template = labeled_template(max_summary_chars),
        text = text
    )
}

/// Lighter prompt for one chunk of a large document
pub fn build_chunk_prompt(
    chunk: &str,
    label: &str,
    index: usize,
    total: usize,
    max_chunk_chars: usize,
) -> String {
    format!(
        r#"Summarize part {part} of {total} of the document "{label}" in at most {max} characters.
Keep concrete requirements, dates, figures, names and obligations. Use plain prose or short bullets with no preamble. Do not add information that is not in the text.

TEXT:
{chunk}"#,
        part = index + 1,
        total = total,
        label = label,
        max = max_chunk_chars,
        chunk = chunk
    )
}

/// Prompt that merges ordered chunk summaries into one labeled summary
pub fn build_consolidation_prompt(
    combined: &str,
    label: &str,
    target: ProjectType,
    chunk_count: usize,
    max_summary_chars: usize,
) -> String {
    format!(
        r#"The following are summaries of {count} consecutive parts of the document "{label}", prepared for an {kind} response.
Merge them into one summary of the whole document.

{focus}

{template}

PART SUMMARIES:
{combined}"#,
        count = chunk_count,
        label = label,
        kind = target.display_name(),
        focus = focus(target),
        template = labeled_template(max_summary_chars),
        combined = combined
    )
}

/// Parsed labeled summary response
#[derive(Debug, Default, PartialEq)]
pub struct ParsedSummary {
    pub summary: Option<String>,
    pub fields: ExtractedFields,
    pub key_points: Vec<String>,
}

fn meaningful(value: Option<&String>) -> Option<String> {
    let value = value?.trim();
    let normalized = value.trim_end_matches('.').to_lowercase();
    let empty = value.is_empty()
        || matches!(
            normalized.as_str(),
            "not specified" | "not mentioned" | "not stated" | "n/a" | "na" | "none" | "unknown"
        );
    if empty {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_key_points(block: &str) -> Vec<String> {
    block
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(MAX_KEY_POINTS)
        .collect()
}

/// Parse a response written against the labeled template
///
/// Returns `None` when none of the labels occur.
pub fn parse_summary_response(response: &str) -> Option<ParsedSummary> {
    let sections = parse_with_labels(response, |label| SUMMARY_LABELS.contains(&label))?;

    Some(ParsedSummary {
        summary: meaningful(sections.get("summary")),
        fields: ExtractedFields {
            scope: meaningful(sections.get("scope")),
            requirements: meaningful(sections.get("requirements")),
            timeline: meaningful(sections.get("timeline")),
            budget: meaningful(sections.get("budget")),
            deliverables: meaningful(sections.get("deliverables")),
            technical_specs: meaningful(sections.get("technical_specs")),
            evaluation_criteria: meaningful(sections.get("evaluation_criteria")),
        },
        key_points: sections
            .get("key_points")
            .map(|block| parse_key_points(block))
            .unwrap_or_default(),
    })
}
