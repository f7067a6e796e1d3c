//! Labeled-section parsing of model output
//!
//! The model is asked to answer as a sequence of `UPPER_SNAKE_LABEL:` lines,
//! each followed by that section's body. Parsing is a single pass:
//! - a label line opens a section keyed by the lowercased label, and any text
//!   after the colon is the first body line
//! - following lines accumulate until the next label line
//! - a repeated label replaces the earlier section (last wins)
//! - a label line with no body yields an empty section
//! - text before the first label is discarded

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Section key used when the response contains no label at all
pub const UNLABELED_SECTION_KEY: &str = "content";

/// Section key -> body
pub type GeneratedSections = BTreeMap<String, String>;

fn label_regex() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        // Tolerates markdown decoration: "## LABEL:", "**LABEL:**", "**LABEL**:"
        Regex::new(r"^\s*(?:#{1,6}\s*)?\**([A-Z][A-Z0-9_]+[A-Z0-9])\**\s*:\**\s*(.*)$")
            .expect("Invalid regex")
    })
}

/// Match a label line, returning `(LABEL, inline_body)`
pub fn match_label_line(line: &str) -> Option<(&str, &str)> {
    let caps = label_regex().captures(line)?;
    let label = caps.get(1)?.as_str();
    let rest = caps.get(2).map_or("", |m| m.as_str());
    Some((label, rest.trim()))
}

/// Scan `text` for label lines accepted by `accept`
///
/// Returns `None` when no accepted label occurs. Lines that look like labels
/// but are rejected by `accept` are treated as body text.
pub fn parse_with_labels<F>(text: &str, accept: F) -> Option<GeneratedSections>
where
    F: Fn(&str) -> bool,
{
    let mut sections = GeneratedSections::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some((label, inline)) = match_label_line(line).filter(|(l, _)| accept(l)) {
            if let Some((key, body)) = current.take() {
                sections.insert(key, join_body(&body));
            }
            let mut body = Vec::new();
            if !inline.is_empty() {
                body.push(inline);
            }
            current = Some((label.to_lowercase(), body));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((key, body)) = current.take() {
        sections.insert(key, join_body(&body));
    }

    if sections.is_empty() {
        None
    } else {
        Some(sections)
    }
}

/// Parse any `UPPER_SNAKE_LABEL:` sections
///
/// A response without labels degrades to one section under
/// [`UNLABELED_SECTION_KEY`] holding the whole trimmed text.
pub fn parse_labeled_sections(text: &str) -> GeneratedSections {
    parse_with_labels(text, |_| true).unwrap_or_else(|| {
        let mut sections = GeneratedSections::new();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            sections.insert(UNLABELED_SECTION_KEY.to_string(), trimmed.to_string());
        }
        sections
    })
}

fn join_body(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sections() {
        let text = "EXECUTIVE_SUMMARY:\nWe propose a phased plan.\nIt is cheap.\n\nTECHNICAL_APPROACH: Inline start\nmore detail";
        let sections = parse_labeled_sections(text);

        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections["executive_summary"],
            "We propose a phased plan.\nIt is cheap."
        );
        assert_eq!(sections["technical_approach"], "Inline start\nmore detail");
    }

    #[test]
    fn test_missing_labels_become_single_section() {
        let sections = parse_labeled_sections("  Just prose with no labels.\nSecond line.  ");
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[UNLABELED_SECTION_KEY],
            "Just prose with no labels.\nSecond line."
        );
    }

    #[test]
    fn test_empty_response_has_no_sections() {
        assert!(parse_labeled_sections("   \n  ").is_empty());
    }

    #[test]
    fn test_repeated_label_last_wins() {
        let text = "CONCLUSION:\nfirst draft\nCONCLUSION:\nfinal text";
        let sections = parse_labeled_sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections["conclusion"], "final text");
    }

    #[test]
    fn test_label_only_line_is_empty_section() {
        let text = "PRICING_APPROACH:\nCONCLUSION:\nThanks.";
        let sections = parse_labeled_sections(text);
        assert_eq!(sections["pricing_approach"], "");
        assert_eq!(sections["conclusion"], "Thanks.");
    }

    #[test]
    fn test_preamble_before_first_label_is_dropped() {
        let text = "Sure, here is the document.\n\nEXECUTIVE_SUMMARY:\nBody";
        let sections = parse_labeled_sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections["executive_summary"], "Body");
    }

    #[test]
    fn test_markdown_decorated_labels() {
        let text = "**EXECUTIVE_SUMMARY:**\nA\n## TEAM_QUALIFICATIONS:\nB\n**PAST_PERFORMANCE**: C";
        let sections = parse_labeled_sections(text);
        assert_eq!(sections["executive_summary"], "A");
        assert_eq!(sections["team_qualifications"], "B");
        assert_eq!(sections["past_performance"], "C");
    }

    #[test]
    fn test_mixed_case_lines_are_body_text() {
        let text = "APPROACH:\nNote: this is body text\nPhase 1: discovery";
        let sections = parse_labeled_sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections["approach"],
            "Note: this is body text\nPhase 1: discovery"
        );
    }

    #[test]
    fn test_restricted_labels_keep_other_labels_as_body() {
        let text = "SUMMARY: short\nNOTE: kept in summary\nBUDGET: $10k";
        let sections =
            parse_with_labels(text, |l| matches!(l, "SUMMARY" | "BUDGET")).unwrap();
        assert_eq!(sections["summary"], "short\nNOTE: kept in summary");
        assert_eq!(sections["budget"], "$10k");
        assert!(parse_with_labels("no labels", |_| true).is_none());
    }
}
