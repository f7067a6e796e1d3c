//! Closed-world citation validation
//!
//! Every `[Source: <label>]` marker in generated text must resolve to an
//! entry of the [`ValidSourceRegistry`] built from the same context. Markers
//! that do not resolve are deleted.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::types::{GenerationContext, COMPANY_PROFILE_SOURCE};

/// Marker inside knowledge-base citation labels
const KB_MARKER: &str = "(Knowledge Base:";

fn citation_regex() -> &'static Regex {
    static CITATION: OnceLock<Regex> = OnceLock::new();
    CITATION.get_or_init(|| {
        // Labels may hold balanced brackets ("report[1].pdf"); an unbalanced
        // label still matches through the second branch and gets checked
        Regex::new(r"(?i)\[\s*source\s*:\s*((?:[^\[\]]|\[[^\[\]]*\])*?|[^\]]*?)\s*\]")
            .expect("Invalid regex")
    })
}

/// Exact citation strings a generation call may reference
///
/// Entries keep insertion order: documents, web sources, knowledge base
/// (category order), then the company profile sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidSourceRegistry {
    entries: Vec<String>,
    lookup: HashSet<String>,
}

impl ValidSourceRegistry {
    /// Build a registry from explicit labels
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for label in labels {
            registry.insert(label.into());
        }
        registry
    }

    /// Derive the registry deterministically from a generation context
    ///
    /// Knowledge-base entries follow the same per-category caps as the
    /// prompt, so only files the model actually saw are citable.
    pub fn from_context(context: &GenerationContext) -> Self {
        let mut registry = Self::default();

        for doc in &context.documents {
            registry.insert(doc.citation_label());
        }
        for web in &context.web_sources {
            registry.insert(web.citation_label());
        }
        for (category, entries) in &context.knowledge_base {
            for entry in entries.iter().take(category.max_items()) {
                registry.insert(entry.citation_label(*category));
            }
        }
        if context.company_profile.is_some() {
            registry.insert(COMPANY_PROFILE_SOURCE.to_string());
        }

        registry
    }

    fn insert(&mut self, label: String) {
        let label = label.trim().to_string();
        if !label.is_empty() && self.lookup.insert(label.clone()) {
            self.entries.push(label);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.lookup.contains(label)
    }

    /// Resolve a cited label to the registry entry it refers to
    ///
    /// 1. exact match
    /// 2. both are knowledge-base labels and their filenames match
    /// 3. the cited label equals an entry's pre-parenthetical part
    ///
    /// Rule 2 accepts a knowledge-base file cited under the wrong category.
    pub fn resolve(&self, cited: &str) -> Option<&str> {
        let cited = cited.trim();
        if let Some(entry) = self.lookup.get(cited) {
            return Some(entry.as_str());
        }

        if cited.contains(KB_MARKER) {
            let cited_name = strip_trailing_parenthetical(cited);
            if let Some(entry) = self
                .iter()
                .filter(|entry| entry.contains(KB_MARKER))
                .find(|entry| strip_trailing_parenthetical(entry) == cited_name)
            {
                return Some(entry);
            }
        }

        self.iter()
            .find(|entry| strip_trailing_parenthetical(entry) == cited)
    }

    /// Bulleted list for the prompt, one exact citation string per line
    pub fn render_list(&self) -> String {
        self.iter()
            .map(|entry| format!("- {}", entry))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Drop one trailing `( ... )` group, honoring nesting
pub fn strip_trailing_parenthetical(label: &str) -> &str {
    let trimmed = label.trim_end();
    if !trimmed.ends_with(')') {
        return trimmed;
    }

    let mut depth = 0i32;
    for (idx, c) in trimmed.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    let head = trimmed[..idx].trim_end();
                    return if head.is_empty() { trimmed } else { head };
                }
            }
            _ => {}
        }
    }

    trimmed
}

/// Labels of every citation marker in `text`, in order
pub fn extract_citations(text: &str) -> Vec<String> {
    citation_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

/// Outcome of validating one piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitationReport {
    /// Citations left in the text
    pub kept: usize,
    /// Labels of deleted citations, in order of removal
    pub removed: Vec<String>,
}

impl CitationReport {
    pub fn merge(&mut self, other: CitationReport) {
        self.kept += other.kept;
        self.removed.extend(other.removed);
    }
}

fn whitespace_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            (Regex::new(r"[ \t]{2,}").expect("Invalid regex"), " "),
            (Regex::new(r"[ \t]+([.,;:!?])").expect("Invalid regex"), "$1"),
            (Regex::new(r"[ \t]+\n").expect("Invalid regex"), "\n"),
        ]
    })
}

fn tidy_gap(gap: &str) -> String {
    let mut out = gap.to_string();
    for (re, replacement) in whitespace_rules() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out
}

/// Collapse horizontal whitespace, drop space before punctuation, trim lines
///
/// Citation markers are copied verbatim; only the text between them is
/// rewritten, so a valid label never changes shape.
pub(crate) fn tidy_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for marker in citation_regex().find_iter(text) {
        out.push_str(&tidy_gap(&text[last..marker.start()]));
        out.push_str(marker.as_str());
        last = marker.end();
    }
    out.push_str(&tidy_gap(&text[last..]));
    out.trim().to_string()
}

/// Single removal pass; returns the new text and removed labels
fn remove_invalid(text: &str, registry: &ValidSourceRegistry) -> (String, Vec<String>) {
    let mut removed = Vec::new();
    let cleaned = citation_regex().replace_all(text, |caps: &regex::Captures| {
        let label = caps.get(1).map_or("", |m| m.as_str());
        if registry.resolve(label).is_some() {
            caps[0].to_string()
        } else {
            removed.push(label.trim().to_string());
            String::new()
        }
    });
    (cleaned.into_owned(), removed)
}

/// Remove unresolvable citations and report what happened
///
/// Passes repeat until nothing is removed, so deleting one marker can never
/// leave a newly formed, unchecked marker behind. Horizontal whitespace is
/// tidied only when something was removed; line structure is kept.
pub fn validate_with_report(text: &str, registry: &ValidSourceRegistry) -> (String, CitationReport) {
    let mut current = text.to_string();
    let mut report = CitationReport::default();

    loop {
        let (cleaned, removed) = remove_invalid(&current, registry);
        if removed.is_empty() {
            break;
        }
        report.removed.extend(removed);
        current = tidy_whitespace(&cleaned);
    }

    report.kept = citation_regex().find_iter(&current).count();

    if !report.removed.is_empty() {
        tracing::warn!(
            "Removed {} invalid citation(s): {:?}",
            report.removed.len(),
            report.removed
        );
    }

    (current, report)
}

/// Remove unresolvable citations from `text`
pub fn validate(text: &str, registry: &ValidSourceRegistry) -> String {
    validate_with_report(text, registry).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CompanyProfile, DocumentSource, KnowledgeCategory, KnowledgeEntry, ProjectType, WebSource,
    };

    fn registry() -> ValidSourceRegistry {
        ValidSourceRegistry::from_labels([
            "spec.pdf",
            "Agency News (https://example.gov/news)",
            "bridge-2022.docx (Knowledge Base: Won Proposals)",
            COMPANY_PROFILE_SOURCE,
        ])
    }

    #[test]
    fn test_invalid_citation_removed_and_whitespace_cleaned() {
        let registry = ValidSourceRegistry::from_labels(["spec.pdf"]);
        let text = "We did X [Source: spec.pdf] and Y [Source: invented.pdf]";

        assert_eq!(validate(text, &registry), "We did X [Source: spec.pdf] and Y");
    }

    #[test]
    fn test_only_the_nonexistent_citation_is_removed() {
        let text = "A [Source: spec.pdf]. B [Source: ghost.pdf]. C [Source: Company Profile].";
        let (cleaned, report) = validate_with_report(text, &registry());

        assert_eq!(
            cleaned,
            "A [Source: spec.pdf]. B. C [Source: Company Profile]."
        );
        assert_eq!(report.removed, vec!["ghost.pdf"]);
        assert_eq!(report.kept, 2);
    }

    #[test]
    fn test_every_remaining_citation_resolves() {
        let registry = registry();
        let text = "\
Intro [Source: spec.pdf] [Source: made-up.xlsx]
Web [Source: Agency News] [Source: Agency News (https://evil.example)]
KB [Source: bridge-2022.docx (Knowledge Base: Case Studies)] [Source: other.docx (Knowledge Base: Won Proposals)]
Odd [source:spec.pdf] [Source: ] [Source: (Knowledge Base: Won Proposals)]";

        let cleaned = validate(text, &registry);
        for label in extract_citations(&cleaned) {
            assert!(registry.resolve(&label).is_some(), "unresolved: {}", label);
        }
        assert!(!cleaned.contains("made-up.xlsx"));
        assert!(!cleaned.contains("other.docx"));
        assert!(!cleaned.contains("[Source: ]"));
    }

    #[test]
    fn test_web_title_alone_resolves() {
        let registry = registry();
        assert_eq!(
            registry.resolve("Agency News"),
            Some("Agency News (https://example.gov/news)")
        );
    }

    #[test]
    fn test_kb_file_under_wrong_category_is_accepted() {
        // Known leniency: only the filename is compared for knowledge-base labels
        let registry = registry();
        let resolved = registry.resolve("bridge-2022.docx (Knowledge Base: Case Studies)");
        assert_eq!(
            resolved,
            Some("bridge-2022.docx (Knowledge Base: Won Proposals)")
        );
        assert_eq!(
            registry.resolve("bridge-2022.docx"),
            Some("bridge-2022.docx (Knowledge Base: Won Proposals)")
        );
    }

    #[test]
    fn test_irregular_spacing_in_valid_labels_survives_cleanup() {
        let registry = ValidSourceRegistry::from_labels([
            "spec.pdf",
            "Home : City Portal (https://city.gov)",
            "Agency  News (https://x.gov)",
        ]);
        let text = "A [Source: Home : City Portal (https://city.gov)] B [Source: ghost.pdf] \
                    C [Source: Agency  News (https://x.gov)] .";
        let (cleaned, report) = validate_with_report(text, &registry);

        assert_eq!(
            cleaned,
            "A [Source: Home : City Portal (https://city.gov)] B C [Source: Agency  News (https://x.gov)]."
        );
        assert_eq!(report.removed, vec!["ghost.pdf"]);
        assert_eq!(report.kept, 2);
    }

    #[test]
    fn test_bracketed_filenames_are_citable() {
        let registry = ValidSourceRegistry::from_labels(["report[1].pdf"]);
        let text = "See [Source: report[1].pdf] and [Source: report[2].pdf] here.";
        let (cleaned, report) = validate_with_report(text, &registry);

        assert_eq!(cleaned, "See [Source: report[1].pdf] and here.");
        assert_eq!(report.removed, vec!["report[2].pdf"]);
        assert_eq!(extract_citations(&cleaned), vec!["report[1].pdf"]);
    }

    #[test]
    fn test_unbalanced_label_is_still_checked() {
        let registry = ValidSourceRegistry::from_labels(["spec.pdf"]);
        let cleaned = validate("Claim [Source: a [b] end", &registry);
        assert_eq!(cleaned, "Claim end");
    }

    #[test]
    fn test_removal_cannot_assemble_a_new_marker() {
        let registry = ValidSourceRegistry::from_labels(["spec.pdf"]);
        let text = "Claim [Sou[Source: x]rce: evil.pdf] end";
        let cleaned = validate(text, &registry);

        assert!(extract_citations(&cleaned).is_empty(), "{}", cleaned);
        assert!(!cleaned.contains("evil.pdf"));
    }

    #[test]
    fn test_clean_text_is_untouched() {
        let registry = registry();
        let text = "Line one  [Source: spec.pdf]\n\n  indented line\n";
        let (cleaned, report) = validate_with_report(text, &registry);

        assert_eq!(cleaned, text);
        assert_eq!(report.kept, 1);
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_paragraphs_survive_cleanup() {
        let registry = ValidSourceRegistry::from_labels(["spec.pdf"]);
        let text = "First para [Source: nope].\n\nSecond para [Source: spec.pdf].";

        assert_eq!(
            validate(text, &registry),
            "First para.\n\nSecond para [Source: spec.pdf]."
        );
    }

    #[test]
    fn test_strip_trailing_parenthetical() {
        assert_eq!(strip_trailing_parenthetical("a.docx (Knowledge Base: X)"), "a.docx");
        assert_eq!(
            strip_trailing_parenthetical("Title (https://x.org/a_(b))"),
            "Title"
        );
        assert_eq!(strip_trailing_parenthetical("plain.pdf"), "plain.pdf");
        assert_eq!(strip_trailing_parenthetical("(only)"), "(only)");
    }

    #[test]
    fn test_registry_from_context() {
        let mut context = GenerationContext::new(ProjectType::Rfp, "Bridges", "City");
        context.documents.push(DocumentSource::new("spec.pdf", "..."));
        context
            .web_sources
            .push(WebSource::new("Agency News", "https://example.gov/news", ""));
        context.knowledge_base.insert(
            KnowledgeCategory::ScopesOfWork,
            vec![
                KnowledgeEntry::new("sow-1.docx", ""),
                KnowledgeEntry::new("sow-2.docx", ""),
                KnowledgeEntry::new("sow-3.docx", ""),
            ],
        );
        context.company_profile = Some(CompanyProfile::default());

        let registry = ValidSourceRegistry::from_context(&context);
        let entries: Vec<&str> = registry.iter().collect();

        assert_eq!(
            entries,
            vec![
                "spec.pdf",
                "Agency News (https://example.gov/news)",
                "sow-1.docx (Knowledge Base: Scopes of Work)",
                "sow-2.docx (Knowledge Base: Scopes of Work)",
                COMPANY_PROFILE_SOURCE,
            ]
        );
        assert!(!registry.contains("sow-3.docx (Knowledge Base: Scopes of Work)"));
    }

    #[test]
    fn test_no_profile_no_sentinel() {
        let context = GenerationContext::new(ProjectType::Rfi, "P", "O");
        let registry = ValidSourceRegistry::from_context(&context);
        assert!(registry.is_empty());
        assert!(registry.resolve(COMPANY_PROFILE_SOURCE).is_none());
    }
}
