//! Offline extraction used for small inputs and as the LLM fallback

use regex::Regex;
use std::sync::OnceLock;

use crate::types::ExtractedFields;

/// Key points kept by local extraction
pub const MAX_KEY_POINTS: usize = 10;
/// Cap on a single key point
const MAX_KEY_POINT_CHARS: usize = 200;
/// Cap on a locally extracted field
const MAX_FIELD_CHARS: usize = 500;

/// Truncate to at most `max_chars` characters, on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn bullet_regex() -> &'static Regex {
    static BULLET: OnceLock<Regex> = OnceLock::new();
    BULLET.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*•▪◦‣]|\(?\d{1,3}[.)]|\(?[a-zA-Z][.)])\s+(.+?)\s*$")
            .expect("Invalid regex")
    })
}

/// Bullet and numbered lines, in order, deduplicated
pub fn extract_key_points(text: &str) -> Vec<String> {
    let mut points: Vec<String> = Vec::new();

    for line in text.lines() {
        let Some(caps) = bullet_regex().captures(line) else {
            continue;
        };
        let point = caps[1].trim();
        if point.chars().count() < 3 {
            continue;
        }
        let point = truncate_chars(point, MAX_KEY_POINT_CHARS).to_string();
        if !points.contains(&point) {
            points.push(point);
        }
        if points.len() >= MAX_KEY_POINTS {
            break;
        }
    }

    points
}

struct FieldPatterns {
    scope: Regex,
    requirements: Regex,
    timeline: Regex,
    budget: Regex,
    deliverables: Regex,
}

fn header_regex(keywords: &str) -> Regex {
    // A header line naming the field, optionally prefixed by numbering or a
    // few words ("3. Project Timeline:"), body runs to the next blank line
    let pattern = format!(
        r"(?ims)^[ \t#*>\d.)\-]*(?:[a-z&]+[ \t]+){{0,3}}?(?:{})\b[^\n:]{{0,40}}:\s*(.*?)(?:\n[ \t]*\n|\z)",
        keywords
    );
    Regex::new(&pattern).expect("Invalid regex")
}

fn field_patterns() -> &'static FieldPatterns {
    static PATTERNS: OnceLock<FieldPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FieldPatterns {
        scope: header_regex(r"scope of work|statement of work|scope"),
        requirements: header_regex(r"requirements"),
        timeline: header_regex(r"timeline|schedule|key dates|deadlines?|period of performance"),
        budget: header_regex(r"budget|pricing|funding"),
        deliverables: header_regex(r"deliverables"),
    })
}

fn capture_field(re: &Regex, text: &str) -> Option<String> {
    let body = re.captures(text)?.get(1)?.as_str().trim();
    if body.is_empty() {
        return None;
    }
    Some(truncate_chars(body, MAX_FIELD_CHARS).trim_end().to_string())
}

/// Pull scope/requirements/timeline/budget/deliverables from header-like lines
///
/// Technical specifications and evaluation criteria are only produced by the
/// LLM path.
pub fn extract_fields(text: &str) -> ExtractedFields {
    let p = field_patterns();
    ExtractedFields {
        scope: capture_field(&p.scope, text),
        requirements: capture_field(&p.requirements, text),
        timeline: capture_field(&p.timeline, text),
        budget: capture_field(&p.budget, text),
        deliverables: capture_field(&p.deliverables, text),
        technical_specs: None,
        evaluation_criteria: None,
    }
}
