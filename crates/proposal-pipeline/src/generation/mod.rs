//! Prompt assembly, generation and citation enforcement

pub mod citation;
pub mod context;
pub mod engine;
pub mod fallback;
pub mod prompt;
pub mod sections;

pub use citation::{validate, validate_with_report, CitationReport, ValidSourceRegistry};
pub use context::{AssembledPrompt, ContextAggregator};
pub use engine::{GenerationEngine, GenerationOutcome, GenerationReport};
pub use fallback::{fallback_sections, FallbackFacts};
pub use prompt::PromptBuilder;
pub use sections::{parse_labeled_sections, GeneratedSections};
