//! proposal-pipeline: cited proposal generation from heterogeneous sources
//!
//! Summarizes arbitrarily large source documents into bounded summaries,
//! assembles a closed-world prompt from documents, web research, the company
//! profile and knowledge base, generates labeled sections with a strong
//! model, and strips every citation that does not resolve to a source the
//! request actually supplied. Remote failures degrade to local extraction
//! and deterministic fallback sections.

pub mod config;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod progress;
pub mod providers;
pub mod summarization;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use generation::{GeneratedSections, GenerationReport, ValidSourceRegistry};
pub use pipeline::{PipelineOutput, ProposalPipeline};
pub use progress::{ProgressStage, ProgressTracker, ProgressUpdate};
pub use types::{DocumentSummary, GenerationContext, ProjectType, SummaryUpdate};
