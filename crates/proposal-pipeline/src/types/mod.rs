//! Core types for the pipeline

pub mod context;
pub mod source;
pub mod summary;

pub use context::{ChatResponse, CompanyProfile, GenerationContext, PriorQuestion, ProjectType};
pub use source::{
    DocumentSource, KnowledgeCategory, KnowledgeEntry, SourceRef, SummaryUpdate, WebSource,
    COMPANY_PROFILE_SOURCE,
};
pub use summary::{DocumentSummary, ExtractedFields, SummaryMethod};
