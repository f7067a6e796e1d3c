//! Bounded summarization of arbitrarily large source documents

pub mod chunker;
pub mod local;
pub mod prompt;
mod summarizer;

pub use chunker::{split_text, TextChunker};
pub use summarizer::Summarizer;
