//! Line-aligned text chunking under a character budget

/// Splits oversized text into line-respecting chunks
///
/// Chunks keep their line terminators, so concatenating them in order
/// reproduces the input exactly. Lengths are measured in characters.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Maximum characters per chunk
    max_chunk_chars: usize,
}

impl TextChunker {
    /// Create a chunker; a zero budget is treated as one character
    pub fn new(max_chunk_chars: usize) -> Self {
        Self {
            max_chunk_chars: max_chunk_chars.max(1),
        }
    }

    /// Greedily pack whole lines into chunks
    ///
    /// A line longer than the budget is hard-split on character boundaries
    /// into its own chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let budget = self.max_chunk_chars;
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for line in text.split_inclusive('\n') {
            let line_len = line.chars().count();

            if line_len > budget {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                Self::hard_split(line, budget, &mut chunks);
                continue;
            }

            if !current.is_empty() && current_len + line_len > budget {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }

            current.push_str(line);
            current_len += line_len;
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    fn hard_split(line: &str, budget: usize, chunks: &mut Vec<String>) {
        let mut piece_start = 0usize;
        let mut count = 0usize;

        for (idx, _) in line.char_indices() {
            if count == budget {
                chunks.push(line[piece_start..idx].to_string());
                piece_start = idx;
                count = 0;
            }
            count += 1;
        }

        if piece_start < line.len() {
            chunks.push(line[piece_start..].to_string());
        }
    }
}

/// Convenience wrapper around [`TextChunker::split`]
pub fn split_text(text: &str, max_chunk_chars: usize) -> Vec<String> {
    TextChunker::new(max_chunk_chars).split(text)
}
