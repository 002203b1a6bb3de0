//! Sentence-window chunker.
//!
//! A variant strategy that groups a fixed number of Unicode sentences per
//! chunk and repeats the last `overlap_sentences` of each chunk at the start
//! of the next. It ignores token budgets; token counts are reported only.

use std::sync::Arc;

use anyhow::Result;

use super::base::{default_counter, Chunker, TokenCounter};
use super::segmenter::segment_page_unicode;
use crate::types::{Chunk, ChunkConfig, Page, Sentence};

/// Sentence-window chunker with sentence overlap.
pub struct SentenceWindowChunker {
    counter: Arc<dyn TokenCounter>,
}

impl SentenceWindowChunker {
    /// Create a new sentence-window chunker.
    pub fn new() -> Self {
        Self::with_counter(default_counter())
    }

    /// Create a sentence-window chunker with a custom token counter.
    pub fn with_counter(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }
}

impl Default for SentenceWindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SentenceWindowChunker {
    fn name(&self) -> &'static str {
        "sentence_window"
    }

    fn description(&self) -> &'static str {
        "Groups a fixed number of Unicode sentences per chunk with sentence overlap"
    }

    fn chunk(&self, pages: &[Page], config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let per_chunk = config.sentences_per_chunk;
        if per_chunk == 0 {
            anyhow::bail!("sentences_per_chunk must be > 0");
        }
        if config.overlap_sentences >= per_chunk {
            anyhow::bail!(
                "overlap_sentences ({}) must be less than sentences_per_chunk ({})",
                config.overlap_sentences,
                per_chunk
            );
        }
        let step = per_chunk - config.overlap_sentences;

        let sentences: Vec<Sentence> = pages.iter().flat_map(segment_page_unicode).collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < sentences.len() {
            let end = (start + per_chunk).min(sentences.len());
            let window = &sentences[start..end];
            let text = window
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let token_count = self.counter.count_tokens(&text);

            if let Some(last) = window.last() {
                chunks.push(Chunk::from_last_sentence(text, last, token_count));
            }

            if end == sentences.len() {
                break;
            }
            start += step;
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunkers::test_support::WordCounter;
    use pretty_assertions::assert_eq;

    fn chunker() -> SentenceWindowChunker {
        SentenceWindowChunker::with_counter(Arc::new(WordCounter))
    }

    #[test]
    fn test_windows_overlap_by_one_sentence() {
        let pages = vec![Page::new("S1. S2. S3. S4. S5. S6. S7.", 1)];
        let chunks = chunker().chunk(&pages, &ChunkConfig::default()).unwrap();

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["S1. S2. S3. S4.", "S4. S5. S6. S7."]);
        assert_eq!(chunks[0].sentence_num, 4);
        assert_eq!(chunks[1].sentence_num, 7);
        assert_eq!(chunks[1].token_count, 4);
    }

    #[test]
    fn test_windows_cross_pages() {
        let pages = vec![Page::new("A1. A2. A3.", 1), Page::new("B1. B2.", 2)];
        let chunks = chunker().chunk(&pages, &ChunkConfig::default()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "A1. A2. A3. B1.");
        assert_eq!((chunks[0].page, chunks[0].sentence_num), (2, 1));
        assert_eq!(chunks[1].text, "B1. B2.");
        assert_eq!(chunks[1].sentences_page, 2);
    }

    #[test]
    fn test_rejects_bad_windows() {
        let pages = vec![Page::new("One.", 1)];
        let config = ChunkConfig::default().with_sentences(0, 0);
        assert!(chunker().chunk(&pages, &config).is_err());
        let config = ChunkConfig::default().with_sentences(2, 2);
        assert!(chunker().chunk(&pages, &config).is_err());
    }

    #[test]
    fn test_empty_pages() {
        let chunks = chunker()
            .chunk(&[Page::new("", 1)], &ChunkConfig::default())
            .unwrap();
        assert!(chunks.is_empty());
    }
}
