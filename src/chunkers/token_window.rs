//! Token-window chunker, the canonical chunking strategy.
//!
//! Sentences are folded one at a time into an open chunk while a running
//! token total `T` is kept. After every fold:
//!
//! - `min_tokens <= T <= max_tokens`: the chunk is emitted and the next one is
//!   seeded with an overlap tail of the emitted text.
//! - `T > max_tokens`: the sentence that overflowed the budget is cut in half
//!   by characters. The first half closes the current chunk, the second half
//!   follows the overlap tail in the next one.
//! - otherwise the chunk keeps accumulating.
//!
//! The overlap tail is sized in characters (`overlap_tokens * chars_per_token`)
//! and snapped back to the nearest preceding space.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::base::{default_counter, Chunker, TokenCounter};
use super::segmenter::segment_pages;
use crate::types::{Chunk, ChunkConfig, Page, Sentence};

/// What the chunk builder does after folding a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Keep folding sentences into the open chunk
    Accumulate,
    /// The open chunk is within budget; emit it
    Emit,
    /// The last sentence pushed the chunk over budget; split it
    Split,
}

impl Transition {
    /// Decide the transition for an accumulated token count.
    pub fn after_fold(tokens: usize, config: &ChunkConfig) -> Self {
        if (config.min_tokens..=config.max_tokens).contains(&tokens) {
            Transition::Emit
        } else if tokens > config.max_tokens {
            Transition::Split
        } else {
            Transition::Accumulate
        }
    }
}

/// Trailing text of `text` that seeds the next chunk.
///
/// Starts `overlap_chars` characters before the end, walks back to the
/// nearest space and returns the rest trimmed. Texts shorter than the window
/// are carried over whole.
pub fn overlap_tail(text: &str, overlap_chars: usize) -> &str {
    if overlap_chars == 0 || text.is_empty() {
        return "";
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut idx = chars.len().saturating_sub(overlap_chars);
    while idx > 0 && chars[idx].1 != ' ' {
        idx -= 1;
    }

    text[chars[idx].0..].trim()
}

/// Cut `text` at its character midpoint (`floor(chars / 2)`).
pub fn split_at_char_midpoint(text: &str) -> (&str, &str) {
    let mid = text.chars().count() / 2;
    let byte = text
        .char_indices()
        .nth(mid)
        .map_or(text.len(), |(b, _)| b);
    text.split_at(byte)
}

/// Text of the chunk currently being built.
#[derive(Debug, Default)]
struct OpenChunk {
    pieces: Vec<String>,
    tokens: usize,
    /// Whether anything besides the overlap seed has been folded in
    has_content: bool,
}

impl OpenChunk {
    fn joined(&self) -> String {
        self.pieces
            .iter()
            .filter(|p| !p.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn push(&mut self, text: &str, tokens: usize) {
        self.pieces.push(text.to_string());
        self.tokens += tokens;
    }
}

/// Token-window chunker with overlap carry-over.
pub struct TokenWindowChunker {
    counter: Arc<dyn TokenCounter>,
}

impl TokenWindowChunker {
    /// Create a new chunker counting cl100k_base tokens.
    pub fn new() -> Self {
        Self::with_counter(default_counter())
    }

    /// Create a chunker with a custom token counter.
    pub fn with_counter(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }

    /// Seed a new open chunk with the overlap tail of `emitted`.
    fn seed(&self, emitted: &str, config: &ChunkConfig) -> OpenChunk {
        let tail = overlap_tail(emitted, config.overlap_chars());
        let mut open = OpenChunk::default();
        if !tail.is_empty() {
            open.push(tail, self.counter.count_tokens(tail));
        }
        open
    }

    /// Run the chunking state machine over a sentence stream.
    pub fn chunk_sentences(&self, sentences: &[Sentence], config: &ChunkConfig) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut open = OpenChunk::default();
        let mut last: Option<&Sentence> = None;

        for sentence in sentences {
            last = Some(sentence);
            let tokens = self.counter.count_tokens(&sentence.text);
            open.push(&sentence.text, tokens);
            open.has_content = true;

            match Transition::after_fold(open.tokens, config) {
                Transition::Accumulate => {}
                Transition::Emit => {
                    let text = open.joined();
                    let emitted_tokens = open.tokens;
                    open = self.seed(&text, config);
                    chunks.push(Chunk::from_last_sentence(text, sentence, emitted_tokens));
                }
                Transition::Split => {
                    open.pieces.pop();
                    open.tokens -= tokens;

                    let (head, tail) = split_at_char_midpoint(&sentence.text);
                    open.push(head, self.counter.count_tokens(head));

                    let text = open.joined();
                    let emitted_tokens = open.tokens;
                    debug!(
                        page = sentence.page,
                        sentence_num = sentence.sentence_num,
                        sentence_tokens = tokens,
                        "Splitting oversized sentence"
                    );

                    let mut next = self.seed(&text, config);
                    next.pieces.push(tail.to_string());
                    next.tokens = self.counter.count_tokens(&next.joined());
                    next.has_content = true;
                    open = next;

                    chunks.push(Chunk::from_last_sentence(text, sentence, emitted_tokens));
                }
            }
        }

        if let Some(last) = last {
            let text = open.joined();
            if open.has_content && !text.is_empty() {
                chunks.push(Chunk::from_last_sentence(text, last, open.tokens));
            }
        }

        chunks
    }
}

impl Default for TokenWindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for TokenWindowChunker {
    fn name(&self) -> &'static str {
        "token_window"
    }

    fn description(&self) -> &'static str {
        "Packs sentences into token-bounded chunks with a character-sized overlap tail"
    }

    fn chunk(&self, pages: &[Page], config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let sentences = segment_pages(pages);
        if sentences.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.chunk_sentences(&sentences, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunkers::test_support::WordCounter;
    use pretty_assertions::assert_eq;

    fn word_chunker() -> TokenWindowChunker {
        TokenWindowChunker::with_counter(Arc::new(WordCounter))
    }

    fn sentence(text: &str, page: u32, num: usize, of: usize) -> Sentence {
        Sentence {
            text: text.to_string(),
            page,
            sentence_num: num,
            sentences_page: of,
        }
    }

    /// A sentence of `words` words, each `w<i>`.
    fn words(prefix: &str, words: usize) -> String {
        (0..words)
            .map(|i| format!("{prefix}{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_transition_boundaries() {
        let config = ChunkConfig::default();
        assert_eq!(Transition::after_fold(165, &config), Transition::Accumulate);
        assert_eq!(Transition::after_fold(166, &config), Transition::Emit);
        assert_eq!(Transition::after_fold(256, &config), Transition::Emit);
        assert_eq!(Transition::after_fold(257, &config), Transition::Split);
    }

    #[test]
    fn test_overlap_tail_snaps_to_space() {
        assert_eq!(overlap_tail("alpha beta gamma", 5), "gamma");
        // Offset lands inside "beta"; walk back to the space before it.
        assert_eq!(overlap_tail("alpha beta gamma", 8), "beta gamma");
        assert_eq!(overlap_tail("short", 100), "short");
        assert_eq!(overlap_tail("anything", 0), "");
    }

    #[test]
    fn test_overlap_tail_counts_characters() {
        let text = "ééé ééé ééé";
        assert_eq!(overlap_tail(text, 3), "ééé");
    }

    #[test]
    fn test_split_at_char_midpoint() {
        assert_eq!(split_at_char_midpoint("abcdef"), ("abc", "def"));
        assert_eq!(split_at_char_midpoint("abcde"), ("ab", "cde"));
        assert_eq!(split_at_char_midpoint("a"), ("", "a"));
        assert_eq!(split_at_char_midpoint("héllo wörld"), ("héllo", " wörld"));
    }

    #[test]
    fn test_emits_inside_window_with_overlap() {
        let chunker = word_chunker();
        let config = ChunkConfig::with_window(10, 12).with_overlap(2);
        let sentences = vec![
            sentence(&words("a", 6), 1, 1, 3),
            sentence(&words("b", 5), 1, 2, 3),
            sentence(&words("c", 3), 1, 3, 3),
        ];

        let chunks = chunker.chunk_sentences(&sentences, &config);
        assert_eq!(chunks.len(), 2);

        // 6 + 5 = 11 tokens closes the first chunk on sentence 2.
        assert_eq!(chunks[0].token_count, 11);
        assert_eq!(chunks[0].sentence_num, 2);
        assert!(chunks[0].text.starts_with("a0 "));
        assert!(chunks[0].text.ends_with("b4"));

        // Overlap window is 6 chars: "b3 b4" seeds the final chunk.
        assert_eq!(chunks[1].text, "b3 b4 c0 c1 c2");
        assert_eq!(chunks[1].sentence_num, 3);
        assert_eq!(chunks[1].token_count, 5);
    }

    #[test]
    fn test_final_chunk_not_emitted_for_bare_seed() {
        let chunker = word_chunker();
        let config = ChunkConfig::with_window(4, 6).with_overlap(1);
        let sentences = vec![sentence("one two three four five.", 1, 1, 1)];

        let chunks = chunker.chunk_sentences(&sentences, &config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "one two three four five.");
    }

    #[test]
    fn test_oversized_sentence_is_split_by_characters() {
        let chunker = word_chunker();
        let config = ChunkConfig::with_window(10, 12).with_overlap(2);
        let first = words("a", 4);
        let long = "x".repeat(10) + " " + &words("y", 15);
        let sentences = vec![sentence(&first, 2, 1, 2), sentence(&long, 2, 2, 2)];

        let chunks = chunker.chunk_sentences(&sentences, &config);
        let (head, tail) = split_at_char_midpoint(&long);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, format!("{first} {head}"));
        assert_eq!(chunks[0].sentence_num, 2);
        assert_eq!(chunks[0].page, 2);

        let seed = overlap_tail(&chunks[0].text, 6);
        assert_eq!(chunks[1].text, format!("{seed} {tail}"));
        assert_eq!(chunks[1].token_count, chunks[1].text.split_whitespace().count());
    }

    #[test]
    fn test_non_final_chunks_stay_in_window() {
        let chunker = word_chunker();
        let config = ChunkConfig::default();
        // Sentences of 5..=40 words never jump from below min to above max.
        let sentences: Vec<Sentence> = (0..300)
            .map(|i| sentence(&words("w", 5 + (i * 7) % 36), 1 + (i / 20) as u32, i % 20 + 1, 20))
            .collect();

        let chunks = chunker.chunk_sentences(&sentences, &config);
        assert!(chunks.len() > 10);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                (config.min_tokens..=config.max_tokens).contains(&chunk.token_count),
                "chunk with {} tokens",
                chunk.token_count
            );
        }
    }

    #[test]
    fn test_emission_order_follows_input() {
        let chunker = word_chunker();
        let config = ChunkConfig::with_window(20, 30).with_overlap(2);
        let sentences: Vec<Sentence> = (0..60)
            .map(|i| sentence(&words("w", 4 + i % 5), 1 + (i / 10) as u32, i % 10 + 1, 10))
            .collect();

        let chunks = chunker.chunk_sentences(&sentences, &config);
        let positions: Vec<(u32, usize)> =
            chunks.iter().map(|c| (c.page, c.sentence_num)).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_chunker_trait_on_pages() {
        let chunker = TokenWindowChunker::new();
        assert!(chunker.chunk(&[], &ChunkConfig::default()).unwrap().is_empty());

        let pages = vec![Page::new("A short page. Nothing more.", 1)];
        let chunks = chunker.chunk(&pages, &ChunkConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A short page. Nothing more.");
        assert_eq!(chunks[0].sentence_num, 2);
        assert_eq!(chunks[0].sentences_page, 2);
    }
}
