//! Sentence segmentation and chunking strategies.

mod base;
pub mod segmenter;
mod sentence_window;
mod token_window;

pub use base::{count_tokens, default_counter, Chunker, TiktokenCounter, TokenCounter};
pub use segmenter::{segment_page, segment_page_unicode, segment_pages, split_sentences};
pub use sentence_window::SentenceWindowChunker;
pub use token_window::{overlap_tail, split_at_char_midpoint, TokenWindowChunker, Transition};

#[cfg(test)]
pub(crate) use base::test_support;
