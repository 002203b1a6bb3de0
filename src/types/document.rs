//! Page and sentence types.

use serde::{Deserialize, Serialize};

/// One extracted page of a source document.
///
/// This is the unit produced by the external text-extraction step and stored
/// in the `extracted-dicts` container as `[{"text": .., "page": ..}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Cleaned page text
    pub text: String,

    /// 1-based page number
    pub page: u32,
}

impl Page {
    /// Create a new page.
    pub fn new(text: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            page,
        }
    }
}

/// A sentence tagged with its position on the page it came from.
///
/// Sentences are immutable once produced. All sentences of one page share
/// the same `sentences_page` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Trimmed sentence text
    pub text: String,

    /// Page number the sentence was found on
    pub page: u32,

    /// 1-based rank of the sentence within its page
    pub sentence_num: usize,

    /// Total number of sentences on the page
    pub sentences_page: usize,
}
