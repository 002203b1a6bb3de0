//! Sentence segmentation of page text.
//!
//! A sentence ends at a whitespace character that directly follows `.` or
//! `?`, unless the text just before the whitespace looks like:
//!
//! - a dotted abbreviation such as `e.g.` or `U.S.` (`\w.\w` + one char),
//! - a title abbreviation such as `Mr.` or `Dr.` (`[A-Z][a-z].`),
//! - a word directly followed by `!` or `?`.
//!
//! The separating whitespace character is consumed and every piece is
//! trimmed. Pieces that trim to nothing are dropped.

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::types::{Page, Sentence};

lazy_static::lazy_static! {
    static ref BOUNDARY: Regex = Regex::new(r"[.?]\s").expect("valid boundary pattern");
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether a boundary candidate is protected from splitting.
///
/// `head` is the text up to and including the terminating `.` or `?`.
fn is_protected(head: &str) -> bool {
    let mut rev = head.chars().rev();
    let (Some(p1), c2, c3, c4) = (rev.next(), rev.next(), rev.next(), rev.next()) else {
        return false;
    };

    let dotted = matches!((c4, c3, c2), (Some(a), Some('.'), Some(b)) if is_word(a) && is_word(b))
        && p1 != '\n';
    let title = p1 == '.'
        && matches!((c3, c2), (Some(a), Some(b)) if a.is_ascii_uppercase() && b.is_ascii_lowercase());
    let word_bang = matches!(p1, '!' | '?') && c2.is_some_and(is_word);

    dotted || title || word_bang
}

/// Split one page of text into trimmed, non-empty sentence strings.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for m in BOUNDARY.find_iter(text) {
        // The terminator is ASCII, so the whitespace starts one byte later.
        let terminator_end = m.start() + 1;
        if is_protected(&text[..terminator_end]) {
            continue;
        }
        pieces.push(&text[start..terminator_end]);
        start = m.end();
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn tag(texts: Vec<&str>, page: u32) -> Vec<Sentence> {
    let sentences_page = texts.len();
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Sentence {
            text: text.to_string(),
            page,
            sentence_num: i + 1,
            sentences_page,
        })
        .collect()
}

/// Segment one page into tagged sentences.
pub fn segment_page(page: &Page) -> Vec<Sentence> {
    tag(split_sentences(&page.text), page.page)
}

/// Segment pages in order into one sentence stream.
pub fn segment_pages(pages: &[Page]) -> Vec<Sentence> {
    pages.iter().flat_map(segment_page).collect()
}

/// Segment one page with Unicode sentence boundaries (UAX #29).
///
/// Used by the sentence-window strategy only.
pub fn segment_page_unicode(page: &Page) -> Vec<Sentence> {
    let texts = page
        .text
        .unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    tag(texts, page.page)
}
