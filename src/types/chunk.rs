//! Chunk type definitions.

use std::collections::HashMap;
use std::fmt;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Sentence;

/// A chunk of document text.
///
/// Chunks are the unit that gets vectorized and indexed. The position fields
/// are inherited from the last sentence folded into the chunk before it was
/// emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text
    pub text: String,

    /// Page of the last sentence in the chunk
    pub page: u32,

    /// Rank of the last sentence within its page
    pub sentence_num: usize,

    /// Sentence count of that page
    pub sentences_page: usize,

    /// Accumulated token count at emission time (not persisted)
    #[serde(skip)]
    pub token_count: usize,
}

impl Chunk {
    /// Create a chunk that inherits its position from `last`.
    pub fn from_last_sentence(text: String, last: &Sentence, token_count: usize) -> Self {
        Self {
            text,
            page: last.page,
            sentence_num: last.sentence_num,
            sentences_page: last.sentences_page,
            token_count,
        }
    }

    /// Get the length of the chunk text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Errors raised while decoding a chunk map.
#[derive(Debug, thiserror::Error)]
pub enum ChunkMapError {
    #[error("invalid chunk key `{0}` (expected chunk_<n> with n >= 1)")]
    InvalidKey(String),

    #[error("chunk map is missing key chunk_{0}")]
    MissingKey(usize),
}

/// Build the blob key of the `n`-th chunk (1-based).
pub fn chunk_key(n: usize) -> String {
    format!("chunk_{n}")
}

/// Parse a `chunk_<n>` key back into its 1-based sequence number.
pub fn parse_chunk_key(key: &str) -> Option<usize> {
    key.strip_prefix("chunk_")
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| *n >= 1)
}

/// The ordered chunks of one document.
///
/// Serialized as a JSON object `{"chunk_1": {..}, "chunk_2": {..}}`.
/// Decoding orders entries by their numeric suffix, so `chunk_10` sorts
/// after `chunk_9` regardless of how the object was written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMap {
    chunks: Vec<Chunk>,
}

impl ChunkMap {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// Get a chunk by its 1-based sequence number.
    pub fn get(&self, n: usize) -> Option<&Chunk> {
        n.checked_sub(1).and_then(|i| self.chunks.get(i))
    }

    /// Get a chunk by its blob key.
    pub fn get_by_key(&self, key: &str) -> Option<&Chunk> {
        parse_chunk_key(key).and_then(|n| self.get(n))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate over `(key, chunk)` pairs in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &Chunk)> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (chunk_key(i + 1), chunk))
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }
}

impl From<Vec<Chunk>> for ChunkMap {
    fn from(chunks: Vec<Chunk>) -> Self {
        Self::new(chunks)
    }
}

impl Serialize for ChunkMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.chunks.len()))?;
        for (key, chunk) in self.iter() {
            map.serialize_entry(&key, chunk)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChunkMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, Chunk>::deserialize(deserializer)?;

        let mut numbered = Vec::with_capacity(raw.len());
        for (key, chunk) in raw {
            let n = parse_chunk_key(&key)
                .ok_or_else(|| D::Error::custom(ChunkMapError::InvalidKey(key.clone())))?;
            numbered.push((n, chunk));
        }
        numbered.sort_by_key(|(n, _)| *n);

        for (i, (n, _)) in numbered.iter().enumerate() {
            if *n != i + 1 {
                return Err(D::Error::custom(ChunkMapError::MissingKey(i + 1)));
            }
        }

        Ok(Self {
            chunks: numbered.into_iter().map(|(_, chunk)| chunk).collect(),
        })
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p{} s{}/{}: {}",
            self.page, self.sentence_num, self.sentences_page, self.text
        )
    }
}
