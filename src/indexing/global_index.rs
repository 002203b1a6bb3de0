//! The global index: one contiguous ID range per document.
//!
//! Every vector of every document gets an integer ID from a single space
//! starting at 0. Documents are visited in the caller's order and each one
//! takes the next `len` IDs, so ranges are gap-free and never overlap. The
//! index is rebuilt from scratch on every pass.

use std::collections::{HashMap, HashSet};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

/// Primary key of a vector in the store.
pub type GlobalId = i64;

/// The ID range owned by one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIndexEntry {
    pub source_id: String,
    /// Number of vectors (chunks) of the document
    pub len: usize,
    /// First global ID
    pub start: GlobalId,
    /// Last global ID, `start + len - 1` (`start - 1` when empty)
    pub end: GlobalId,
}

impl DocumentIndexEntry {
    pub fn contains(&self, id: GlobalId) -> bool {
        (self.start..=self.end).contains(&id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("document `{0}` appears more than once in one indexing pass")]
    DuplicateDocument(String),

    #[error("entry for `{source_id}` has end {end}, expected {expected}")]
    InconsistentRange {
        source_id: String,
        end: GlobalId,
        expected: GlobalId,
    },

    #[error("ranges of `{0}` and `{1}` overlap")]
    Overlap(String, String),
}

/// Where a global ID points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation<'a> {
    pub source_id: &'a str,
    /// 0-based offset within the document, `global_id - start`
    pub local_index: usize,
}

impl ChunkLocation<'_> {
    /// 1-based sequence number of the chunk (`chunk_<n>` key).
    pub fn chunk_number(&self) -> usize {
        self.local_index + 1
    }
}

/// Mapping from document to its global ID range.
///
/// Entries are kept ordered by `start`. Serialized as
/// `{source_id: {len, start, end}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalIndex {
    entries: Vec<DocumentIndexEntry>,
}

impl GlobalIndex {
    /// Get the entry of a document.
    pub fn get(&self, source_id: &str) -> Option<&DocumentIndexEntry> {
        self.entries.iter().find(|e| e.source_id == source_id)
    }

    /// Entries in ID order.
    pub fn entries(&self) -> &[DocumentIndexEntry] {
        &self.entries
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of IDs assigned.
    pub fn total_vectors(&self) -> usize {
        self.entries.iter().map(|e| e.len).sum()
    }

    /// Find the document and local offset a global ID belongs to.
    pub fn locate(&self, id: GlobalId) -> Option<ChunkLocation<'_>> {
        let pos = self.entries.partition_point(|e| e.start <= id);
        let entry = self.entries.get(pos.checked_sub(1)?)?;
        entry.contains(id).then(|| ChunkLocation {
            source_id: &entry.source_id,
            local_index: (id - entry.start) as usize,
        })
    }

    fn from_entries(mut entries: Vec<DocumentIndexEntry>) -> Result<Self, IndexError> {
        for entry in &entries {
            let expected = entry.start + entry.len as GlobalId - 1;
            if entry.end != expected {
                return Err(IndexError::InconsistentRange {
                    source_id: entry.source_id.clone(),
                    end: entry.end,
                    expected,
                });
            }
        }

        // Empty ranges sort before the range that starts at the same ID.
        entries.sort_by_key(|e| (e.start, e.len));
        let owned: Vec<&DocumentIndexEntry> = entries.iter().filter(|e| e.len > 0).collect();
        for pair in owned.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(IndexError::Overlap(
                    pair[0].source_id.clone(),
                    pair[1].source_id.clone(),
                ));
            }
        }

        Ok(Self { entries })
    }
}

#[derive(Serialize, Deserialize)]
struct RangeRecord {
    len: usize,
    start: GlobalId,
    end: GlobalId,
}

impl Serialize for GlobalIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(
                &entry.source_id,
                &RangeRecord {
                    len: entry.len,
                    start: entry.start,
                    end: entry.end,
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GlobalIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, RangeRecord>::deserialize(deserializer)?;
        let entries = raw
            .into_iter()
            .map(|(source_id, r)| DocumentIndexEntry {
                source_id,
                len: r.len,
                start: r.start,
                end: r.end,
            })
            .collect();
        GlobalIndex::from_entries(entries).map_err(D::Error::custom)
    }
}

/// Output of one indexing pass.
///
/// `vectors[i]` and `sources[i]` belong to global ID `i`.
#[derive(Debug, Clone, Default)]
pub struct IndexedVectors {
    pub index: GlobalIndex,
    pub vectors: Vec<Vec<f32>>,
    pub sources: Vec<String>,
    /// First ID not assigned; equals the number of vectors
    pub next_id: GlobalId,
}

impl IndexedVectors {
    /// Global IDs of `vectors`, in order.
    pub fn ids(&self) -> Vec<GlobalId> {
        (0..self.next_id).collect()
    }
}

/// Accumulator threaded through the indexing fold.
#[derive(Default)]
struct Assignment {
    next_id: GlobalId,
    seen: HashSet<String>,
    entries: Vec<DocumentIndexEntry>,
    vectors: Vec<Vec<f32>>,
    sources: Vec<String>,
}

impl Assignment {
    fn assign(mut self, source_id: String, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if !self.seen.insert(source_id.clone()) {
            return Err(IndexError::DuplicateDocument(source_id));
        }
        let len = vectors.len();
        let start = self.next_id;
        let end = start + len as GlobalId - 1;
        if len == 0 {
            warn!(source_id = %source_id, start, "Document has no vectors, recording an empty range");
        } else {
            debug!(source_id = %source_id, start, end, "Assigned ID range");
        }

        self.sources
            .extend(std::iter::repeat(source_id.clone()).take(len));
        self.vectors.extend(vectors);
        self.entries.push(DocumentIndexEntry {
            source_id,
            len,
            start,
            end,
        });
        self.next_id = end + 1;
        Ok(self)
    }

    fn finish(self) -> IndexedVectors {
        IndexedVectors {
            index: GlobalIndex {
                entries: self.entries,
            },
            vectors: self.vectors,
            sources: self.sources,
            next_id: self.next_id,
        }
    }
}

/// Assign global ID ranges to documents in iteration order.
///
/// Documents without vectors get an empty entry, `end = start - 1`, that no
/// ID resolves to. A document ID seen twice is an error.
pub fn build_global_index<I>(documents: I) -> Result<IndexedVectors, IndexError>
where
    I: IntoIterator<Item = (String, Vec<Vec<f32>>)>,
{
    documents
        .into_iter()
        .try_fold(Assignment::default(), |acc, (source_id, vectors)| {
            acc.assign(source_id, vectors)
        })
        .map(Assignment::finish)
}
