//! Resolution of expanded hits to chunk text.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ExpandedHit;
use crate::indexing::{GlobalId, GlobalIndex};
use crate::storage::{DocumentStore, StoreError};
use crate::types::{chunk_key, Chunk, ChunkMap};

/// One retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: GlobalId,

    /// Distance to the query; absent for neighbors of a hit
    pub distance: Option<f32>,

    pub source_id: String,

    /// Key of the chunk in its document's chunk map
    pub chunk_key: String,

    pub chunk: Chunk,
}

/// Look up the chunk behind each expanded hit, keeping their order.
///
/// Each document's chunk map is loaded once. IDs outside the index, and
/// chunks missing from a document's map, are skipped with a warning.
pub async fn resolve_hits(
    documents: &DocumentStore,
    index: &GlobalIndex,
    hits: &[ExpandedHit],
) -> Result<Vec<QueryResult>, StoreError> {
    let mut cache: HashMap<String, Option<ChunkMap>> = HashMap::new();
    let mut results = Vec::with_capacity(hits.len());

    for hit in hits {
        let Some(location) = index.locate(hit.id) else {
            warn!(id = hit.id, "Hit is outside the global index");
            continue;
        };

        if !cache.contains_key(location.source_id) {
            let chunks = match documents.get_chunks(location.source_id).await {
                Ok(chunks) => Some(chunks),
                Err(e) if e.is_not_found() => {
                    warn!(source_id = location.source_id, "Chunk map is missing");
                    None
                }
                Err(e) => return Err(e),
            };
            cache.insert(location.source_id.to_string(), chunks);
        }

        let number = location.chunk_number();
        let chunk = cache
            .get(location.source_id)
            .and_then(Option::as_ref)
            .and_then(|chunks| chunks.get(number));
        let Some(chunk) = chunk else {
            warn!(
                id = hit.id,
                source_id = location.source_id,
                chunk = number,
                "Chunk not found for hit"
            );
            continue;
        };

        results.push(QueryResult {
            id: hit.id,
            distance: hit.distance,
            source_id: location.source_id.to_string(),
            chunk_key: chunk_key(number),
            chunk: chunk.clone(),
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::indexing::build_global_index;
    use crate::storage::MemoryBlobStore;
    use pretty_assertions::assert_eq;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            page: 1,
            sentence_num: 1,
            sentences_page: 1,
            token_count: 0,
        }
    }

    async fn fixture() -> (DocumentStore, GlobalIndex) {
        let store = DocumentStore::new(Arc::new(MemoryBlobStore::new()));
        store
            .put_chunks("a", &ChunkMap::new(vec![chunk("a1"), chunk("a2")]))
            .await
            .unwrap();
        store
            .put_chunks("b", &ChunkMap::new(vec![chunk("b1"), chunk("b2"), chunk("b3")]))
            .await
            .unwrap();

        let built = build_global_index(vec![
            ("a".to_string(), vec![vec![0.0]; 2]),
            ("b".to_string(), vec![vec![0.0]; 3]),
        ])
        .unwrap();
        (store, built.index)
    }

    #[tokio::test]
    async fn test_resolves_in_hit_order() {
        let (store, index) = fixture().await;
        let hits = vec![
            ExpandedHit { id: 3, distance: Some(0.5) },
            ExpandedHit { id: 2, distance: None },
            ExpandedHit { id: 1, distance: None },
        ];

        let results = resolve_hits(&store, &index, &hits).await.unwrap();
        let summary: Vec<(&str, &str, &str)> = results
            .iter()
            .map(|r| (r.source_id.as_str(), r.chunk_key.as_str(), r.chunk.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![("b", "chunk_2", "b2"), ("b", "chunk_1", "b1"), ("a", "chunk_2", "a2")]
        );
        assert_eq!(results[0].distance, Some(0.5));
    }

    #[tokio::test]
    async fn test_skips_unknown_ids() {
        let (store, index) = fixture().await;
        let hits = vec![
            ExpandedHit { id: 5, distance: None },
            ExpandedHit { id: 0, distance: Some(0.1) },
        ];
        let results = resolve_hits(&store, &index, &hits).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "a1");
    }

    #[tokio::test]
    async fn test_skips_documents_without_chunks() {
        let store = DocumentStore::new(Arc::new(MemoryBlobStore::new()));
        let index = build_global_index(vec![("gone".to_string(), vec![vec![0.0]])])
            .unwrap()
            .index;
        let hits = vec![ExpandedHit { id: 0, distance: Some(0.0) }];
        assert!(resolve_hits(&store, &index, &hits).await.unwrap().is_empty());
    }
}
