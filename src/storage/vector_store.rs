//! Vector store collaborator.
//!
//! The store keeps rows under an explicit integer primary key and answers
//! nearest-neighbor queries with `(id, distance)` pairs, best first.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::StoreError;
use crate::indexing::GlobalId;
use crate::retrieval::SearchHit;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn has_collection(&self, name: &str) -> Result<bool, StoreError>;

    /// Create an empty collection holding `dim`-dimensional vectors.
    async fn create_collection(&self, name: &str, dim: usize) -> Result<(), StoreError>;

    /// Drop a collection; returns whether it existed.
    async fn drop_collection(&self, name: &str) -> Result<bool, StoreError>;

    /// Insert rows; `ids`, `vectors` and `sources` are parallel.
    async fn insert(
        &self,
        collection: &str,
        ids: &[GlobalId],
        vectors: &[Vec<f32>],
        sources: &[String],
    ) -> Result<usize, StoreError>;

    /// Nearest neighbors of `query`, ordered by increasing distance.
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, StoreError>;

    async fn count(&self, collection: &str) -> Result<usize, StoreError>;

    /// Number of rows tagged with `source`.
    async fn count_source(&self, collection: &str, source: &str) -> Result<usize, StoreError>;
}

/// Insert rows in slices of at most `batch_size`.
pub async fn insert_batched(
    store: &dyn VectorStore,
    collection: &str,
    ids: &[GlobalId],
    vectors: &[Vec<f32>],
    sources: &[String],
    batch_size: usize,
) -> Result<usize, StoreError> {
    if ids.len() != vectors.len() || ids.len() != sources.len() {
        return Err(StoreError::LengthMismatch {
            ids: ids.len(),
            vectors: vectors.len(),
            sources: sources.len(),
        });
    }

    let batch_size = batch_size.max(1);
    let mut inserted = 0;
    for ((ids, vectors), sources) in ids
        .chunks(batch_size)
        .zip(vectors.chunks(batch_size))
        .zip(sources.chunks(batch_size))
    {
        inserted += store.insert(collection, ids, vectors, sources).await?;
        debug!(collection, inserted, total = ids.len(), "Inserted batch");
    }

    info!(collection, inserted, "Inserted vectors");
    Ok(inserted)
}

struct Row {
    id: GlobalId,
    vector: Vec<f32>,
    source: String,
}

struct Collection {
    dim: usize,
    rows: Vec<Row>,
}

/// Brute-force in-memory vector store using squared L2 distance.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn has_collection(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, name: &str, dim: usize) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        collections.insert(name.to_string(), Collection { dim, rows: Vec::new() });
        debug!(collection = name, dim, "Created collection");
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.collections.write().await.remove(name).is_some())
    }

    async fn insert(
        &self,
        collection: &str,
        ids: &[GlobalId],
        vectors: &[Vec<f32>],
        sources: &[String],
    ) -> Result<usize, StoreError> {
        if ids.len() != vectors.len() || ids.len() != sources.len() {
            return Err(StoreError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
                sources: sources.len(),
            });
        }

        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        // Check the whole batch before touching the collection.
        if let Some(bad) = vectors.iter().find(|v| v.len() != target.dim) {
            return Err(StoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: target.dim,
                actual: bad.len(),
            });
        }

        target
            .rows
            .extend(ids.iter().zip(vectors).zip(sources).map(|((id, vector), source)| Row {
                id: *id,
                vector: vector.clone(),
                source: source.clone(),
            }));
        Ok(ids.len())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        if query.len() != target.dim {
            return Err(StoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: target.dim,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = target
            .rows
            .iter()
            .map(|row| SearchHit {
                id: row.id,
                distance: squared_l2(&row.vector, query),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.rows.len())
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
    }

    async fn count_source(&self, collection: &str, source: &str) -> Result<usize, StoreError> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.rows.iter().filter(|row| row.source == source).count())
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
    }
}
