//! Typed JSON access to the pipeline's blobs.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{BlobStore, CollectionSettings, Container, StoreError};
use crate::indexing::GlobalIndex;
use crate::types::{ChunkMap, Page};

const SETTINGS_KEY: &str = "settings";

/// Typed view over a [`BlobStore`].
#[derive(Clone)]
pub struct DocumentStore {
    blobs: Arc<dyn BlobStore>,
}

impl DocumentStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        container: Container,
        key: &str,
    ) -> Result<T, StoreError> {
        let data = self.blobs.get(container, key).await?;
        serde_json::from_slice(&data).map_err(|source| StoreError::Json {
            container,
            key: key.to_string(),
            source,
        })
    }

    async fn put_json<T: Serialize>(
        &self,
        container: Container,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_vec(value).map_err(|source| StoreError::Json {
            container,
            key: key.to_string(),
            source,
        })?;
        self.blobs.put(container, key, data).await
    }

    pub async fn get_pages(&self, document_id: &str) -> Result<Vec<Page>, StoreError> {
        self.get_json(Container::ExtractedPages, document_id).await
    }

    pub async fn put_pages(&self, document_id: &str, pages: &[Page]) -> Result<(), StoreError> {
        self.put_json(Container::ExtractedPages, document_id, &pages)
            .await
    }

    pub async fn get_chunks(&self, document_id: &str) -> Result<ChunkMap, StoreError> {
        self.get_json(Container::ChunkedDicts, document_id).await
    }

    pub async fn put_chunks(&self, document_id: &str, chunks: &ChunkMap) -> Result<(), StoreError> {
        self.put_json(Container::ChunkedDicts, document_id, chunks)
            .await
    }

    pub async fn get_vectors(&self, document_id: &str) -> Result<Vec<Vec<f32>>, StoreError> {
        self.get_json(Container::VectorizedDicts, document_id).await
    }

    pub async fn put_vectors(
        &self,
        document_id: &str,
        vectors: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        self.put_json(Container::VectorizedDicts, document_id, &vectors)
            .await
    }

    /// Remove the vectors of a document; returns whether there were any.
    pub async fn delete_vectors(&self, document_id: &str) -> Result<bool, StoreError> {
        self.blobs
            .delete(Container::VectorizedDicts, document_id)
            .await
    }

    /// Documents that have vectors, in listing order.
    pub async fn list_vectorized(&self) -> Result<Vec<String>, StoreError> {
        self.blobs.list(Container::VectorizedDicts).await
    }

    pub async fn get_index(&self, collection: &str) -> Result<GlobalIndex, StoreError> {
        self.get_json(Container::Indexes, collection).await
    }

    pub async fn put_index(&self, collection: &str, index: &GlobalIndex) -> Result<(), StoreError> {
        self.put_json(Container::Indexes, collection, index).await
    }

    /// Current settings; defaults when none were written yet.
    pub async fn get_settings(&self) -> Result<CollectionSettings, StoreError> {
        match self.get_json(Container::Settings, SETTINGS_KEY).await {
            Err(e) if e.is_not_found() => Ok(CollectionSettings::default()),
            other => other,
        }
    }

    pub async fn put_settings(&self, settings: &CollectionSettings) -> Result<(), StoreError> {
        self.put_json(Container::Settings, SETTINGS_KEY, settings)
            .await
    }
}
