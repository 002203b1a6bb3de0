//! Document pipeline: pages to chunks to vectors to a queryable collection.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::indexing::{build_global_index, GlobalId};
use crate::retrieval::{expand_neighbors_below, resolve_hits};
use crate::router::{ChunkingRouter, ChunkingStrategy};
use crate::storage::{
    insert_batched, BlobStore, CollectionPair, DocumentStore, VectorStore,
};
use crate::types::{
    ChunkDocumentResponse, ChunkMap, IndexSummaryResponse, Page, QueryResponse, ServiceConfig,
    VectorizeDocumentResponse,
};
use crate::vectorize::{pad_vector, OverlengthPolicy, Vectorizer};

/// Failures callers may want to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("an index rebuild is already running")]
    RebuildInProgress,

    #[error("no active collection, rebuild the index first")]
    NoActiveCollection,

    #[error("vectorizer `{backend}` failed: {message}")]
    Vectorizer {
        backend: &'static str,
        message: String,
    },
}

/// Proof that the caller holds the rebuild lock.
pub struct RebuildPermit {
    _guard: OwnedMutexGuard<()>,
}

/// Progress of a running rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildProgress {
    pub collection: String,
    pub total_documents: usize,
    pub processed_documents: usize,
    pub vectors_indexed: usize,
}

/// Receives rebuild progress.
#[async_trait]
pub trait RebuildObserver: Send + Sync {
    async fn progress(&self, progress: RebuildProgress);
}

#[async_trait]
impl RebuildObserver for () {
    async fn progress(&self, _progress: RebuildProgress) {}
}

/// Outcome of a finished rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildSummary {
    pub collection: String,
    pub documents: usize,
    pub vectors: usize,
}

/// Pipeline settings taken from [`ServiceConfig`].
#[derive(Debug, Clone)]
struct PipelineSettings {
    vector_dim: usize,
    overlength_policy: OverlengthPolicy,
    insert_batch_size: usize,
    vectorize_concurrency: usize,
    default_top_k: usize,
}

/// The indexing and retrieval pipeline.
pub struct Pipeline {
    documents: DocumentStore,
    vectors: Arc<dyn VectorStore>,
    vectorizer: Arc<dyn Vectorizer>,
    router: ChunkingRouter,
    collections: CollectionPair,
    settings: PipelineSettings,
    rebuild_lock: Arc<Mutex<()>>,
}

impl Pipeline {
    pub fn new(
        config: &ServiceConfig,
        blobs: Arc<dyn BlobStore>,
        vectors: Arc<dyn VectorStore>,
        vectorizer: Arc<dyn Vectorizer>,
    ) -> Self {
        Self {
            documents: DocumentStore::new(blobs),
            vectors,
            vectorizer,
            router: ChunkingRouter::new(config.chunking_strategy),
            collections: CollectionPair::new(&config.collection_prefix),
            settings: PipelineSettings {
                vector_dim: config.vector_dim,
                overlength_policy: config.overlength_policy,
                insert_batch_size: config.insert_batch_size,
                vectorize_concurrency: config.vectorize_concurrency.max(1),
                default_top_k: config.default_top_k,
            },
            rebuild_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn router(&self) -> &ChunkingRouter {
        &self.router
    }

    pub fn vectorizer_name(&self) -> &'static str {
        self.vectorizer.name()
    }

    /// Store the pages of a document and chunk them with the default strategy.
    pub async fn ingest_pages(
        &self,
        document_id: &str,
        pages: &[Page],
    ) -> Result<ChunkDocumentResponse> {
        self.documents
            .put_pages(document_id, pages)
            .await
            .with_context(|| format!("failed to store pages of `{document_id}`"))?;
        info!(document_id, pages = pages.len(), "Stored pages");

        self.chunk_document(document_id, None).await
    }

    /// Chunk the stored pages of a document and store its chunk map.
    pub async fn chunk_document(
        &self,
        document_id: &str,
        strategy: Option<ChunkingStrategy>,
    ) -> Result<ChunkDocumentResponse> {
        let strategy = strategy.unwrap_or(self.router.default_strategy());
        let pages = self
            .documents
            .get_pages(document_id)
            .await
            .with_context(|| format!("failed to load pages of `{document_id}`"))?;

        let chunks = ChunkMap::new(self.router.chunk(&pages, Some(strategy))?);
        self.documents
            .put_chunks(document_id, &chunks)
            .await
            .with_context(|| format!("failed to store chunks of `{document_id}`"))?;

        // Vectors of the previous chunk map no longer line up with its keys.
        if self.documents.delete_vectors(document_id).await? {
            info!(document_id, "Dropped vectors of previous chunks");
        }

        info!(
            document_id,
            strategy = %strategy,
            chunks = chunks.len(),
            "Chunked document"
        );

        Ok(ChunkDocumentResponse {
            document_id: document_id.to_string(),
            strategy: strategy.to_string(),
            chunks: chunks.len(),
        })
    }

    /// Chunk map of a document.
    pub async fn get_chunks(&self, document_id: &str) -> Result<ChunkMap> {
        self.documents
            .get_chunks(document_id)
            .await
            .with_context(|| format!("failed to load chunks of `{document_id}`"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let raw = self.vectorizer.vectorize(text).await.map_err(|e| {
            PipelineError::Vectorizer {
                backend: self.vectorizer.name(),
                message: format!("{e:#}"),
            }
        })?;
        Ok(pad_vector(
            raw,
            self.settings.vector_dim,
            self.settings.overlength_policy,
        )?)
    }

    /// Vectorize every chunk of a document and store the padded vectors.
    ///
    /// Vector `i` belongs to `chunk_{i+1}`. Calls run concurrently up to the
    /// configured limit; output order follows chunk order.
    pub async fn vectorize_document(&self, document_id: &str) -> Result<VectorizeDocumentResponse> {
        let chunks = self.get_chunks(document_id).await?;

        let texts: Vec<String> = chunks.chunks().iter().map(|c| c.text.clone()).collect();

        let vectors: Vec<Vec<f32>> = stream::iter(texts)
            .map(|text| async move { self.embed(&text).await })
            .buffered(self.settings.vectorize_concurrency)
            .try_collect()
            .await?;

        self.documents
            .put_vectors(document_id, &vectors)
            .await
            .with_context(|| format!("failed to store vectors of `{document_id}`"))?;

        info!(
            document_id,
            vectorizer = self.vectorizer.name(),
            vectors = vectors.len(),
            "Vectorized document"
        );

        Ok(VectorizeDocumentResponse {
            document_id: document_id.to_string(),
            vectorizer: self.vectorizer.name().to_string(),
            vectors: vectors.len(),
            dimension: self.settings.vector_dim,
        })
    }

    /// Vectors of a document, if they match its current chunk map.
    async fn load_indexable_vectors(&self, document_id: &str) -> Result<Option<Vec<Vec<f32>>>> {
        let vectors = self
            .documents
            .get_vectors(document_id)
            .await
            .with_context(|| format!("failed to load vectors of `{document_id}`"))?;

        let chunks = match self.documents.get_chunks(document_id).await {
            Ok(chunks) => chunks.len(),
            Err(e) if e.is_not_found() => {
                warn!(document_id, "Document has vectors but no chunks, skipping");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to load chunks of `{document_id}`"))
            }
        };

        if chunks != vectors.len() {
            warn!(
                document_id,
                chunks,
                vectors = vectors.len(),
                "Vectors do not match chunks, skipping document until it is vectorized again"
            );
            return Ok(None);
        }
        Ok(Some(vectors))
    }

    /// Take the rebuild lock, failing if a rebuild is already running.
    pub fn try_begin_rebuild(&self) -> Result<RebuildPermit> {
        let guard = self
            .rebuild_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| PipelineError::RebuildInProgress)?;
        Ok(RebuildPermit { _guard: guard })
    }

    /// Rebuild the global index into the standby collection and activate it.
    ///
    /// Documents are taken in vector blob listing order. Queries keep using
    /// the previously active collection until the new one is complete.
    pub async fn rebuild_index(
        &self,
        permit: RebuildPermit,
        observer: &dyn RebuildObserver,
    ) -> Result<RebuildSummary> {
        let mut settings = self.documents.get_settings().await?;
        let collection = self.collections.standby(&settings).to_string();
        let document_ids = self.documents.list_vectorized().await?;
        let total_documents = document_ids.len();

        info!(collection = %collection, documents = total_documents, "Rebuilding index");

        let mut documents = Vec::with_capacity(total_documents);
        let mut vectors_indexed = 0;
        for (n, document_id) in document_ids.into_iter().enumerate() {
            if let Some(vectors) = self.load_indexable_vectors(&document_id).await? {
                vectors_indexed += vectors.len();
                documents.push((document_id, vectors));
            }

            observer
                .progress(RebuildProgress {
                    collection: collection.clone(),
                    total_documents,
                    processed_documents: n + 1,
                    vectors_indexed,
                })
                .await;
        }

        let built = build_global_index(documents)?;

        self.vectors.drop_collection(&collection).await?;
        self.vectors
            .create_collection(&collection, self.settings.vector_dim)
            .await?;
        let inserted = insert_batched(
            self.vectors.as_ref(),
            &collection,
            &built.ids(),
            &built.vectors,
            &built.sources,
            self.settings.insert_batch_size,
        )
        .await?;

        self.documents.put_index(&collection, &built.index).await?;
        settings.activate(&collection);
        self.documents.put_settings(&settings).await?;
        drop(permit);

        info!(
            collection = %collection,
            documents = built.index.len(),
            vectors = inserted,
            "Index rebuilt and activated"
        );

        Ok(RebuildSummary {
            collection,
            documents: built.index.len(),
            vectors: inserted,
        })
    }

    /// Active collection and its index summary.
    pub async fn index_summary(&self) -> Result<IndexSummaryResponse> {
        let settings = self.documents.get_settings().await?;
        let Some(collection) = settings.active_collection else {
            return Ok(IndexSummaryResponse {
                collection: None,
                total_vectors: 0,
                documents: vec![],
            });
        };

        let index = self.documents.get_index(&collection).await?;
        Ok(IndexSummaryResponse {
            total_vectors: index.total_vectors(),
            documents: index.entries().to_vec(),
            collection: Some(collection),
        })
    }

    /// Answer a question with up to `k` chunks from the active collection.
    ///
    /// The `k` nearest chunks are expanded with their neighbors and cut back
    /// to `k` results, in discovery order.
    pub async fn query(&self, question: &str, k: Option<usize>) -> Result<QueryResponse> {
        let k = k.unwrap_or(self.settings.default_top_k);
        let settings = self.documents.get_settings().await?;
        let collection = settings
            .active_collection
            .ok_or(PipelineError::NoActiveCollection)?;
        if !self.vectors.has_collection(&collection).await? {
            return Err(PipelineError::NoActiveCollection.into());
        }
        let index = self.documents.get_index(&collection).await?;

        let query = self.embed(question).await?;
        let hits = self.vectors.search(&collection, &query, k).await?;
        let expanded = expand_neighbors_below(&hits, k, index.total_vectors() as GlobalId);
        debug!(
            collection = %collection,
            hits = hits.len(),
            expanded = expanded.len(),
            "Expanded hits"
        );

        let results = resolve_hits(&self.documents, &index, &expanded).await?;
        Ok(QueryResponse {
            collection,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::storage::{MemoryBlobStore, MemoryVectorStore, StoreError};
    use crate::vectorize::HashingVectorizer;
    use pretty_assertions::assert_eq;

    const DIM: usize = 64;

    fn config() -> ServiceConfig {
        ServiceConfig {
            hashing_dim: DIM,
            vector_dim: DIM,
            insert_batch_size: 2,
            default_top_k: 3,
            ..Default::default()
        }
    }

    fn pipeline() -> Pipeline {
        pipeline_with_dim(DIM)
    }

    fn pipeline_with_dim(dim: usize) -> Pipeline {
        let config = ServiceConfig {
            hashing_dim: dim,
            vector_dim: dim,
            ..config()
        };
        Pipeline::new(
            &config,
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(HashingVectorizer::new(dim).unwrap()),
        )
    }

    /// Count rebuild progress calls.
    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl RebuildObserver for Counter {
        async fn progress(&self, _progress: RebuildProgress) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FailingVectorizer;

    #[async_trait]
    impl Vectorizer for FailingVectorizer {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn vectorize(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("backend unavailable")
        }
    }

    async fn ingest(pipeline: &Pipeline, id: &str, text: &str) {
        pipeline
            .ingest_pages(id, &[Page::new(text, 1)])
            .await
            .unwrap();
        pipeline.vectorize_document(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_ingest_chunks_and_vectorizes() {
        let pipeline = pipeline();
        let chunked = pipeline
            .ingest_pages("doc", &[Page::new("Cats purr. Dogs bark.", 1)])
            .await
            .unwrap();
        assert_eq!(chunked.chunks, 1);
        assert_eq!(chunked.strategy, "token_window");

        let vectorized = pipeline.vectorize_document("doc").await.unwrap();
        assert_eq!(vectorized.vectors, 1);
        assert_eq!(vectorized.dimension, DIM);

        let rechunked = pipeline
            .chunk_document("doc", Some(ChunkingStrategy::SentenceWindow))
            .await
            .unwrap();
        assert_eq!(rechunked.strategy, "sentence_window");
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let err = pipeline().vectorize_document("nope").await.unwrap_err();
        let store = err.downcast_ref::<StoreError>().unwrap();
        assert!(store.is_not_found());
    }

    #[tokio::test]
    async fn test_end_to_end_query() {
        let pipeline = pipeline();
        ingest(&pipeline, "animals", "Cats purr softly. Dogs bark loudly.").await;
        ingest(&pipeline, "space", "Stars burn hydrogen. Planets orbit stars.").await;

        let observer = Counter::default();
        let summary = pipeline
            .rebuild_index(pipeline.try_begin_rebuild().unwrap(), &observer)
            .await
            .unwrap();
        assert_eq!(summary.collection, "chunks_a");
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.vectors, 2);
        assert_eq!(observer.0.load(Ordering::SeqCst), 2);

        let response = pipeline
            .query("Stars burn hydrogen. Planets orbit stars.", Some(1))
            .await
            .unwrap();
        assert_eq!(response.collection, "chunks_a");
        assert_eq!(response.results.len(), 1);
        let top = &response.results[0];
        assert_eq!(top.source_id, "space");
        assert_eq!(top.chunk_key, "chunk_1");
        assert_eq!(top.distance, Some(0.0));

        // With room for more, the neighbor of the hit comes back unscored.
        let response = pipeline
            .query("Stars burn hydrogen. Planets orbit stars.", Some(2))
            .await
            .unwrap();
        let ids: Vec<(GlobalId, bool)> = response
            .results
            .iter()
            .map(|r| (r.id, r.distance.is_some()))
            .collect();
        assert_eq!(ids, vec![(1, true), (0, false)]);
        assert_eq!(response.results[1].source_id, "animals");
    }

    #[tokio::test]
    async fn test_rebuild_alternates_collections() {
        let pipeline = pipeline();
        ingest(&pipeline, "doc", "Only one sentence here.").await;

        let first = pipeline
            .rebuild_index(pipeline.try_begin_rebuild().unwrap(), &())
            .await
            .unwrap();
        let second = pipeline
            .rebuild_index(pipeline.try_begin_rebuild().unwrap(), &())
            .await
            .unwrap();
        assert_eq!(first.collection, "chunks_a");
        assert_eq!(second.collection, "chunks_b");

        let summary = pipeline.index_summary().await.unwrap();
        assert_eq!(summary.collection.as_deref(), Some("chunks_b"));
        assert_eq!(summary.total_vectors, 1);
        assert_eq!(summary.documents[0].source_id, "doc");
        assert_eq!(pipeline.vectors.count_source("chunks_b", "doc").await.unwrap(), 1);
        assert_eq!(pipeline.vectors.count_source("chunks_b", "other").await.unwrap(), 0);
    }

    const EIGHT_SENTENCES: &str = "Alpha one. Beta two. Gamma three. Delta four. \
        Epsilon five. Zeta six. Eta seven. Theta eight.";

    #[tokio::test]
    async fn test_rechunking_drops_stale_vectors() {
        let pipeline = pipeline_with_dim(1024);
        ingest(&pipeline, "doc", EIGHT_SENTENCES).await;
        assert_eq!(pipeline.get_chunks("doc").await.unwrap().len(), 1);

        let rechunked = pipeline
            .chunk_document("doc", Some(ChunkingStrategy::SentenceWindow))
            .await
            .unwrap();
        assert_eq!(rechunked.chunks, 3);
        assert!(pipeline.documents.list_vectorized().await.unwrap().is_empty());

        pipeline.vectorize_document("doc").await.unwrap();
        pipeline
            .rebuild_index(pipeline.try_begin_rebuild().unwrap(), &())
            .await
            .unwrap();

        let summary = pipeline.index_summary().await.unwrap();
        assert_eq!(summary.documents[0].len, 3);

        let response = pipeline.query("Zeta six.", Some(1)).await.unwrap();
        assert_eq!(response.results[0].chunk_key, "chunk_2");
        assert!(response.results[0].chunk.text.contains("Zeta six."));
    }

    #[tokio::test]
    async fn test_rebuild_skips_vectors_that_do_not_match_chunks() {
        let pipeline = pipeline();
        ingest(&pipeline, "good", "Cats purr softly.").await;
        ingest(&pipeline, "stale", "Dogs bark loudly.").await;
        pipeline
            .documents
            .put_vectors("stale", &[vec![0.0; DIM], vec![0.0; DIM]])
            .await
            .unwrap();

        let summary = pipeline
            .rebuild_index(pipeline.try_begin_rebuild().unwrap(), &())
            .await
            .unwrap();
        assert_eq!(summary.documents, 1);
        assert_eq!(summary.vectors, 1);

        let index = pipeline.index_summary().await.unwrap();
        let indexed: Vec<&str> = index.documents.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(indexed, vec!["good"]);
    }

    #[tokio::test]
    async fn test_second_rebuild_is_refused() {
        let pipeline = pipeline();
        let permit = pipeline.try_begin_rebuild().unwrap();
        let err = pipeline.try_begin_rebuild().err().unwrap();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::RebuildInProgress)
        ));
        drop(permit);
        assert!(pipeline.try_begin_rebuild().is_ok());
    }

    #[tokio::test]
    async fn test_query_before_rebuild() {
        let pipeline = pipeline();
        let err = pipeline.query("anything", None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoActiveCollection)
        ));

        let summary = pipeline.index_summary().await.unwrap();
        assert!(summary.collection.is_none());
        assert_eq!(summary.total_vectors, 0);
    }

    #[tokio::test]
    async fn test_vectorizer_failure_is_typed() {
        let pipeline = Pipeline::new(
            &config(),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(FailingVectorizer),
        );
        pipeline
            .ingest_pages("doc", &[Page::new("Hello there.", 1)])
            .await
            .unwrap();
        let err = pipeline.vectorize_document("doc").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Vectorizer { backend: "failing", .. })
        ));
    }
}
