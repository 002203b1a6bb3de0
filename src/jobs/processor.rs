//! Job processor for background index rebuilds.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use super::store::JobStore;
use crate::pipeline::{Pipeline, RebuildObserver, RebuildProgress};
use crate::types::JobKind;

/// Writes rebuild progress into the job store.
struct JobProgress {
    job_id: Uuid,
    job_store: Arc<RwLock<JobStore>>,
}

#[async_trait]
impl RebuildObserver for JobProgress {
    async fn progress(&self, progress: RebuildProgress) {
        let mut store = self.job_store.write().await;
        store.update_job_progress(self.job_id, progress);
    }
}

/// Runs pipeline jobs in the background.
#[derive(Clone)]
pub struct JobProcessor {
    pipeline: Arc<Pipeline>,
    job_store: Arc<RwLock<JobStore>>,
}

impl JobProcessor {
    pub fn new(pipeline: Arc<Pipeline>, job_store: Arc<RwLock<JobStore>>) -> Self {
        Self {
            pipeline,
            job_store,
        }
    }

    pub fn job_store(&self) -> &Arc<RwLock<JobStore>> {
        &self.job_store
    }

    /// Start an index rebuild and return its job ID.
    ///
    /// Fails right away if another rebuild holds the lock.
    pub async fn start_rebuild(&self) -> Result<Uuid> {
        let permit = self.pipeline.try_begin_rebuild()?;

        let job_id = {
            let mut store = self.job_store.write().await;
            let job_id = store.create_job(JobKind::RebuildIndex);
            store.start_job(job_id);
            job_id
        };
        info!(job_id = %job_id, "Starting index rebuild");

        let pipeline = self.pipeline.clone();
        let job_store = self.job_store.clone();
        tokio::spawn(async move {
            let observer = JobProgress {
                job_id,
                job_store: job_store.clone(),
            };
            let result = pipeline.rebuild_index(permit, &observer).await;

            let mut store = job_store.write().await;
            match result {
                Ok(summary) => {
                    info!(
                        job_id = %job_id,
                        collection = %summary.collection,
                        documents = summary.documents,
                        vectors = summary.vectors,
                        "Index rebuild complete"
                    );
                    store.complete_job(job_id);
                }
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Index rebuild failed");
                    store.fail_job(job_id, format!("{e:#}"));
                }
            }
        });

        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::storage::{MemoryBlobStore, MemoryVectorStore};
    use crate::types::{JobStatus, Page, ServiceConfig};
    use crate::vectorize::HashingVectorizer;

    fn processor() -> (JobProcessor, Arc<Pipeline>) {
        let config = ServiceConfig {
            hashing_dim: 16,
            vector_dim: 16,
            ..Default::default()
        };
        let pipeline = Arc::new(Pipeline::new(
            &config,
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(HashingVectorizer::new(16).unwrap()),
        ));
        let processor = JobProcessor::new(pipeline.clone(), Arc::new(RwLock::new(JobStore::new())));
        (processor, pipeline)
    }

    async fn wait_until_finished(processor: &JobProcessor, job_id: Uuid) -> JobStatus {
        for _ in 0..100 {
            let status = processor
                .job_store()
                .read()
                .await
                .get_job_status(job_id)
                .map(|s| s.status);
            match status {
                Some(done @ (JobStatus::Completed | JobStatus::Failed)) => return done,
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
        panic!("job {job_id} did not finish");
    }

    #[tokio::test]
    async fn test_rebuild_job_completes() {
        let (processor, pipeline) = processor();
        pipeline
            .ingest_pages("doc", &[Page::new("One sentence. Another one.", 1)])
            .await
            .unwrap();
        pipeline.vectorize_document("doc").await.unwrap();

        let job_id = processor.start_rebuild().await.unwrap();
        assert_eq!(wait_until_finished(&processor, job_id).await, JobStatus::Completed);

        let status = processor
            .job_store()
            .read()
            .await
            .get_job_status(job_id)
            .unwrap();
        assert_eq!(status.total_documents, 1);
        assert_eq!(status.processed_documents, 1);
        assert_eq!(status.collection.as_deref(), Some("chunks_a"));
    }

    #[tokio::test]
    async fn test_rebuild_refused_while_running() {
        let (processor, pipeline) = processor();
        let _permit = pipeline.try_begin_rebuild().unwrap();
        assert!(processor.start_rebuild().await.is_err());
    }
}
