//! Job store for tracking background job status.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::pipeline::RebuildProgress;
use crate::types::{JobKind, JobStatus, JobStatusResponse};

/// In-memory job store.
pub struct JobStore {
    jobs: HashMap<Uuid, JobRecord>,
}

/// Internal record for tracking a job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub total_documents: usize,
    pub processed_documents: usize,
    pub vectors_indexed: usize,
    pub collection: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a new job record.
    pub fn new(job_id: Uuid, kind: JobKind) -> Self {
        Self {
            job_id,
            kind,
            status: JobStatus::Pending,
            total_documents: 0,
            processed_documents: 0,
            vectors_indexed: 0,
            collection: None,
            error: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Mark the job as started.
    pub fn start(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Update progress.
    pub fn update_progress(&mut self, progress: RebuildProgress) {
        self.collection = Some(progress.collection);
        self.total_documents = progress.total_documents;
        self.processed_documents = progress.processed_documents;
        self.vectors_indexed = progress.vectors_indexed;
    }

    /// Mark the job as completed.
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the job as failed.
    pub fn fail(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    /// Convert to response type.
    pub fn to_response(&self) -> JobStatusResponse {
        JobStatusResponse {
            job_id: self.job_id,
            kind: self.kind,
            status: self.status,
            total_documents: self.total_documents,
            processed_documents: self.processed_documents,
            vectors_indexed: self.vectors_indexed,
            collection: self.collection.clone(),
            error: self.error.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

impl JobStore {
    /// Create a new job store.
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }

    /// Create a new job and return its ID.
    pub fn create_job(&mut self, kind: JobKind) -> Uuid {
        let job_id = Uuid::new_v4();
        self.jobs.insert(job_id, JobRecord::new(job_id, kind));
        job_id
    }

    /// Get a job by ID.
    pub fn get_job(&self, job_id: Uuid) -> Option<&JobRecord> {
        self.jobs.get(&job_id)
    }

    /// Start a job.
    pub fn start_job(&mut self, job_id: Uuid) -> bool {
        self.with_job(job_id, JobRecord::start)
    }

    /// Update job progress.
    pub fn update_job_progress(&mut self, job_id: Uuid, progress: RebuildProgress) -> bool {
        self.with_job(job_id, |job| job.update_progress(progress))
    }

    /// Complete a job.
    pub fn complete_job(&mut self, job_id: Uuid) -> bool {
        self.with_job(job_id, JobRecord::complete)
    }

    /// Fail a job.
    pub fn fail_job(&mut self, job_id: Uuid, error: String) -> bool {
        self.with_job(job_id, |job| job.fail(error))
    }

    fn with_job(&mut self, job_id: Uuid, f: impl FnOnce(&mut JobRecord)) -> bool {
        match self.jobs.get_mut(&job_id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// Get job status as response.
    pub fn get_job_status(&self, job_id: Uuid) -> Option<JobStatusResponse> {
        self.jobs.get(&job_id).map(|j| j.to_response())
    }

    /// Clean up finished jobs older than one hour.
    pub fn cleanup_old_jobs(&mut self) {
        let cutoff = Utc::now() - chrono::Duration::hours(1);
        self.jobs.retain(|_, job| {
            !job.is_finished() || job.completed_at.map_or(true, |t| t > cutoff)
        });
    }

    /// Get count of jobs by status.
    pub fn get_job_counts(&self) -> HashMap<JobStatus, usize> {
        let mut counts = HashMap::new();
        for job in self.jobs.values() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
