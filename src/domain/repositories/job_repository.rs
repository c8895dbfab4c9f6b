// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{CrawlJob, CrawlJobStep};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Repository error type.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Persistence seam for jobs, step audit records and per-DNO crawl locks.
///
/// The pipeline never issues raw queries; everything goes through these
/// operations so the storage backend can be swapped.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Load a job by id.
    async fn load_job(&self, id: Uuid) -> Result<CrawlJob, RepositoryError>;

    /// Persist the current state of a job.
    async fn save_job(&self, job: &CrawlJob) -> Result<(), RepositoryError>;

    /// Append a step audit record. The log is append-only.
    async fn append_step(&self, step: &CrawlJobStep) -> Result<(), RepositoryError>;

    /// Update a previously appended step record (running → done/failed).
    async fn update_step(&self, step: &CrawlJobStep) -> Result<(), RepositoryError>;

    /// Step records of a job, in append order.
    async fn steps_for_job(&self, job_id: Uuid) -> Result<Vec<CrawlJobStep>, RepositoryError>;

    /// Try to take the crawl lock for a DNO. Returns false when another
    /// crawl currently holds it.
    async fn acquire_lock(&self, dno_id: Uuid) -> Result<bool, RepositoryError>;

    /// Release the crawl lock for a DNO. Releasing an unheld lock is a
    /// no-op.
    async fn release_lock(&self, dno_id: Uuid) -> Result<(), RepositoryError>;

    /// Force-release locks older than `older_than` and fail their running
    /// jobs. Returns the number of locks released. The compensation path
    /// for crashed workers.
    async fn reset_stale_locks(&self, older_than: chrono::Duration) -> Result<u64, RepositoryError>;
}
