// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{CrawlJob, CrawlJobStep, JobStatus};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, CrawlJob>,
    steps: Vec<CrawlJobStep>,
    locks: HashMap<Uuid, DateTime<Utc>>,
}

/// In-memory [`JobRepository`] used by tests and the demo binary.
///
/// Lock state mirrors what a database-backed implementation would keep on
/// the DNO row: a crawl-in-progress flag with its acquisition timestamp.
#[derive(Default)]
pub struct InMemoryJobRepository {
    inner: Mutex<Inner>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a job, e.g. before handing its id to the pipeline.
    pub fn insert_job(&self, job: CrawlJob) {
        self.inner.lock().jobs.insert(job.id, job);
    }

    /// Whether a DNO currently holds a crawl lock.
    pub fn is_locked(&self, dno_id: Uuid) -> bool {
        self.inner.lock().locks.contains_key(&dno_id)
    }

    /// Backdate or plant a lock; recovery tests use this to simulate a
    /// crashed worker.
    pub fn force_lock(&self, dno_id: Uuid, locked_at: DateTime<Utc>) {
        self.inner.lock().locks.insert(dno_id, locked_at);
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn load_job(&self, id: Uuid) -> Result<CrawlJob, RepositoryError> {
        self.inner
            .lock()
            .jobs
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_job(&self, job: &CrawlJob) -> Result<(), RepositoryError> {
        self.inner.lock().jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn append_step(&self, step: &CrawlJobStep) -> Result<(), RepositoryError> {
        self.inner.lock().steps.push(step.clone());
        Ok(())
    }

    async fn update_step(&self, step: &CrawlJobStep) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock();
        match inner.steps.iter_mut().find(|s| s.id == step.id) {
            Some(existing) => {
                *existing = step.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn steps_for_job(&self, job_id: Uuid) -> Result<Vec<CrawlJobStep>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .steps
            .iter()
            .filter(|s| s.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn acquire_lock(&self, dno_id: Uuid) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock();
        if inner.locks.contains_key(&dno_id) {
            return Ok(false);
        }
        inner.locks.insert(dno_id, Utc::now());
        Ok(true)
    }

    async fn release_lock(&self, dno_id: Uuid) -> Result<(), RepositoryError> {
        self.inner.lock().locks.remove(&dno_id);
        Ok(())
    }

    async fn reset_stale_locks(
        &self,
        older_than: chrono::Duration,
    ) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - older_than;
        let mut inner = self.inner.lock();

        let stale: Vec<Uuid> = inner
            .locks
            .iter()
            .filter(|(_, locked_at)| **locked_at < cutoff)
            .map(|(dno_id, _)| *dno_id)
            .collect();

        for dno_id in &stale {
            inner.locks.remove(dno_id);
            for job in inner.jobs.values_mut() {
                if job.dno_id == *dno_id && job.status == JobStatus::Running {
                    job.fail("crawl lock recovered after worker crash");
                }
            }
        }

        Ok(stale.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::document::DataType;

    fn job(dno_id: Uuid) -> CrawlJob {
        CrawlJob::new(dno_id, "https://dno.de", DataType::Netzentgelte, Some(2025))
    }

    #[tokio::test]
    async fn test_job_round_trip() {
        let repo = InMemoryJobRepository::new();
        let j = job(Uuid::new_v4());
        let id = j.id;
        repo.save_job(&j).await.unwrap();

        let loaded = repo.load_job(id).await.unwrap();
        assert_eq!(loaded.website, "https://dno.de");

        assert!(matches!(
            repo.load_job(Uuid::new_v4()).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let repo = InMemoryJobRepository::new();
        let dno = Uuid::new_v4();

        assert!(repo.acquire_lock(dno).await.unwrap());
        assert!(!repo.acquire_lock(dno).await.unwrap());

        repo.release_lock(dno).await.unwrap();
        assert!(repo.acquire_lock(dno).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_lock_is_reset_and_job_failed() {
        let repo = InMemoryJobRepository::new();
        let dno = Uuid::new_v4();
        let mut j = job(dno);
        j.start().unwrap();
        repo.save_job(&j).await.unwrap();
        repo.force_lock(dno, Utc::now() - chrono::Duration::hours(2));

        let count = repo
            .reset_stale_locks(chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(!repo.is_locked(dno));

        let recovered = repo.load_job(j.id).await.unwrap();
        assert_eq!(recovered.status, JobStatus::Failed);
        assert!(recovered.error_message.unwrap().contains("recovered"));
    }

    #[tokio::test]
    async fn test_fresh_lock_survives_sweep() {
        let repo = InMemoryJobRepository::new();
        let dno = Uuid::new_v4();
        assert!(repo.acquire_lock(dno).await.unwrap());

        let count = repo
            .reset_stale_locks(chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(repo.is_locked(dno));
    }

    #[tokio::test]
    async fn test_step_records_append_and_update() {
        let repo = InMemoryJobRepository::new();
        let job_id = Uuid::new_v4();
        let mut record = CrawlJobStep::started(job_id, "discover");
        repo.append_step(&record).await.unwrap();

        record.finish_done(0.2, Some("3 candidates".into()));
        repo.update_step(&record).await.unwrap();

        let steps = repo.steps_for_job(job_id).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].details.as_deref(), Some("3 candidates"));
    }
}
