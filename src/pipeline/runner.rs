// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{CrawlJob, CrawlJobStep, JobStatus};
use crate::domain::repositories::job_repository::RepositoryError;
use crate::pipeline::{steps, StepDeps, StepError};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// One pipeline step. All steps share this interface; there is no
/// inheritance hierarchy, the runner provides the instrument/persist/fail
/// wrapper for every implementation uniformly.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Execute against the job. Steps communicate exclusively through the
    /// job's context bag and must not assume keys exist.
    async fn run(&self, job: &mut CrawlJob, deps: &StepDeps) -> Result<String, StepError>;
}

/// Terminal status of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub status: JobStatus,
    pub message: String,
}

/// Drives an ordered list of steps against a durable job record.
///
/// Per step: advance `current_step`, append a Running audit record, execute,
/// then either mark the record Done and advance progress, or roll back the
/// step's uncommitted context writes, mark the record Failed, fail the whole
/// job with a composed message and stop. Steps are strictly sequential and
/// never retried here; retries live inside individual network operations.
pub struct PipelineRunner {
    steps: Vec<Box<dyn PipelineStep>>,
    deps: StepDeps,
}

impl PipelineRunner {
    pub fn new(steps: Vec<Box<dyn PipelineStep>>, deps: StepDeps) -> Self {
        Self { steps, deps }
    }

    /// Runner with the standard eight-step sequence.
    pub fn standard(deps: StepDeps) -> Self {
        Self::new(steps::standard_steps(), deps)
    }

    /// Run the pipeline for a job to completion.
    ///
    /// The per-DNO crawl lock is acquired before the first step and released
    /// on every exit path: success, failure, cancellation and persistence
    /// faults alike.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn run(&self, job_id: Uuid) -> Result<PipelineOutcome, RepositoryError> {
        let mut job = self.deps.repo.load_job(job_id).await?;

        if !self.deps.repo.acquire_lock(job.dno_id).await? {
            let message = "crawl already in progress for this target".to_string();
            warn!(dno_id = %job.dno_id, "{}", message);
            job.fail(message.clone());
            self.deps.repo.save_job(&job).await?;
            return Ok(PipelineOutcome {
                status: JobStatus::Failed,
                message,
            });
        }

        let result = self.run_locked(&mut job).await;

        if let Err(e) = self.deps.repo.release_lock(job.dno_id).await {
            error!(dno_id = %job.dno_id, error = %e, "failed to release crawl lock");
        }

        result
    }

    async fn run_locked(&self, job: &mut CrawlJob) -> Result<PipelineOutcome, RepositoryError> {
        if job.start().is_err() {
            let message = format!("job is not runnable from status '{}'", job.status);
            job.fail(message.clone());
            self.deps.repo.save_job(job).await?;
            return Ok(PipelineOutcome {
                status: JobStatus::Failed,
                message,
            });
        }
        self.deps.repo.save_job(job).await?;

        let total = self.steps.len();
        for (index, step) in self.steps.iter().enumerate() {
            // Cancellation is observed between steps, never mid-step.
            if let Ok(latest) = self.deps.repo.load_job(job.id).await {
                if latest.status == JobStatus::Cancelled {
                    info!(step = step.name(), "job cancelled, aborting pipeline");
                    job.status = JobStatus::Cancelled;
                    job.completed_at = Some(Utc::now());
                    job.updated_at = Utc::now();
                    self.deps.repo.save_job(job).await?;
                    return Ok(PipelineOutcome {
                        status: JobStatus::Cancelled,
                        message: "job cancelled".to_string(),
                    });
                }
            }

            job.current_step = Some(step.name().to_string());
            self.deps.repo.save_job(job).await?;

            let mut record = CrawlJobStep::started(job.id, step.name());
            self.deps.repo.append_step(&record).await?;

            let context_snapshot = job.context.clone();
            let started = Instant::now();
            info!(step = step.name(), "running pipeline step");

            match step.run(job, &self.deps).await {
                Ok(message) => {
                    record.finish_done(started.elapsed().as_secs_f64(), Some(message));
                    self.deps.repo.update_step(&record).await?;

                    job.progress = (((index + 1) * 100) / total) as u8;
                    self.deps.repo.save_job(job).await?;
                }
                Err(err) => {
                    // Uncommitted step-local writes are rolled back before
                    // the failure is recorded; the audit trail for this step
                    // reflects only the failure.
                    job.context = context_snapshot;
                    record.finish_failed(started.elapsed().as_secs_f64(), err.to_string());
                    self.deps.repo.update_step(&record).await?;

                    let message = format!("Step '{}' failed: {}", step.name(), err);
                    error!(step = step.name(), error = %err, "pipeline step failed");
                    job.fail(message.clone());
                    self.deps.repo.save_job(job).await?;
                    return Ok(PipelineOutcome {
                        status: JobStatus::Failed,
                        message,
                    });
                }
            }
        }

        job.complete()
            .map_err(|e| RepositoryError::Internal(e.to_string()))?;
        self.deps.repo.save_job(job).await?;
        info!("pipeline completed");
        Ok(PipelineOutcome {
            status: JobStatus::Completed,
            message: "pipeline completed".to_string(),
        })
    }
}
