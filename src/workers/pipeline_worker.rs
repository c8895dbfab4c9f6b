// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::pipeline::runner::PipelineRunner;
use crate::queue::job_queue::QueuedJob;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Single consumer of the job queue.
///
/// One job runs fully to completion before the next is taken; crawl,
/// extraction and finalization mutate per-target lock state that is not safe
/// for overlapping runs against the same DNO.
pub struct PipelineWorker {
    runner: Arc<PipelineRunner>,
    worker_id: Uuid,
}

impl PipelineWorker {
    pub fn new(runner: Arc<PipelineRunner>) -> Self {
        Self {
            runner,
            worker_id: Uuid::new_v4(),
        }
    }

    #[instrument(skip(self, rx), fields(worker_id = %self.worker_id))]
    pub async fn run(&self, mut rx: mpsc::Receiver<QueuedJob>) {
        info!("pipeline worker started");

        while let Some(queued) = rx.recv().await {
            match self.runner.run(queued.job_id).await {
                Ok(outcome) => {
                    info!(
                        job_id = %queued.job_id,
                        status = %outcome.status,
                        message = %outcome.message,
                        "job finished"
                    );
                }
                Err(e) => {
                    error!(job_id = %queued.job_id, error = %e, "job processing failed");
                }
            }
        }

        info!("job queue closed, pipeline worker stopping");
    }
}
