// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Queue error type.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The consuming worker is gone.
    #[error("Queue closed")]
    Closed,
}

/// A job handed to the pipeline worker.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: Uuid,
}

/// Job queue seam. Whole-job retry policy, if any, lives at this layer, not
/// in the pipeline.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn submit(&self, job: QueuedJob) -> Result<(), QueueError>;
}

/// In-process queue feeding the single pipeline worker.
///
/// The receiver half goes to exactly one worker, which processes one job to
/// completion before taking the next — the system-wide pipeline concurrency
/// limit of one is enforced by construction.
pub struct InProcessJobQueue {
    tx: mpsc::Sender<QueuedJob>,
}

impl InProcessJobQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueuedJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl JobQueue for InProcessJobQueue {
    async fn submit(&self, job: QueuedJob) -> Result<(), QueueError> {
        self.tx.send(job).await.map_err(|_| QueueError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_and_receive() {
        let (queue, mut rx) = InProcessJobQueue::new(4);
        let job_id = Uuid::new_v4();
        queue.submit(QueuedJob { job_id }).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.job_id, job_id);
    }

    #[tokio::test]
    async fn test_submit_after_receiver_dropped() {
        let (queue, rx) = InProcessJobQueue::new(4);
        drop(rx);
        let result = queue.submit(QueuedJob { job_id: Uuid::new_v4() }).await;
        assert!(matches!(result, Err(QueueError::Closed)));
    }
}
