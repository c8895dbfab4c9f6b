// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::RecoverySettings;
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

/// Repairs crawl state left behind by crashed workers.
///
/// A lock older than the configured timeout can only mean the process that
/// held it died mid-crawl; no in-process watchdog touches running jobs.
pub struct RecoveryWorker {
    repo: Arc<dyn JobRepository>,
    lock_timeout: chrono::Duration,
    sweep_interval: Duration,
}

impl RecoveryWorker {
    pub fn new(repo: Arc<dyn JobRepository>, settings: &RecoverySettings) -> Self {
        Self {
            repo,
            lock_timeout: chrono::Duration::seconds(settings.lock_timeout_secs as i64),
            sweep_interval: Duration::from_secs(settings.sweep_interval_secs),
        }
    }

    /// One sweep. Returns the number of locks force-released.
    pub async fn run_once(&self) -> Result<u64, RepositoryError> {
        let count = self.repo.reset_stale_locks(self.lock_timeout).await?;
        if count > 0 {
            info!(count, "released stale crawl locks");
        }
        Ok(count)
    }

    /// Startup sweep followed by a periodic tick.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            // The first tick fires immediately; that is the startup sweep.
            let mut ticker = interval(self.sweep_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    error!(error = %e, "recovery sweep failed");
                }
            }
        })
    }
}
