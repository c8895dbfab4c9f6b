// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use netzscout::config::settings::Settings;
use netzscout::domain::models::document::DataType;
use netzscout::domain::models::job::CrawlJob;
use netzscout::domain::repositories::job_repository::JobRepository;
use netzscout::domain::repositories::storage_repository::StorageRepository;
use netzscout::domain::services::bfs_crawler::BfsCrawler;
use netzscout::domain::services::content_verifier::ContentVerifier;
use netzscout::domain::services::discovery_manager::DiscoveryManager;
use netzscout::domain::services::extraction::{BasicTableExtractor, TariffExtractor};
use netzscout::domain::services::sitemap::SitemapDiscovery;
use netzscout::engines::reqwest_engine::ReqwestEngine;
use netzscout::engines::traits::FetchEngine;
use netzscout::infrastructure::repositories::memory_job_repo::InMemoryJobRepository;
use netzscout::infrastructure::storage::local::LocalStorage;
use netzscout::pipeline::runner::PipelineRunner;
use netzscout::pipeline::StepDeps;
use netzscout::queue::job_queue::{InProcessJobQueue, JobQueue, QueuedJob};
use netzscout::utils::politeness::HostLimiter;
use netzscout::utils::robots::{RobotsChecker, RobotsCheckerTrait};
use netzscout::utils::telemetry;
use netzscout::workers::pipeline_worker::PipelineWorker;
use netzscout::workers::recovery_worker::RecoveryWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting netzscout...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Build the fetch stack
    let engine: Arc<dyn FetchEngine> = Arc::new(ReqwestEngine::new(&settings.http)?);
    let robots: Arc<dyn RobotsCheckerTrait> = Arc::new(RobotsChecker::new(
        engine.clone(),
        Duration::from_secs(settings.http.robots_timeout_secs),
    ));
    let limiter = Arc::new(HostLimiter::new(Duration::from_millis(
        settings.crawler.politeness_delay_ms,
    )));

    // 4. Discovery services
    let crawler = BfsCrawler::new(
        engine.clone(),
        robots.clone(),
        limiter.clone(),
        settings.crawler.clone(),
        settings.http.user_agent.clone(),
        settings.retry.policy(),
    );
    let sitemap = SitemapDiscovery::new(engine.clone(), &settings.discovery);
    let discovery = Arc::new(DiscoveryManager::new(
        sitemap,
        crawler,
        settings.discovery.clone(),
    ));
    let verifier = Arc::new(ContentVerifier::new(engine.clone(), &settings.verification));

    // 5. Persistence and extraction collaborators
    let repo: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let storage: Arc<dyn StorageRepository> =
        Arc::new(LocalStorage::new(settings.storage.local_path.clone()));
    let extractor: Arc<dyn TariffExtractor> = Arc::new(BasicTableExtractor);

    // 6. Recovery sweep: once at startup, then periodically
    let recovery = RecoveryWorker::new(repo.clone(), &settings.recovery);
    let recovery_handle = recovery.start();

    // 7. Pipeline runner and the single worker
    let deps = StepDeps {
        repo: repo.clone(),
        discovery,
        verifier,
        engine,
        storage,
        extractor,
        settings: settings.clone(),
    };
    let runner = Arc::new(PipelineRunner::standard(deps));
    let (queue, rx) = InProcessJobQueue::new(16);
    let worker = PipelineWorker::new(runner);
    let worker_handle = tokio::spawn(async move {
        worker.run(rx).await;
    });

    // 8. Optionally seed one job from the environment
    if let Ok(website) = std::env::var("NETZSCOUT_SEED_WEBSITE") {
        let data_type = std::env::var("NETZSCOUT_SEED_DATA_TYPE")
            .ok()
            .and_then(|s| s.parse::<DataType>().ok())
            .unwrap_or(DataType::Netzentgelte);
        let target_year = std::env::var("NETZSCOUT_SEED_YEAR")
            .ok()
            .and_then(|s| s.parse::<i32>().ok());

        let job = CrawlJob::new(Uuid::new_v4(), website, data_type, target_year);
        info!(job_id = %job.id, data_type = %data_type, "enqueueing seed job");
        repo.save_job(&job).await?;
        queue.submit(QueuedJob { job_id: job.id }).await?;
    }

    // 9. Run until shutdown
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }

    info!("Shutting down workers...");
    recovery_handle.abort();
    worker_handle.abort();
    info!("Workers shut down successfully");

    Ok(())
}
