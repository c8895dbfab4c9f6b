// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use netzscout::config::settings::Settings;
use netzscout::domain::models::document::DataType;
use netzscout::domain::models::job::{CrawlJob, JobStatus, StepStatus};
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
use netzscout::pipeline::runner::{PipelineRunner, PipelineStep};
use netzscout::pipeline::steps::keys;
use netzscout::pipeline::{StepDeps, StepError};
use netzscout::utils::politeness::HostLimiter;
use netzscout::utils::robots::{RobotsChecker, RobotsCheckerTrait};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HLZF_PAGE: &str = r#"<html><body>
  <h1>Hochlastzeitfenster für atypische Netznutzung</h1>
  <p>Gültig ab 01.01.2025</p>
  <table>
    <tr><th>Jahreszeit</th><th>Zeitfenster</th></tr>
    <tr><td>Winter</td><td>16:00 - 20:00 Uhr</td></tr>
    <tr><td>Sommer</td><td>keine</td></tr>
    <tr><td>Übergangszeit</td><td>17:00 - 19:00 Uhr</td></tr>
  </table>
</body></html>"#;

struct TestHarness {
    repo: Arc<InMemoryJobRepository>,
    runner: PipelineRunner,
    _storage_dir: tempfile::TempDir,
}

fn test_settings() -> Settings {
    let mut settings = Settings::new().expect("default settings");
    settings.crawler.politeness_delay_ms = 0;
    settings.crawler.max_depth = 2;
    settings.crawler.max_pages = 20;
    settings.crawler.min_content_length = 30;
    settings.retry.base_delay_ms = 10;
    settings.retry.max_delay_ms = 50;
    settings
}

fn build_harness(custom_steps: Option<Vec<Box<dyn PipelineStep>>>) -> TestHarness {
    std::env::set_var("NETZSCOUT_DISABLE_SSRF_PROTECTION", "true");

    let settings = Arc::new(test_settings());
    let engine: Arc<dyn FetchEngine> =
        Arc::new(ReqwestEngine::new(&settings.http).expect("client"));
    let robots: Arc<dyn RobotsCheckerTrait> =
        Arc::new(RobotsChecker::new(engine.clone(), Duration::from_secs(2)));
    let limiter = Arc::new(HostLimiter::new(Duration::ZERO));

    let crawler = BfsCrawler::new(
        engine.clone(),
        robots,
        limiter,
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

    let storage_dir = tempfile::tempdir().expect("tempdir");
    let storage: Arc<dyn StorageRepository> = Arc::new(LocalStorage::new(storage_dir.path()));
    let repo = Arc::new(InMemoryJobRepository::new());
    let extractor: Arc<dyn TariffExtractor> = Arc::new(BasicTableExtractor);

    let deps = StepDeps {
        repo: repo.clone(),
        discovery,
        verifier,
        engine,
        storage,
        extractor,
        settings,
    };
    let runner = match custom_steps {
        Some(steps) => PipelineRunner::new(steps, deps),
        None => PipelineRunner::standard(deps),
    };

    TestHarness {
        repo,
        runner,
        _storage_dir: storage_dir,
    }
}

async fn mount_hlzf_site(server: &MockServer) {
    let sitemap_body = format!(
        r#"<?xml version="1.0"?>
        <urlset>
          <url><loc>{0}/netz/hochlastzeitfenster-2025.html</loc></url>
        </urlset>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_body))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/netz/hochlastzeitfenster-2025.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(HLZF_PAGE),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn pipeline_runs_to_completion_for_hlzf_site() {
    let server = MockServer::start().await;
    mount_hlzf_site(&server).await;

    let harness = build_harness(None);
    let job = CrawlJob::new(Uuid::new_v4(), server.uri(), DataType::Hlzf, Some(2025));
    let job_id = job.id;
    let dno_id = job.dno_id;
    harness.repo.insert_job(job);

    let outcome = harness.runner.run(job_id).await.expect("pipeline run");
    assert_eq!(outcome.status, JobStatus::Completed);

    let finished = harness.repo.load_job(job_id).await.unwrap();
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.progress, 100);
    assert!(finished.error_message.is_none());
    assert!(finished.completed_at.is_some());

    // Context carries the full trail.
    assert_eq!(finished.context_str(keys::STRATEGY), Some("sitemap"));
    assert!(finished
        .context_str(keys::SELECTED_URL)
        .unwrap()
        .ends_with("/netz/hochlastzeitfenster-2025.html"));
    let file = finished.context_str(keys::DOWNLOADED_FILE).unwrap();
    assert!(file.ends_with("hochlastzeitfenster-2025.html"));
    assert_eq!(finished.context_str(keys::FILE_SHA256).unwrap().len(), 64);
    assert_eq!(
        finished
            .context_value(keys::IS_VALID)
            .and_then(|v| v.as_bool()),
        Some(true)
    );
    assert!(std::path::Path::new(file).exists());

    // One Done audit record per step, in order.
    let steps = harness.repo.steps_for_job(job_id).await.unwrap();
    let names: Vec<&str> = steps.iter().map(|s| s.step_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "strategize",
            "search",
            "discover",
            "download",
            "verify",
            "extract",
            "validate",
            "finalize"
        ]
    );
    assert!(steps.iter().all(|s| s.status == StepStatus::Done));
    assert!(steps.iter().all(|s| s.duration_seconds.is_some()));

    // Lock released on the success path.
    assert!(!harness.repo.is_locked(dno_id));
}

#[tokio::test]
async fn failing_discovery_marks_job_failed_with_step_label() {
    // Nothing mounted: no sitemap, no pages, no documents.
    let server = MockServer::start().await;

    let harness = build_harness(None);
    let job = CrawlJob::new(
        Uuid::new_v4(),
        server.uri(),
        DataType::Netzentgelte,
        Some(2025),
    );
    let job_id = job.id;
    let dno_id = job.dno_id;
    harness.repo.insert_job(job);

    let outcome = harness.runner.run(job_id).await.expect("pipeline run");
    assert_eq!(outcome.status, JobStatus::Failed);

    let failed = harness.repo.load_job(job_id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    let message = failed.error_message.expect("error message");
    assert!(
        message.contains("Step 'discover' failed"),
        "message was: {}",
        message
    );
    assert!(message.contains("no document found"));

    // Progress stays where the last successful step left it: 2 of 8.
    assert_eq!(failed.progress, 25);

    let steps = harness.repo.steps_for_job(job_id).await.unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].status, StepStatus::Done);
    assert_eq!(steps[1].status, StepStatus::Done);
    assert_eq!(steps[2].status, StepStatus::Failed);
    assert_eq!(steps[2].step_name, "discover");

    // Lock released on the failure path too.
    assert!(!harness.repo.is_locked(dno_id));
}

#[tokio::test]
async fn held_lock_fails_job_without_stealing_the_lock() {
    let server = MockServer::start().await;
    let harness = build_harness(None);

    let job = CrawlJob::new(Uuid::new_v4(), server.uri(), DataType::Hlzf, Some(2025));
    let job_id = job.id;
    let dno_id = job.dno_id;
    harness.repo.insert_job(job);

    assert!(harness.repo.acquire_lock(dno_id).await.unwrap());

    let outcome = harness.runner.run(job_id).await.expect("pipeline run");
    assert_eq!(outcome.status, JobStatus::Failed);
    assert!(outcome.message.contains("already in progress"));

    // The competing crawl still owns its lock.
    assert!(harness.repo.is_locked(dno_id));

    let failed = harness.repo.load_job(job_id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    let steps = harness.repo.steps_for_job(job_id).await.unwrap();
    assert!(steps.is_empty(), "no step may run without the lock");
}

/// Simulates an external cancellation arriving while a step is running.
struct CancelInjectStep;

#[async_trait]
impl PipelineStep for CancelInjectStep {
    fn name(&self) -> &'static str {
        "cancel-inject"
    }

    async fn run(&self, job: &mut CrawlJob, deps: &StepDeps) -> Result<String, StepError> {
        let mut latest = deps
            .repo
            .load_job(job.id)
            .await
            .map_err(|e| StepError::Other(e.to_string()))?;
        latest
            .cancel()
            .map_err(|e| StepError::Other(e.to_string()))?;
        deps.repo
            .save_job(&latest)
            .await
            .map_err(|e| StepError::Other(e.to_string()))?;
        Ok("requested cancellation".to_string())
    }
}

/// Must never run after a cancellation.
struct UnreachableStep;

#[async_trait]
impl PipelineStep for UnreachableStep {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    async fn run(&self, _job: &mut CrawlJob, _deps: &StepDeps) -> Result<String, StepError> {
        panic!("step must not run after cancellation");
    }
}

#[tokio::test]
async fn cancellation_is_observed_between_steps() {
    let server = MockServer::start().await;
    let harness = build_harness(Some(vec![
        Box::new(CancelInjectStep),
        Box::new(UnreachableStep),
    ]));

    let job = CrawlJob::new(Uuid::new_v4(), server.uri(), DataType::Hlzf, Some(2025));
    let job_id = job.id;
    let dno_id = job.dno_id;
    harness.repo.insert_job(job);

    let outcome = harness.runner.run(job_id).await.expect("pipeline run");
    assert_eq!(outcome.status, JobStatus::Cancelled);

    let cancelled = harness.repo.load_job(job_id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);

    let steps = harness.repo.steps_for_job(job_id).await.unwrap();
    assert_eq!(steps.len(), 1, "only the injecting step may have run");
    assert_eq!(steps[0].step_name, "cancel-inject");

    assert!(!harness.repo.is_locked(dno_id));
}

/// Writes into the context, then fails.
struct PoisonContextStep;

#[async_trait]
impl PipelineStep for PoisonContextStep {
    fn name(&self) -> &'static str {
        "poison"
    }

    async fn run(&self, job: &mut CrawlJob, _deps: &StepDeps) -> Result<String, StepError> {
        job.set_context("partial_write", serde_json::json!("must not survive"));
        Err(StepError::Other("deliberate failure".to_string()))
    }
}

#[tokio::test]
async fn failed_step_context_writes_are_rolled_back() {
    let server = MockServer::start().await;
    let harness = build_harness(Some(vec![Box::new(PoisonContextStep)]));

    let job = CrawlJob::new(Uuid::new_v4(), server.uri(), DataType::Hlzf, Some(2025));
    let job_id = job.id;
    harness.repo.insert_job(job);

    let outcome = harness.runner.run(job_id).await.expect("pipeline run");
    assert_eq!(outcome.status, JobStatus::Failed);

    let failed = harness.repo.load_job(job_id).await.unwrap();
    assert!(
        failed.context_value("partial_write").is_none(),
        "uncommitted step writes must be rolled back"
    );
    assert!(failed
        .error_message
        .unwrap()
        .contains("Step 'poison' failed: deliberate failure"));
}
