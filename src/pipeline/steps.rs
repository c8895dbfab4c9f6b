// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::{DataType, DiscoveryStrategy};
use crate::domain::models::job::CrawlJob;
use crate::domain::services::discovery_manager::DiscoveryRequest;
use crate::engines::traits::{fetch_with_retry, FetchRequest};
use crate::pipeline::runner::PipelineStep;
use crate::pipeline::{StepDeps, StepError};
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Context keys written and read by the steps.
pub mod keys {
    pub const STRATEGY: &str = "strategy";
    pub const SEARCH_QUERIES: &str = "search_queries";
    pub const DISCOVERY: &str = "discovery";
    pub const CANDIDATES: &str = "candidates";
    pub const SELECTED_URL: &str = "selected_url";
    pub const SELECTED_SCORE: &str = "selected_score";
    pub const DOWNLOADED_FILE: &str = "downloaded_file";
    pub const FILE_SHA256: &str = "file_sha256";
    pub const FILE_SIZE: &str = "file_size";
    pub const VERIFICATION: &str = "verification";
    pub const EXTRACTED_DATA: &str = "extracted_data";
    pub const IS_VALID: &str = "is_valid";
    pub const VALIDATION_ISSUES: &str = "validation_issues";
    pub const SUMMARY: &str = "summary";
}

/// The standard step sequence.
pub fn standard_steps() -> Vec<Box<dyn PipelineStep>> {
    vec![
        Box::new(StrategizeStep),
        Box::new(SearchStep),
        Box::new(DiscoverStep),
        Box::new(DownloadStep),
        Box::new(VerifyStep),
        Box::new(ExtractStep),
        Box::new(ValidateStep),
        Box::new(FinalizeStep),
    ]
}

fn primary_keyword(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Netzentgelte => "netzentgelte",
        DataType::Hlzf => "hochlastzeitfenster",
    }
}

/// Chooses the discovery strategy for the run.
pub struct StrategizeStep;

#[async_trait]
impl PipelineStep for StrategizeStep {
    fn name(&self) -> &'static str {
        "strategize"
    }

    async fn run(&self, job: &mut CrawlJob, _deps: &StepDeps) -> Result<String, StepError> {
        let strategy = if job.hint_url.is_some() {
            DiscoveryStrategy::HintUrl
        } else {
            DiscoveryStrategy::Sitemap
        };
        job.set_context(keys::STRATEGY, json!(strategy.to_string()));
        Ok(format!("planned discovery strategy: {}", strategy))
    }
}

/// Composes search queries for the target, kept in the context for audit
/// and for operators re-running a failed discovery by hand.
pub struct SearchStep;

#[async_trait]
impl PipelineStep for SearchStep {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn run(&self, job: &mut CrawlJob, _deps: &StepDeps) -> Result<String, StepError> {
        let host = Url::parse(&job.website)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| job.website.clone());
        let keyword = primary_keyword(job.data_type);

        let mut queries = Vec::new();
        match job.target_year {
            Some(year) => queries.push(format!("{} {} {}", host, keyword, year)),
            None => queries.push(format!("{} {}", host, keyword)),
        }
        queries.push(format!("{} {} filetype:pdf", host, keyword));
        queries.push(format!("site:{} {}", host, keyword));

        let count = queries.len();
        job.set_context(keys::SEARCH_QUERIES, json!(queries));
        Ok(format!("prepared {} search queries", count))
    }
}

/// Runs the discovery manager and selects the first candidate that passes
/// bounded-prefix content verification.
pub struct DiscoverStep;

#[async_trait]
impl PipelineStep for DiscoverStep {
    fn name(&self) -> &'static str {
        "discover"
    }

    async fn run(&self, job: &mut CrawlJob, deps: &StepDeps) -> Result<String, StepError> {
        let request = DiscoveryRequest {
            start_url: job.website.clone(),
            data_type: job.data_type,
            target_year: job.target_year,
            hint_url: job.hint_url.clone(),
            force_bfs: false,
        };
        let result = deps.discovery.discover(&request).await;

        job.set_context(
            keys::DISCOVERY,
            json!({
                "strategy": result.strategy.to_string(),
                "pages_crawled": result.pages_crawled,
                "sitemap_urls_checked": result.sitemap_urls_checked,
                "errors": result.errors,
            }),
        );
        job.set_context(keys::STRATEGY, json!(result.strategy.to_string()));

        let ranked = result.sorted_documents();
        if ranked.is_empty() {
            return Err(StepError::NoDocumentFound);
        }

        job.set_context(
            keys::CANDIDATES,
            serde_json::to_value(ranked.iter().take(10).collect::<Vec<_>>())
                .unwrap_or(serde_json::Value::Null),
        );

        // Verification mismatch means "try the next candidate", not a hard
        // failure, until the bounded candidate list is exhausted.
        let limit = deps.settings.discovery.verify_candidates.max(1);
        let mut tried = 0usize;
        for candidate in ranked.iter().take(limit) {
            tried += 1;
            match deps
                .verifier
                .verify_url(&candidate.url, job.data_type, job.target_year)
                .await
            {
                Ok(outcome) if outcome.is_verified => {
                    job.set_context(keys::SELECTED_URL, json!(candidate.url));
                    job.set_context(keys::SELECTED_SCORE, json!(candidate.score));
                    job.set_context(
                        keys::VERIFICATION,
                        json!({
                            "confidence": outcome.confidence,
                            "detected_data_type":
                                outcome.detected_data_type.map(|d| d.to_string()),
                            "keywords_found": outcome.keywords_found,
                        }),
                    );
                    return Ok(format!(
                        "selected {} (score {:.1}, confidence {:.2}, strategy {}, {} candidates)",
                        candidate.url,
                        candidate.score,
                        outcome.confidence,
                        result.strategy,
                        ranked.len()
                    ));
                }
                Ok(outcome) => {
                    debug!(
                        url = %candidate.url,
                        confidence = outcome.confidence,
                        "candidate rejected by content verification"
                    );
                }
                Err(e) => {
                    debug!(url = %candidate.url, error = %e, "candidate verification fetch failed");
                }
            }
        }

        Err(StepError::VerificationExhausted { tried })
    }
}

/// Downloads the selected document into storage.
pub struct DownloadStep;

#[async_trait]
impl PipelineStep for DownloadStep {
    fn name(&self) -> &'static str {
        "download"
    }

    async fn run(&self, job: &mut CrawlJob, deps: &StepDeps) -> Result<String, StepError> {
        let url = job
            .context_str(keys::SELECTED_URL)
            .ok_or(StepError::MissingContext(keys::SELECTED_URL))?
            .to_string();

        // Documents can be large; give the download more room than a page
        // fetch gets.
        let request = FetchRequest::get(&url)
            .with_timeout(Duration::from_secs(deps.settings.http.timeout_secs * 4));
        let policy = deps.settings.retry.policy();
        let response = fetch_with_retry(deps.engine.as_ref(), &request, &policy).await?;
        if !response.is_success() {
            return Err(StepError::Other(format!(
                "download of {} returned HTTP {}",
                url, response.status
            )));
        }

        let file_name = file_name_for(&url);
        let key = format!("{}/{}", job.id, file_name);
        let location = deps.storage.save(&key, &response.body).await?;

        let digest = hex::encode(Sha256::digest(&response.body));
        job.set_context(keys::DOWNLOADED_FILE, json!(location));
        job.set_context(keys::FILE_SHA256, json!(digest));
        job.set_context(keys::FILE_SIZE, json!(response.body.len()));

        Ok(format!(
            "downloaded {} ({} bytes, sha256 {})",
            file_name,
            response.body.len(),
            &digest[..12]
        ))
    }
}

/// Re-verifies the fully downloaded bytes, independent of the prefix check
/// that happened during discovery.
pub struct VerifyStep;

#[async_trait]
impl PipelineStep for VerifyStep {
    fn name(&self) -> &'static str {
        "verify"
    }

    async fn run(&self, job: &mut CrawlJob, deps: &StepDeps) -> Result<String, StepError> {
        let path = job
            .context_str(keys::DOWNLOADED_FILE)
            .ok_or(StepError::MissingContext(keys::DOWNLOADED_FILE))?
            .to_string();

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| StepError::Other(format!("cannot read {}: {}", path, e)))?;

        let outcome = deps
            .verifier
            .verify_bytes(&bytes, None, job.data_type, job.target_year);
        if !outcome.is_verified {
            return Err(StepError::VerificationFailed {
                confidence: outcome.confidence,
            });
        }

        job.set_context(
            keys::VERIFICATION,
            json!({
                "confidence": outcome.confidence,
                "detected_data_type": outcome.detected_data_type.map(|d| d.to_string()),
                "keywords_found": outcome.keywords_found,
            }),
        );
        Ok(format!("content verified (confidence {:.2})", outcome.confidence))
    }
}

/// Hands the downloaded file to the extraction collaborator.
pub struct ExtractStep;

#[async_trait]
impl PipelineStep for ExtractStep {
    fn name(&self) -> &'static str {
        "extract"
    }

    async fn run(&self, job: &mut CrawlJob, deps: &StepDeps) -> Result<String, StepError> {
        let path = job
            .context_str(keys::DOWNLOADED_FILE)
            .ok_or(StepError::MissingContext(keys::DOWNLOADED_FILE))?
            .to_string();

        let value = deps
            .extractor
            .extract(Path::new(&path), job.data_type, job.target_year)
            .await?;

        let count = value
            .get("records")
            .and_then(|r| r.as_array())
            .map(|a| a.len())
            .unwrap_or(0);
        job.set_context(keys::EXTRACTED_DATA, value);
        Ok(format!("extracted {} records", count))
    }
}

/// Structural checks on the extracted records.
pub struct ValidateStep;

#[async_trait]
impl PipelineStep for ValidateStep {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn run(&self, job: &mut CrawlJob, _deps: &StepDeps) -> Result<String, StepError> {
        let data = job
            .context_value(keys::EXTRACTED_DATA)
            .cloned()
            .ok_or(StepError::MissingContext(keys::EXTRACTED_DATA))?;

        let records = data
            .get("records")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        let mut issues = Vec::new();
        if records.is_empty() {
            issues.push("no records extracted".to_string());
        }
        if let Some(year) = job.target_year {
            let year_str = year.to_string();
            let mentions_year = records.iter().any(|r| r.to_string().contains(&year_str));
            if !records.is_empty() && !mentions_year {
                issues.push(format!("no record mentions target year {}", year));
            }
        }

        let is_valid = !records.is_empty();
        job.set_context(keys::IS_VALID, json!(is_valid));
        job.set_context(keys::VALIDATION_ISSUES, json!(issues));

        if !is_valid {
            return Err(StepError::ValidationFailed(issues.join("; ")));
        }
        Ok(format!(
            "{} records passed validation ({} issue(s) noted)",
            records.len(),
            issues.len()
        ))
    }
}

/// Writes the run summary into the context.
pub struct FinalizeStep;

#[async_trait]
impl PipelineStep for FinalizeStep {
    fn name(&self) -> &'static str {
        "finalize"
    }

    async fn run(&self, job: &mut CrawlJob, _deps: &StepDeps) -> Result<String, StepError> {
        let url = job.context_str(keys::SELECTED_URL).unwrap_or("-").to_string();
        let file = job
            .context_str(keys::DOWNLOADED_FILE)
            .unwrap_or("-")
            .to_string();
        let records = job
            .context_value(keys::EXTRACTED_DATA)
            .and_then(|d| d.get("records"))
            .and_then(|r| r.as_array())
            .map(|a| a.len())
            .unwrap_or(0);

        job.set_context(
            keys::SUMMARY,
            json!({
                "document_url": url,
                "stored_at": file,
                "records": records,
                "data_type": job.data_type.to_string(),
                "target_year": job.target_year,
            }),
        );
        Ok(format!("{} records from {}", records, url))
    }
}

/// Last path segment of the URL, or a generic fallback.
fn file_name_for(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(str::to_string)
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "document".to_string())
}
