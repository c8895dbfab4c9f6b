// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::retry_policy::RetryPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Application settings.
///
/// Every tuning knob of the crawl engine is a named field here; nothing is
/// hard-coded inside the traversal or pipeline logic. Values come from
/// defaults, optional `config/{default,<env>}` files and `NETZSCOUT__`
/// environment variables, in that order.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// HTTP client configuration.
    pub http: HttpSettings,
    /// BFS crawler budgets and thresholds.
    pub crawler: CrawlerSettings,
    /// Discovery orchestration thresholds.
    pub discovery: DiscoverySettings,
    /// Content verification configuration.
    pub verification: VerificationSettings,
    /// Retry/backoff configuration for network operations.
    pub retry: RetrySettings,
    /// Crash recovery configuration.
    pub recovery: RecoverySettings,
    /// Download storage configuration.
    pub storage: StorageSettings,
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout in seconds (connect + read).
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Shorter timeout for robots.txt fetches.
    pub robots_timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

/// BFS crawler budgets and thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// Maximum link depth from the start URL.
    pub max_depth: u32,
    /// Maximum number of frontier entries that may reach the network.
    pub max_pages: u32,
    /// Concurrent fetches within one crawl.
    pub fetch_concurrency: usize,
    /// Minimum delay between requests to the same host, in milliseconds.
    pub politeness_delay_ms: u64,
    /// A candidate at or above this score stops the crawl early.
    pub early_stop_score: f64,
    /// HTML bodies shorter than this are treated as JS-rendered shells.
    pub min_content_length: usize,
    /// Upper bound on bytes read from a single page.
    pub max_page_bytes: usize,
    /// Content confidence at which a fetched HTML page becomes a candidate
    /// document in its own right.
    pub html_candidate_confidence: f64,
    /// Scale factor mapping verifier confidence (0..1) of an HTML data page
    /// onto the URL score axis. The two scales are deliberately tunable
    /// rather than assumed equal.
    pub html_score_scale: f64,
}

/// Discovery orchestration thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    /// Sitemap candidates at or above this score skip the BFS fallback.
    pub min_sitemap_score: f64,
    /// How many ranked candidates the discover step may prefix-verify.
    pub verify_candidates: usize,
    /// Maximum child sitemaps followed from a sitemap index.
    pub sitemap_child_limit: usize,
}

/// Content verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationSettings {
    /// Bytes of a candidate fetched for pre-download verification.
    pub prefix_bytes: usize,
    /// Confidence at or above which a candidate counts as verified.
    pub threshold: f64,
}

/// Retry/backoff configuration for network operations.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Attempts per operation, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any backoff, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter fraction applied to computed backoffs.
    pub jitter_factor: f64,
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.base_delay_ms),
            max_backoff: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: 2.0,
            jitter_factor: self.jitter_factor,
            enable_jitter: self.jitter_factor > 0.0,
        }
    }
}

/// Crash recovery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RecoverySettings {
    /// Crawl locks older than this many seconds are considered orphaned.
    pub lock_timeout_secs: u64,
    /// Interval of the periodic recovery sweep after the startup pass.
    pub sweep_interval_secs: u64,
}

/// Download storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory downloaded documents are written to.
    pub local_path: String,
}

impl Settings {
    /// Load settings from defaults, optional files and the environment.
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .set_default("http.timeout_secs", 15)?
            .set_default("http.connect_timeout_secs", 5)?
            .set_default("http.robots_timeout_secs", 5)?
            .set_default("http.user_agent", "netzscout-bot/0.1 (+tariff document discovery)")?
            .set_default("crawler.max_depth", 3)?
            .set_default("crawler.max_pages", 50)?
            .set_default("crawler.fetch_concurrency", 4)?
            .set_default("crawler.politeness_delay_ms", 1000)?
            .set_default("crawler.early_stop_score", 80.0)?
            .set_default("crawler.min_content_length", 400)?
            .set_default("crawler.max_page_bytes", 1_048_576)?
            .set_default("crawler.html_candidate_confidence", 0.3)?
            .set_default("crawler.html_score_scale", 100.0)?
            .set_default("discovery.min_sitemap_score", 30.0)?
            .set_default("discovery.verify_candidates", 3)?
            .set_default("discovery.sitemap_child_limit", 5)?
            .set_default("verification.prefix_bytes", 15_360)?
            .set_default("verification.threshold", 0.5)?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 500)?
            .set_default("retry.max_delay_ms", 10_000)?
            .set_default("retry.jitter_factor", 0.1)?
            .set_default("recovery.lock_timeout_secs", 3600)?
            .set_default("recovery.sweep_interval_secs", 600)?
            .set_default("storage.local_path", "./storage/downloads")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("NETZSCOUT").separator("__"));

        builder.build()?.try_deserialize()
    }
}
