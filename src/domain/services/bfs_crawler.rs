// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::models::document::{
    DataType, DiscoveredDocument, DiscoveryResult, DiscoveryStrategy, FileType,
};
use crate::domain::services::content_verifier;
use crate::domain::services::frontier::{FrontierEntry, FrontierHeap};
use crate::domain::services::scorer::DocumentScorer;
use crate::engines::traits::{
    fetch_with_retry, FetchEngine, FetchRequest,
};
use crate::utils::politeness::HostLimiter;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::robots::RobotsCheckerTrait;
use crate::utils::url_utils;
use scraper::{Html, Selector};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Result of fetching one frontier entry.
enum PageOutcome {
    /// The entry is a binary document; detected via HEAD, body not fetched.
    Document { file_type: FileType },
    /// An HTML page to mine for links and embedded data.
    Html { body: String },
    /// Fetch failed after retries.
    Failed(String),
}

/// Breadth-first crawler over a site's link graph, bounded by depth and a
/// page budget, with the frontier prioritized by relevance score.
///
/// Fetches within one crawl run with bounded concurrency; the per-host
/// politeness delay is what actually limits the request rate against the
/// target site.
pub struct BfsCrawler {
    engine: Arc<dyn FetchEngine>,
    robots: Arc<dyn RobotsCheckerTrait>,
    limiter: Arc<HostLimiter>,
    settings: CrawlerSettings,
    user_agent: String,
    retry_policy: RetryPolicy,
}

impl BfsCrawler {
    pub fn new(
        engine: Arc<dyn FetchEngine>,
        robots: Arc<dyn RobotsCheckerTrait>,
        limiter: Arc<HostLimiter>,
        settings: CrawlerSettings,
        user_agent: String,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            robots,
            limiter,
            settings,
            user_agent,
            retry_policy,
        }
    }

    pub async fn crawl(
        &self,
        start_url: &str,
        data_type: DataType,
        target_year: Option<i32>,
    ) -> DiscoveryResult {
        let mut result =
            DiscoveryResult::new(start_url, data_type, target_year, DiscoveryStrategy::Bfs);

        let base = match Url::parse(start_url) {
            Ok(url) => url,
            Err(e) => {
                result.errors.push(format!("invalid start URL: {}", e));
                return result;
            }
        };

        let scorer = DocumentScorer::new(data_type, target_year);
        let mut frontier = FrontierHeap::new();
        // URLs ever enqueued (normalized); nothing is enqueued twice.
        let mut seen = HashSet::new();
        let mut doc_index: HashMap<String, usize> = HashMap::new();
        let mut best_score = f64::MIN;
        let mut pages_crawled: u32 = 0;

        let start_normalized = url_utils::normalize_url(&base);
        seen.insert(start_normalized.clone());
        let start_score = scorer.score_url(&start_normalized, "");
        frontier.push(start_score.score, start_normalized, 0, "", "");

        while !frontier.is_empty() && pages_crawled < self.settings.max_pages {
            let batch = self
                .next_batch(&mut frontier, pages_crawled)
                .await;
            if batch.is_empty() {
                if frontier.is_empty() {
                    break;
                }
                continue;
            }
            pages_crawled += batch.len() as u32;

            let fetches = batch.into_iter().map(|entry| async move {
                let outcome = self.fetch_page(&entry.url).await;
                (entry, outcome)
            });
            let outcomes = futures::future::join_all(fetches).await;

            for (entry, outcome) in outcomes {
                self.process_outcome(
                    entry,
                    outcome,
                    &base,
                    &scorer,
                    data_type,
                    target_year,
                    &mut frontier,
                    &mut seen,
                    &mut result,
                    &mut doc_index,
                    &mut best_score,
                );
            }

            if best_score >= self.settings.early_stop_score {
                info!(
                    best_score,
                    pages_crawled, "early stop: high-confidence candidate found"
                );
                break;
            }
        }

        result.pages_crawled = pages_crawled;
        debug!(
            pages_crawled,
            candidates = result.documents.len(),
            "bfs crawl finished"
        );
        result
    }

    /// Pop up to `fetch_concurrency` frontier entries that pass the robots
    /// gate and fit the remaining page budget.
    async fn next_batch(
        &self,
        frontier: &mut FrontierHeap,
        pages_crawled: u32,
    ) -> Vec<FrontierEntry> {
        let mut batch = Vec::new();
        while batch.len() < self.settings.fetch_concurrency
            && pages_crawled + (batch.len() as u32) < self.settings.max_pages
        {
            let Some(entry) = frontier.pop() else {
                break;
            };
            if entry.depth > self.settings.max_depth {
                continue;
            }
            match self.robots.is_allowed(&entry.url, &self.user_agent).await {
                Ok(true) => batch.push(entry),
                Ok(false) => {
                    // Policy violation: excluded, never retried.
                    debug!(url = %entry.url, "excluded by robots.txt");
                }
                Err(e) => {
                    // Robots machinery is fail-open; the engine still
                    // rejects unsafe targets on fetch.
                    debug!(url = %entry.url, error = %e, "robots check failed, allowing");
                    batch.push(entry);
                }
            }
        }
        batch
    }

    async fn fetch_page(&self, url: &str) -> PageOutcome {
        let override_delay = self
            .robots
            .crawl_delay(url, &self.user_agent)
            .await
            .ok()
            .flatten();
        let host = Url::parse(url)
            .map(|u| url_utils::host_key(&u))
            .unwrap_or_default();
        self.limiter.acquire(&host, override_delay).await;

        // HEAD-first probe: a binary document is recorded without ever
        // downloading its body.
        if let Ok(resp) = self.engine.fetch(&FetchRequest::head(url)).await {
            if resp.is_success() {
                if let Some(content_type) = resp.content_type() {
                    let file_type = FileType::from_content_type(&content_type);
                    if file_type.is_document() {
                        return PageOutcome::Document { file_type };
                    }
                }
            }
        }

        let request = FetchRequest::get(url).with_max_bytes(self.settings.max_page_bytes);
        match fetch_with_retry(self.engine.as_ref(), &request, &self.retry_policy).await {
            Ok(resp) if resp.is_success() => {
                let file_type = resp
                    .content_type()
                    .map(|ct| FileType::from_content_type(&ct))
                    .unwrap_or(FileType::Unknown);
                if file_type.is_document() {
                    PageOutcome::Document { file_type }
                } else {
                    PageOutcome::Html {
                        body: String::from_utf8_lossy(&resp.body).into_owned(),
                    }
                }
            }
            Ok(resp) => PageOutcome::Failed(format!("HTTP {}", resp.status)),
            Err(e) => PageOutcome::Failed(e.to_string()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_outcome(
        &self,
        entry: FrontierEntry,
        outcome: PageOutcome,
        base: &Url,
        scorer: &DocumentScorer,
        data_type: DataType,
        target_year: Option<i32>,
        frontier: &mut FrontierHeap,
        seen: &mut HashSet<String>,
        result: &mut DiscoveryResult,
        doc_index: &mut HashMap<String, usize>,
        best_score: &mut f64,
    ) {
        match outcome {
            PageOutcome::Document { file_type } => {
                let scored = scorer.score_url(&entry.url, &entry.link_text);
                let doc = DiscoveredDocument {
                    url: entry.url.clone(),
                    score: scored.score,
                    file_type,
                    found_on_page: entry.found_on_page.clone(),
                    link_text: entry.link_text.clone(),
                    keywords_found: scored.keywords_found,
                    has_target_year: scored.has_target_year,
                    is_html_data: false,
                    years_in_page: BTreeSet::new(),
                    is_external: false,
                };
                record_document(result, doc_index, best_score, doc);
            }
            PageOutcome::Failed(message) => {
                result.errors.push(format!("{}: {}", entry.url, message));
            }
            PageOutcome::Html { body } => {
                if body.len() < self.settings.min_content_length {
                    // Likely a JS-rendered shell; zero useful links from it
                    // is expected, not an error.
                    result.errors.push(format!(
                        "possible js-rendered shell ({} bytes): {}",
                        body.len(),
                        entry.url
                    ));
                    return;
                }

                let signals = content_verifier::scan_html(&body, data_type, target_year);
                let page_years = signals.years.clone();

                if signals.confidence >= self.settings.html_candidate_confidence {
                    // The page itself carries the data. Content confidence
                    // is mapped onto the URL score axis by a tunable scale.
                    let url_scored = scorer.score_url(&entry.url, &entry.link_text);
                    let content_score = signals.confidence * self.settings.html_score_scale;
                    let has_target_year = url_scored.has_target_year
                        || target_year.is_some_and(|y| page_years.contains(&y));
                    let doc = DiscoveredDocument {
                        url: entry.url.clone(),
                        score: url_scored.score.max(content_score),
                        file_type: FileType::Html,
                        found_on_page: entry.found_on_page.clone(),
                        link_text: entry.link_text.clone(),
                        keywords_found: signals.keywords_found,
                        has_target_year,
                        is_html_data: true,
                        years_in_page: page_years.clone(),
                        is_external: false,
                    };
                    record_document(result, doc_index, best_score, doc);
                }

                for (link_url, link_text) in LinkDiscoverer::extract_links(&body, &entry.url) {
                    let normalized = url_utils::normalize_url(&link_url);
                    if seen.contains(&normalized) {
                        continue;
                    }

                    let file_type = FileType::from_url_str(&normalized);
                    let is_external = !url_utils::same_domain(base, &link_url);

                    if file_type.is_document() {
                        // Documents are candidates, never traversal targets.
                        // External ones (CDN-hosted PDFs) still count.
                        let scored = scorer.score_url(&normalized, &link_text);
                        let doc = DiscoveredDocument {
                            url: normalized,
                            score: scored.score,
                            file_type,
                            found_on_page: entry.url.clone(),
                            link_text,
                            keywords_found: scored.keywords_found,
                            has_target_year: scored.has_target_year,
                            is_html_data: false,
                            years_in_page: page_years.clone(),
                            is_external,
                        };
                        record_document(result, doc_index, best_score, doc);
                        continue;
                    }

                    // Cross-domain pages are never enqueued.
                    if is_external || entry.depth + 1 > self.settings.max_depth {
                        continue;
                    }

                    let scored = scorer.score_url(&normalized, &link_text);
                    seen.insert(normalized.clone());
                    frontier.push(
                        scored.score,
                        normalized,
                        entry.depth + 1,
                        entry.url.clone(),
                        link_text,
                    );
                }
            }
        }
    }
}

/// Keep the higher-scored entry on duplicate normalized URLs; positions stay
/// stable so discovery order remains a usable tie-breaker.
fn record_document(
    result: &mut DiscoveryResult,
    doc_index: &mut HashMap<String, usize>,
    best_score: &mut f64,
    doc: DiscoveredDocument,
) {
    if doc.score > *best_score {
        *best_score = doc.score;
    }
    match doc_index.get(&doc.url) {
        Some(&i) => {
            if doc.score > result.documents[i].score {
                result.documents[i] = doc;
            }
        }
        None => {
            doc_index.insert(doc.url.clone(), result.documents.len());
            result.documents.push(doc);
        }
    }
}

/// Extracts and filters outbound links from an HTML page.
pub struct LinkDiscoverer;

impl LinkDiscoverer {
    /// Absolute http(s) links with their anchor text, in document order.
    /// Fragment-only, mailto and javascript links are dropped.
    pub fn extract_links(html_content: &str, base_url: &str) -> Vec<(Url, String)> {
        let Ok(base) = Url::parse(base_url) else {
            return Vec::new();
        };
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        let fragment = Html::parse_document(html_content);
        let mut links = Vec::new();

        for element in fragment.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:")
            {
                continue;
            }

            if let Ok(mut url) = base.join(href) {
                if url.scheme() == "http" || url.scheme() == "https" {
                    url.set_fragment(None);
                    let text = element
                        .text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ");
                    links.push((url, text));
                }
            }
        }

        links
    }
}
