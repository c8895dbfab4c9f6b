// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::DiscoverySettings;
use crate::domain::models::document::{
    DataType, DiscoveredDocument, DiscoveryResult, DiscoveryStrategy, FileType,
};
use crate::domain::services::bfs_crawler::BfsCrawler;
use crate::domain::services::scorer::DocumentScorer;
use crate::domain::services::sitemap::SitemapDiscovery;
use crate::utils::url_utils;
use std::collections::BTreeSet;
use std::collections::HashMap;
use tracing::{debug, info};

/// One discovery invocation.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub start_url: String,
    pub data_type: DataType,
    pub target_year: Option<i32>,
    /// Known document URL; skips crawling entirely when present.
    pub hint_url: Option<String>,
    /// Run the BFS crawler even when the sitemap already yielded a
    /// confident candidate, and merge both result sets.
    pub force_bfs: bool,
}

/// Orchestrates discovery: sitemap first because it is cheap, BFS as the
/// fallback, hint URLs short-circuiting both. Results from multiple
/// strategies are merged by normalized URL.
pub struct DiscoveryManager {
    sitemap: SitemapDiscovery,
    crawler: BfsCrawler,
    settings: DiscoverySettings,
}

impl DiscoveryManager {
    pub fn new(sitemap: SitemapDiscovery, crawler: BfsCrawler, settings: DiscoverySettings) -> Self {
        Self {
            sitemap,
            crawler,
            settings,
        }
    }

    pub async fn discover(&self, request: &DiscoveryRequest) -> DiscoveryResult {
        if let Some(hint_url) = &request.hint_url {
            return self.from_hint(request, hint_url);
        }

        let sitemap_result = self
            .sitemap
            .discover(&request.start_url, request.data_type, request.target_year)
            .await;

        let sitemap_top = sitemap_result.top_document().map(|d| d.score);
        let sitemap_confident =
            sitemap_top.is_some_and(|score| score >= self.settings.min_sitemap_score);

        if sitemap_confident && !request.force_bfs {
            info!(
                top_score = sitemap_top.unwrap_or_default(),
                candidates = sitemap_result.documents.len(),
                "sitemap discovery sufficient, skipping bfs"
            );
            let mut result = sitemap_result;
            result.documents = result.sorted_documents();
            return result;
        }

        debug!(
            sitemap_candidates = sitemap_result.documents.len(),
            force_bfs = request.force_bfs,
            "falling back to bfs crawl"
        );
        let bfs_result = self
            .crawler
            .crawl(&request.start_url, request.data_type, request.target_year)
            .await;

        let mut merged = merge_results(sitemap_result, bfs_result);
        merged.documents = merged.sorted_documents();
        merged
    }

    /// Manual/hint strategy: score the given URL directly, no crawling.
    fn from_hint(&self, request: &DiscoveryRequest, hint_url: &str) -> DiscoveryResult {
        let mut result = DiscoveryResult::new(
            &request.start_url,
            request.data_type,
            request.target_year,
            DiscoveryStrategy::HintUrl,
        );

        let normalized = match url_utils::normalize_str(hint_url) {
            Ok(n) => n,
            Err(e) => {
                result.errors.push(format!("invalid hint URL: {}", e));
                return result;
            }
        };

        let scorer = DocumentScorer::new(request.data_type, request.target_year);
        let scored = scorer.score_url(&normalized, "");
        let file_type = FileType::from_url_str(&normalized);
        result.documents.push(DiscoveredDocument {
            url: normalized,
            score: scored.score,
            file_type,
            found_on_page: String::new(),
            link_text: String::new(),
            keywords_found: scored.keywords_found,
            has_target_year: scored.has_target_year,
            is_html_data: file_type == FileType::Html,
            years_in_page: BTreeSet::new(),
            is_external: false,
        });
        result
    }
}

/// Merge two results by normalized URL: the higher-scored duplicate wins its
/// slot, keyword lists are unioned preserving first-occurrence order.
/// Counters and error lists are combined. The strategy of the secondary
/// (BFS) result is kept, since it did the heavy lifting.
fn merge_results(sitemap: DiscoveryResult, bfs: DiscoveryResult) -> DiscoveryResult {
    let mut merged = DiscoveryResult::new(
        bfs.start_url.clone(),
        bfs.data_type,
        bfs.target_year,
        bfs.strategy,
    );
    merged.pages_crawled = sitemap.pages_crawled + bfs.pages_crawled;
    merged.sitemap_urls_checked = sitemap.sitemap_urls_checked + bfs.sitemap_urls_checked;
    merged.errors.extend(sitemap.errors);
    merged.errors.extend(bfs.errors);

    let mut index: HashMap<String, usize> = HashMap::new();
    for doc in sitemap.documents.into_iter().chain(bfs.documents) {
        match index.get(&doc.url) {
            Some(&i) => {
                let existing = &mut merged.documents[i];
                let mut keywords = existing.keywords_found.clone();
                for keyword in &doc.keywords_found {
                    if !keywords.contains(keyword) {
                        keywords.push(keyword.clone());
                    }
                }
                if doc.score > existing.score {
                    *existing = doc;
                }
                existing.keywords_found = keywords;
            }
            None => {
                index.insert(doc.url.clone(), merged.documents.len());
                merged.documents.push(doc);
            }
        }
    }

    merged
}
