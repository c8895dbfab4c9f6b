// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::DiscoverySettings;
use crate::domain::models::document::{
    DataType, DiscoveredDocument, DiscoveryResult, DiscoveryStrategy, FileType,
};
use crate::domain::services::scorer::DocumentScorer;
use crate::engines::traits::{fetch_with_retry, FetchEngine, FetchRequest};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::url_utils;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;
use url::Url;

static LOC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").expect("static regex"));

/// Fast-path discovery over `sitemap.xml`: no traversal, every listed URL
/// is scored directly against the target.
pub struct SitemapDiscovery {
    engine: Arc<dyn FetchEngine>,
    retry_policy: RetryPolicy,
    child_limit: usize,
}

impl SitemapDiscovery {
    pub fn new(engine: Arc<dyn FetchEngine>, settings: &DiscoverySettings) -> Self {
        Self {
            engine,
            retry_policy: RetryPolicy::fast(),
            child_limit: settings.sitemap_child_limit,
        }
    }

    pub async fn discover(
        &self,
        start_url: &str,
        data_type: DataType,
        target_year: Option<i32>,
    ) -> DiscoveryResult {
        let mut result =
            DiscoveryResult::new(start_url, data_type, target_year, DiscoveryStrategy::Sitemap);

        let base = match Url::parse(start_url) {
            Ok(url) => url,
            Err(e) => {
                result.errors.push(format!("invalid start URL: {}", e));
                return result;
            }
        };

        let sitemap_url = format!("{}/sitemap.xml", url_utils::origin(&base));
        let Some(body) = self.fetch_sitemap(&sitemap_url, &mut result).await else {
            return result;
        };

        let mut locs = extract_locs(&body);
        if body.to_lowercase().contains("<sitemapindex") {
            // One level of sitemap-index nesting, bounded.
            let children: Vec<String> = locs.drain(..).take(self.child_limit).collect();
            for child_url in children {
                if let Some(child_body) = self.fetch_sitemap(&child_url, &mut result).await {
                    locs.extend(extract_locs(&child_body));
                }
            }
        }

        let scorer = DocumentScorer::new(data_type, target_year);
        let mut seen = HashSet::new();
        for loc in &locs {
            result.sitemap_urls_checked += 1;

            let Ok(normalized) = url_utils::normalize_str(loc) else {
                continue;
            };
            if !seen.insert(normalized.clone()) {
                continue;
            }

            let scored = scorer.score_url(&normalized, "");
            let file_type = FileType::from_url_str(&normalized);
            // Anything without a positive signal is noise at sitemap scale.
            if scored.score <= 0.0 || (scored.keywords_found.is_empty() && !file_type.is_document())
            {
                continue;
            }

            result.documents.push(DiscoveredDocument {
                url: normalized,
                score: scored.score,
                file_type,
                found_on_page: sitemap_url.clone(),
                link_text: String::new(),
                keywords_found: scored.keywords_found,
                has_target_year: scored.has_target_year,
                is_html_data: false,
                years_in_page: BTreeSet::new(),
                is_external: false,
            });
        }

        debug!(
            checked = result.sitemap_urls_checked,
            candidates = result.documents.len(),
            "sitemap discovery finished"
        );
        result
    }

    async fn fetch_sitemap(&self, url: &str, result: &mut DiscoveryResult) -> Option<String> {
        let request = FetchRequest::get(url);
        match fetch_with_retry(self.engine.as_ref(), &request, &self.retry_policy).await {
            Ok(resp) if resp.is_success() => {
                Some(String::from_utf8_lossy(&resp.body).into_owned())
            }
            Ok(resp) => {
                result
                    .errors
                    .push(format!("sitemap {} returned HTTP {}", url, resp.status));
                None
            }
            Err(e) => {
                result.errors.push(format!("sitemap {} failed: {}", url, e));
                None
            }
        }
    }
}

/// `<loc>` entries of a sitemap body, in document order.
fn extract_locs(body: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(body)
        .map(|caps| caps[1].trim().to_string())
        .filter(|loc| !loc.is_empty())
        .collect()
}
