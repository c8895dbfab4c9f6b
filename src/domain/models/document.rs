// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kind of tariff data a crawl is after.
///
/// Netzentgelte are conventionally published as PDF price sheets, HLZF
/// (Hochlastzeitfenster) as HTML tables. Several heuristics key off this
/// difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Netzentgelte,
    Hlzf,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataType::Netzentgelte => write!(f, "netzentgelte"),
            DataType::Hlzf => write!(f, "hlzf"),
        }
    }
}

impl FromStr for DataType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "netzentgelte" => Ok(DataType::Netzentgelte),
            "hlzf" => Ok(DataType::Hlzf),
            _ => Err(()),
        }
    }
}

/// File type of a candidate resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Pdf,
    Xlsx,
    Xls,
    Html,
    Doc,
    #[default]
    Unknown,
}

impl FileType {
    /// Guess from the URL path extension.
    pub fn from_url_str(url: &str) -> Self {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_ascii_lowercase();
        if path.ends_with(".pdf") {
            FileType::Pdf
        } else if path.ends_with(".xlsx") {
            FileType::Xlsx
        } else if path.ends_with(".xls") {
            FileType::Xls
        } else if path.ends_with(".doc") || path.ends_with(".docx") {
            FileType::Doc
        } else if path.ends_with(".html") || path.ends_with(".htm") {
            FileType::Html
        } else {
            FileType::Unknown
        }
    }

    /// Map a Content-Type value (without parameters) to a file type.
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type {
            "application/pdf" => FileType::Pdf,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => FileType::Xlsx,
            "application/vnd.ms-excel" => FileType::Xls,
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                FileType::Doc
            }
            "text/html" | "application/xhtml+xml" => FileType::Html,
            _ => FileType::Unknown,
        }
    }

    /// Whether this is a downloadable document rather than a traversable page.
    pub fn is_document(&self) -> bool {
        matches!(
            self,
            FileType::Pdf | FileType::Xlsx | FileType::Xls | FileType::Doc
        )
    }

    /// Base score contribution of the file type.
    pub fn score_bonus(&self) -> f64 {
        match self {
            FileType::Pdf => 20.0,
            FileType::Xlsx | FileType::Xls => 15.0,
            FileType::Doc => 5.0,
            // HTML pages are scored by content, not by type.
            FileType::Html | FileType::Unknown => 0.0,
        }
    }
}

/// How a discovery run found its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    Sitemap,
    Bfs,
    HintUrl,
    Manual,
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiscoveryStrategy::Sitemap => write!(f, "sitemap"),
            DiscoveryStrategy::Bfs => write!(f, "bfs"),
            DiscoveryStrategy::HintUrl => write!(f, "hint_url"),
            DiscoveryStrategy::Manual => write!(f, "manual"),
        }
    }
}

/// A candidate resource produced by discovery. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredDocument {
    /// Candidate URL (normalized form).
    pub url: String,
    /// Relevance score; higher is better.
    pub score: f64,
    /// File type guessed from URL or probe.
    pub file_type: FileType,
    /// Page the candidate was found on.
    pub found_on_page: String,
    /// Anchor text of the link that produced the candidate.
    pub link_text: String,
    /// Matched keywords, deduplicated by first occurrence.
    pub keywords_found: Vec<String>,
    /// Whether the target year appears in the URL.
    pub has_target_year: bool,
    /// Whether the candidate is an HTML page carrying the data directly.
    pub is_html_data: bool,
    /// Years seen on the page the candidate came from.
    pub years_in_page: BTreeSet<i32>,
    /// Whether the candidate lives on a different domain (e.g. a CDN).
    pub is_external: bool,
}

/// Aggregate result of one discovery invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub start_url: String,
    pub data_type: DataType,
    pub target_year: Option<i32>,
    pub strategy: DiscoveryStrategy,
    /// Candidates in discovery order; use [`sorted_documents`] for ranking.
    ///
    /// [`sorted_documents`]: DiscoveryResult::sorted_documents
    pub documents: Vec<DiscoveredDocument>,
    pub pages_crawled: u32,
    pub sitemap_urls_checked: u32,
    /// Crawl errors and soft warnings, in occurrence order.
    pub errors: Vec<String>,
}

impl DiscoveryResult {
    pub fn new(
        start_url: impl Into<String>,
        data_type: DataType,
        target_year: Option<i32>,
        strategy: DiscoveryStrategy,
    ) -> Self {
        Self {
            start_url: start_url.into(),
            data_type,
            target_year,
            strategy,
            documents: Vec::new(),
            pages_crawled: 0,
            sitemap_urls_checked: 0,
            errors: Vec::new(),
        }
    }

    /// Candidates ranked best-first: score descending, then presence of the
    /// target year, then PDF-style candidates before HTML-embedded ones,
    /// then stable discovery order.
    pub fn sorted_documents(&self) -> Vec<DiscoveredDocument> {
        let mut docs = self.documents.clone();
        docs.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.has_target_year.cmp(&a.has_target_year))
                .then_with(|| a.is_html_data.cmp(&b.is_html_data))
        });
        docs
    }

    /// Best-ranked candidate, or `None` when discovery came up empty.
    pub fn top_document(&self) -> Option<DiscoveredDocument> {
        self.sorted_documents().into_iter().next()
    }
}
