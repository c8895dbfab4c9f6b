// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::{DataType, FileType};

/// Bonus for a positive keyword appearing in the URL.
const URL_KEYWORD_BONUS: f64 = 15.0;
/// Bonus for a positive keyword appearing in the link text.
const LINK_TEXT_KEYWORD_BONUS: f64 = 5.0;
/// Bonus for the target year appearing in the URL.
const URL_YEAR_BONUS: f64 = 25.0;
/// Bonus for the target year appearing only in the link text.
const LINK_TEXT_YEAR_BONUS: f64 = 10.0;

/// Positive keywords per data type. Matching is lowercase substring.
fn positive_keywords(data_type: DataType) -> &'static [&'static str] {
    match data_type {
        DataType::Netzentgelte => &[
            "netzentgelte",
            "netzentgelt",
            "preisblatt",
            "netznutzung",
            "entgelte",
        ],
        DataType::Hlzf => &[
            "hochlastzeitfenster",
            "hlzf",
            "atypische-netznutzung",
            "atypische netznutzung",
            "zeitfenster",
        ],
    }
}

/// Deny-list with per-entry penalties, applied unconditionally on a URL or
/// link-text match. Sections that never carry current tariff sheets.
const NEGATIVE_KEYWORDS: &[(&str, f64)] = &[
    ("archiv", -15.0),
    ("presse", -10.0),
    ("/news", -10.0),
    ("karriere", -25.0),
    ("stellenangebot", -25.0),
    ("impressum", -30.0),
    ("datenschutz", -30.0),
    ("login", -25.0),
];

/// Outcome of scoring a single URL/link-text pair.
#[derive(Debug, Clone)]
pub struct UrlScore {
    pub score: f64,
    /// Matched positive keywords, first occurrence per keyword.
    pub keywords_found: Vec<String>,
    /// Target year present in the URL.
    pub has_target_year: bool,
}

/// Pure additive relevance scorer for one `(data type, target year)` goal.
///
/// The model is deliberately simple and monotonic — no saturation, no
/// interaction terms — so rankings are explainable and stable under small
/// input perturbations. HTML pages get a separate content-based score in the
/// verifier; this one only looks at the URL and the anchor text.
#[derive(Debug, Clone, Copy)]
pub struct DocumentScorer {
    data_type: DataType,
    target_year: Option<i32>,
}

impl DocumentScorer {
    pub fn new(data_type: DataType, target_year: Option<i32>) -> Self {
        Self {
            data_type,
            target_year,
        }
    }

    pub fn score_url(&self, url: &str, link_text: &str) -> UrlScore {
        let url_lower = url.to_lowercase();
        let text_lower = link_text.to_lowercase();

        let mut score = FileType::from_url_str(url).score_bonus();
        let mut keywords_found = Vec::new();

        for keyword in positive_keywords(self.data_type) {
            let in_url = url_lower.contains(keyword);
            let in_text = text_lower.contains(keyword);
            if in_url {
                score += URL_KEYWORD_BONUS;
            }
            if in_text {
                score += LINK_TEXT_KEYWORD_BONUS;
            }
            if in_url || in_text {
                keywords_found.push(keyword.to_string());
            }
        }

        for (keyword, penalty) in NEGATIVE_KEYWORDS {
            if url_lower.contains(keyword) || text_lower.contains(keyword) {
                score += penalty;
            }
        }

        let mut has_target_year = false;
        if let Some(year) = self.target_year {
            let year_str = year.to_string();
            if url_lower.contains(&year_str) {
                score += URL_YEAR_BONUS;
                has_target_year = true;
            } else if text_lower.contains(&year_str) {
                score += LINK_TEXT_YEAR_BONUS;
            }
        }

        UrlScore {
            score,
            keywords_found,
            has_target_year,
        }
    }
}
