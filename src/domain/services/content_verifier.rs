// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::VerificationSettings;
use crate::domain::models::document::DataType;
use crate::engines::traits::{fetch_with_retry, EngineError, FetchEngine, FetchRequest};
use crate::utils::retry_policy::RetryPolicy;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Confidence added per distinct header keyword, and its cap.
const KEYWORD_CONFIDENCE: f64 = 0.1;
const MAX_KEYWORD_HITS: usize = 3;
/// Confidence for a matching data table. HLZF data is conventionally
/// HTML-embedded, so its table signal weighs more.
const TABLE_CONFIDENCE_HLZF: f64 = 0.4;
const TABLE_CONFIDENCE_NETZENTGELTE: f64 = 0.3;
/// Distinct vocabulary entries a table must contain to count as a data table.
const MIN_TABLE_VOCAB_HITS: usize = 2;
/// Confidence for year evidence.
const TARGET_YEAR_CONFIDENCE: f64 = 0.15;
const ANY_YEAR_CONFIDENCE: f64 = 0.05;
/// Confidence for the PDF magic on binary candidates.
const PDF_MAGIC_CONFIDENCE: f64 = 0.25;
/// Confidence for ≥2 unit-vocabulary hits in a PDF prefix.
const PDF_VOCAB_CONFIDENCE: f64 = 0.15;
/// Floor below which no data type is reported as detected.
const DETECTION_FLOOR: f64 = 0.2;

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("static regex"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("static regex"));
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// "gültig ab 01.01.2025" and similar validity phrases.
static VALID_FROM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"g(?:ü|u)ltig\s+ab\s+\d{1,2}\.\d{1,2}\.(\d{4})").expect("static regex"));
/// Bare four-digit tokens in a plausible publication range.
static BARE_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20[0-3]\d)\b").expect("static regex"));

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("static selector"));

/// Header/heading keywords indicating the data type in page text.
fn header_keywords(data_type: DataType) -> &'static [&'static str] {
    match data_type {
        DataType::Netzentgelte => &[
            "netzentgelte",
            "preisblatt",
            "entgelte für netznutzung",
            "netznutzungsentgelte",
            "entgelte für die netznutzung",
        ],
        DataType::Hlzf => &[
            "hochlastzeitfenster",
            "hlzf",
            "atypische netznutzung",
            "hochlastfenster",
        ],
    }
}

/// Unit and column vocabulary expected inside a data table of the type.
fn table_vocabulary(data_type: DataType) -> &'static [&'static str] {
    match data_type {
        DataType::Netzentgelte => &[
            "ct/kwh",
            "eur/kw",
            "€/kw",
            "eur/kwh",
            "€/kwh",
            "leistungspreis",
            "arbeitspreis",
            "grundpreis",
            "jahresleistungspreis",
        ],
        DataType::Hlzf => &[
            "hochlastzeitfenster",
            "zeitfenster",
            "winter",
            "sommer",
            "übergangszeit",
            "uhr",
            "werktage",
        ],
    }
}

fn table_confidence(data_type: DataType) -> f64 {
    match data_type {
        DataType::Netzentgelte => TABLE_CONFIDENCE_NETZENTGELTE,
        DataType::Hlzf => TABLE_CONFIDENCE_HLZF,
    }
}

/// Visible text of an HTML document: scripts, styles, comments and tags
/// stripped, whitespace collapsed, lowercased.
pub fn visible_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_comments = COMMENT_RE.replace_all(&without_styles, " ");
    let without_tags = TAG_RE.replace_all(&without_comments, " ");
    WHITESPACE_RE
        .replace_all(&without_tags, " ")
        .trim()
        .to_lowercase()
}

/// Years found in text, restricted to a plausible publication range.
pub fn extract_years(text: &str) -> BTreeSet<i32> {
    let mut years = BTreeSet::new();
    for caps in VALID_FROM_RE.captures_iter(text) {
        if let Ok(year) = caps[1].parse::<i32>() {
            years.insert(year);
        }
    }
    for caps in BARE_YEAR_RE.captures_iter(text) {
        if let Ok(year) = caps[1].parse::<i32>() {
            years.insert(year);
        }
    }
    years
}

/// Signals extracted from a content prefix for one data type.
#[derive(Debug, Clone)]
pub struct ContentSignals {
    pub confidence: f64,
    pub keywords_found: Vec<String>,
    pub years: BTreeSet<i32>,
    pub has_data_table: bool,
}

fn year_confidence(years: &BTreeSet<i32>, target_year: Option<i32>) -> f64 {
    match target_year {
        Some(year) if years.contains(&year) => TARGET_YEAR_CONFIDENCE,
        _ if !years.is_empty() => ANY_YEAR_CONFIDENCE,
        _ => 0.0,
    }
}

/// Score an HTML body against a data type, independent of its URL.
pub fn scan_html(html: &str, data_type: DataType, target_year: Option<i32>) -> ContentSignals {
    let text = visible_text(html);

    let mut keywords_found = Vec::new();
    for keyword in header_keywords(data_type) {
        if text.contains(keyword) {
            keywords_found.push(keyword.to_string());
        }
    }
    let mut confidence = KEYWORD_CONFIDENCE * keywords_found.len().min(MAX_KEYWORD_HITS) as f64;

    let document = Html::parse_document(html);
    let vocabulary = table_vocabulary(data_type);
    let has_data_table = document.select(&TABLE_SELECTOR).any(|table| {
        let cells = table.text().collect::<String>().to_lowercase();
        let hits = vocabulary.iter().filter(|v| cells.contains(**v)).count();
        hits >= MIN_TABLE_VOCAB_HITS
    });
    if has_data_table {
        confidence += table_confidence(data_type);
    }

    let years = extract_years(&text);
    confidence += year_confidence(&years, target_year);

    ContentSignals {
        confidence: confidence.clamp(0.0, 1.0),
        keywords_found,
        years,
        has_data_table,
    }
}

/// Score the printable prefix of a binary (PDF) candidate.
pub fn scan_pdf_prefix(
    bytes: &[u8],
    data_type: DataType,
    target_year: Option<i32>,
) -> ContentSignals {
    let text = String::from_utf8_lossy(bytes).to_lowercase();

    let mut confidence = if bytes.starts_with(b"%PDF") {
        PDF_MAGIC_CONFIDENCE
    } else {
        0.0
    };

    let mut keywords_found = Vec::new();
    for keyword in header_keywords(data_type) {
        if text.contains(keyword) {
            keywords_found.push(keyword.to_string());
        }
    }
    confidence += KEYWORD_CONFIDENCE * keywords_found.len().min(MAX_KEYWORD_HITS) as f64;

    let vocabulary = table_vocabulary(data_type);
    let vocab_hits = vocabulary.iter().filter(|v| text.contains(**v)).count();
    if vocab_hits >= MIN_TABLE_VOCAB_HITS {
        confidence += PDF_VOCAB_CONFIDENCE;
    }

    let years = extract_years(&text);
    confidence += year_confidence(&years, target_year);

    ContentSignals {
        confidence: confidence.clamp(0.0, 1.0),
        keywords_found,
        years,
        has_data_table: false,
    }
}

/// Result of verifying one candidate.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub is_verified: bool,
    /// Confidence in [0, 1] for the requested data type.
    pub confidence: f64,
    /// Best-matching data type, when any clears the detection floor.
    pub detected_data_type: Option<DataType>,
    pub keywords_found: Vec<String>,
}

/// Verifies that a candidate's *content* matches the expected data type
/// before committing to a full download.
///
/// Only a bounded prefix of the resource is fetched (Range request, with a
/// truncated read as fallback for servers that ignore Range).
pub struct ContentVerifier {
    engine: Arc<dyn FetchEngine>,
    retry_policy: RetryPolicy,
    prefix_bytes: usize,
    threshold: f64,
}

impl ContentVerifier {
    pub fn new(engine: Arc<dyn FetchEngine>, settings: &VerificationSettings) -> Self {
        Self {
            engine,
            retry_policy: RetryPolicy::fast(),
            prefix_bytes: settings.prefix_bytes,
            threshold: settings.threshold,
        }
    }

    /// Fetch a prefix of `url` and verify it against `data_type`.
    pub async fn verify_url(
        &self,
        url: &str,
        data_type: DataType,
        target_year: Option<i32>,
    ) -> Result<VerificationOutcome, EngineError> {
        let request = FetchRequest::get(url)
            .with_header("Range", format!("bytes=0-{}", self.prefix_bytes.saturating_sub(1)))
            .with_max_bytes(self.prefix_bytes);

        let response = fetch_with_retry(self.engine.as_ref(), &request, &self.retry_policy).await?;
        if !response.is_success() {
            return Err(EngineError::Other(format!(
                "verification fetch returned HTTP {}",
                response.status
            )));
        }

        let content_type = response.content_type();
        Ok(self.verify_bytes(&response.body, content_type.as_deref(), data_type, target_year))
    }

    /// Verify already-fetched bytes against `data_type`.
    pub fn verify_bytes(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        data_type: DataType,
        target_year: Option<i32>,
    ) -> VerificationOutcome {
        let is_pdf = bytes.starts_with(b"%PDF") || content_type == Some("application/pdf");

        let scan = |dt: DataType| -> ContentSignals {
            if is_pdf {
                scan_pdf_prefix(bytes, dt, target_year)
            } else {
                scan_html(&String::from_utf8_lossy(bytes), dt, target_year)
            }
        };

        let requested = scan(data_type);
        let other_type = match data_type {
            DataType::Netzentgelte => DataType::Hlzf,
            DataType::Hlzf => DataType::Netzentgelte,
        };
        let other = scan(other_type);

        let detected_data_type = if requested.confidence >= other.confidence {
            (requested.confidence >= DETECTION_FLOOR).then_some(data_type)
        } else {
            (other.confidence >= DETECTION_FLOOR).then_some(other_type)
        };

        VerificationOutcome {
            is_verified: requested.confidence >= self.threshold,
            confidence: requested.confidence,
            detected_data_type,
            keywords_found: requested.keywords_found,
        }
    }
}
