// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::DataType;
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::path::Path;
use thiserror::Error;

/// Extraction error type.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported document: {0}")]
    Unsupported(String),

    #[error("Extraction failed: {0}")]
    Failed(String),
}

/// Extraction collaborator: turns a downloaded document into structured
/// records. The pipeline is agnostic to the implementation behind this seam.
#[async_trait]
pub trait TariffExtractor: Send + Sync {
    async fn extract(
        &self,
        file_path: &Path,
        data_type: DataType,
        target_year: Option<i32>,
    ) -> Result<Value, ExtractionError>;
}

/// Minimal extractor used by the demo wiring and the tests.
///
/// HTML documents yield one record per table row; binary documents yield a
/// single metadata record. Anything smarter lives behind the trait in the
/// consuming application.
pub struct BasicTableExtractor;

#[async_trait]
impl TariffExtractor for BasicTableExtractor {
    async fn extract(
        &self,
        file_path: &Path,
        data_type: DataType,
        target_year: Option<i32>,
    ) -> Result<Value, ExtractionError> {
        let bytes = tokio::fs::read(file_path).await?;

        let looks_html = {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]).to_lowercase();
            head.contains("<html") || head.contains("<!doctype html") || head.contains("<table")
        };

        let records = if looks_html {
            extract_table_rows(&String::from_utf8_lossy(&bytes))
        } else {
            vec![json!({
                "source": file_path.to_string_lossy(),
                "size_bytes": bytes.len(),
            })]
        };

        Ok(json!({
            "data_type": data_type.to_string(),
            "target_year": target_year,
            "records": records,
        }))
    }
}

fn extract_table_rows(html: &str) -> Vec<Value> {
    let document = Html::parse_document(html);
    let Ok(row_selector) = Selector::parse("table tr") else {
        return Vec::new();
    };
    let Ok(cell_selector) = Selector::parse("td, th") else {
        return Vec::new();
    };

    document
        .select(&row_selector)
        .map(|row| {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|cell| {
                    cell.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            json!({ "cells": cells })
        })
        .filter(|row| {
            row["cells"]
                .as_array()
                .is_some_and(|cells| !cells.is_empty())
        })
        .collect()
}
