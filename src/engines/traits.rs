// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::retry_policy::{
    is_retryable_status, retry_with_policy, RetryPolicy, RetryableError,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Engine error type.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Underlying HTTP request failure.
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// Request exceeded its deadline.
    #[error("Timeout")]
    Timeout,
    /// Target resolved to a private, loopback or link-local address.
    #[error("SSRF protection: {0}")]
    Ssrf(String),
    /// Malformed URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// A transient HTTP status surfaced as an error by the retry wrapper.
    #[error("HTTP status {code}")]
    Status {
        code: u16,
        retry_after: Option<Duration>,
    },
    /// Other error.
    #[error("Engine error: {0}")]
    Other(String),
}

impl EngineError {
    /// Whether this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            EngineError::Timeout => true,
            EngineError::Status { code, .. } => is_retryable_status(*code),
            // Validation and parse failures are permanent.
            _ => false,
        }
    }
}

impl RetryableError for EngineError {
    fn is_retryable(&self) -> bool {
        EngineError::is_retryable(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            EngineError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// HTTP method subset used by the crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    Head,
}

/// A single fetch operation.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: FetchMethod,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Per-request timeout override; the engine default applies when absent.
    pub timeout: Option<Duration>,
    /// Stop reading the body after this many bytes (truncated read).
    pub max_bytes: Option<usize>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: FetchMethod::Get,
            headers: Vec::new(),
            timeout: None,
            max_bytes: None,
        }
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self {
            method: FetchMethod::Head,
            ..Self::get(url)
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}

/// Response to a [`FetchRequest`]. Header names are lowercased.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    /// `Content-Type` value without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
    }

    /// `Retry-After` in its seconds form; the HTTP-date form is ignored.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Convert a transient status into an error so the retry wrapper can act
    /// on it. Non-retryable statuses (404, 403, ...) stay plain responses.
    pub fn retryable_status_error(&self) -> Option<EngineError> {
        if is_retryable_status(self.status) {
            Some(EngineError::Status {
                code: self.status,
                retry_after: self.retry_after(),
            })
        } else {
            None
        }
    }
}

/// Network fetch abstraction. Implementations enforce SSRF validation.
#[async_trait]
pub trait FetchEngine: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError>;
}

/// Fetch with retries on transient failures and transient status codes.
///
/// Responses with non-retryable statuses are returned as-is; the caller
/// decides what a 404 means in its context.
pub async fn fetch_with_retry(
    engine: &dyn FetchEngine,
    request: &FetchRequest,
    policy: &RetryPolicy,
) -> Result<FetchResponse, EngineError> {
    retry_with_policy(policy, move |_attempt| async move {
        let response = engine.fetch(request).await?;
        if let Some(err) = response.retryable_status_error() {
            return Err(err);
        }
        Ok(response)
    })
    .await
}
