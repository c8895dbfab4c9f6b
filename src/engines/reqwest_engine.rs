// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::HttpSettings;
use crate::engines::traits::{
    EngineError, FetchEngine, FetchMethod, FetchRequest, FetchResponse,
};
use crate::engines::validators;
use async_trait::async_trait;
use bytes::BytesMut;
use std::collections::HashMap;
use std::time::Duration;

/// HTTP fetch engine backed by a shared reqwest client.
pub struct ReqwestEngine {
    client: reqwest::Client,
}

impl ReqwestEngine {
    pub fn new(settings: &HttpSettings) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchEngine for ReqwestEngine {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        validators::validate_url(&request.url).await?;

        let mut builder = match request.method {
            FetchMethod::Get => self.client.get(&request.url),
            FetchMethod::Head => self.client.head(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), v.to_string());
            }
        }

        let body = match request.method {
            FetchMethod::Head => bytes::Bytes::new(),
            FetchMethod::Get => read_body(response, request.max_bytes).await?,
        };

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

/// Read the response body, stopping early once `max_bytes` is reached. The
/// truncated read is the fallback for servers that ignore Range requests.
async fn read_body(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<bytes::Bytes, EngineError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
        body.extend_from_slice(&chunk);
        if let Some(limit) = max_bytes {
            if body.len() >= limit {
                body.truncate(limit);
                break;
            }
        }
    }
    Ok(body.freeze())
}

fn map_reqwest_error(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Timeout
    } else {
        EngineError::RequestFailed(err)
    }
}
