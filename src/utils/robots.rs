// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{fetch_with_retry, EngineError, FetchEngine, FetchRequest};
use crate::utils::retry_policy::RetryPolicy;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use robotstxt::DefaultMatcher;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use url::Url;

const ROBOTS_CACHE_CAPACITY: usize = 128;

/// Robots.txt checker interface.
#[async_trait]
pub trait RobotsCheckerTrait: Send + Sync {
    /// Whether `user_agent` may fetch `url_str`.
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool, EngineError>;
    /// `Crawl-delay` applicable to `user_agent`, if the site declares one.
    async fn crawl_delay(
        &self,
        url_str: &str,
        user_agent: &str,
    ) -> Result<Option<Duration>, EngineError>;
}

/// Cached robots.txt body.
struct CachedRobots {
    content: String,
    expires_at: Instant,
}

/// Robots.txt checker with an in-process LRU cache.
///
/// Fetch failures are fail-open: an unreachable robots.txt means "allow all".
/// SSRF validation still applies because the fetch goes through the engine.
pub struct RobotsChecker {
    engine: Arc<dyn FetchEngine>,
    cache: Mutex<LruCache<String, CachedRobots>>,
    retry_policy: RetryPolicy,
    fetch_timeout: Duration,
    cache_ttl: Duration,
}

impl RobotsChecker {
    pub fn new(engine: Arc<dyn FetchEngine>, fetch_timeout: Duration) -> Self {
        let capacity = NonZeroUsize::new(ROBOTS_CACHE_CAPACITY)
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            engine,
            cache: Mutex::new(LruCache::new(capacity)),
            retry_policy: RetryPolicy::fast(),
            fetch_timeout,
            cache_ttl: Duration::from_secs(3600),
        }
    }

    /// Fetch robots.txt for the URL's origin, going through the cache.
    async fn robots_content(&self, url_str: &str) -> Result<String, EngineError> {
        let url = Url::parse(url_str)?;
        let robots_url = format!("{}/robots.txt", crate::utils::url_utils::origin(&url));

        {
            let mut cache = self.cache.lock();
            if let Some(cached) = cache.get(&robots_url) {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.content.clone());
                }
                cache.pop(&robots_url);
            }
        }

        let request = FetchRequest::get(&robots_url).with_timeout(self.fetch_timeout);
        let content = match fetch_with_retry(self.engine.as_ref(), &request, &self.retry_policy)
            .await
        {
            Ok(resp) if resp.is_success() => {
                String::from_utf8_lossy(&resp.body).into_owned()
            }
            // 404 means no robots.txt; other terminal statuses are treated
            // the same way (fail-open).
            Ok(_) => String::new(),
            Err(EngineError::Ssrf(reason)) => {
                // Policy errors are not fail-open; the crawl of this host is
                // going to be rejected by the engine anyway.
                return Err(EngineError::Ssrf(reason));
            }
            Err(e) => {
                warn!("failed to fetch {}: {}", robots_url, e);
                String::new()
            }
        };

        let mut cache = self.cache.lock();
        cache.put(
            robots_url,
            CachedRobots {
                content: content.clone(),
                expires_at: Instant::now() + self.cache_ttl,
            },
        );

        Ok(content)
    }

    /// Parse the `Crawl-delay` directive applicable to `user_agent`.
    ///
    /// Simplified block matching: a specific user-agent block wins over the
    /// `*` block. Not a full RFC 9309 implementation, but sufficient for the
    /// directive, which the RFC does not standardize either.
    fn parse_crawl_delay(content: &str, user_agent: &str) -> Option<Duration> {
        let user_agent_lower = user_agent.to_lowercase();
        let mut current_agent_matched = false;
        let mut specific_agent_found = false;
        let mut delay: Option<f64> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let lower_line = line.to_lowercase();
            if let Some(agent) = lower_line.strip_prefix("user-agent:") {
                let agent = agent.trim();
                if agent == "*" {
                    current_agent_matched = !specific_agent_found;
                } else if user_agent_lower.contains(agent) {
                    current_agent_matched = true;
                    specific_agent_found = true;
                    delay = None;
                } else {
                    current_agent_matched = false;
                }
            } else if let Some(value) = lower_line.strip_prefix("crawl-delay:") {
                if current_agent_matched {
                    if let Ok(d) = value.trim().parse::<f64>() {
                        delay = Some(d);
                    }
                }
            }
        }

        delay.map(Duration::from_secs_f64)
    }
}

#[async_trait]
impl RobotsCheckerTrait for RobotsChecker {
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool, EngineError> {
        let content = self.robots_content(url_str).await?;
        if content.is_empty() {
            return Ok(true);
        }
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(&content, user_agent, url_str))
    }

    async fn crawl_delay(
        &self,
        url_str: &str,
        user_agent: &str,
    ) -> Result<Option<Duration>, EngineError> {
        let content = self.robots_content(url_str).await?;
        Ok(Self::parse_crawl_delay(&content, user_agent))
    }
}
