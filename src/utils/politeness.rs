// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Per-host minimum-delay limiter.
///
/// Concurrent fetch tasks share one limiter; each call reserves the next
/// available slot for its host and sleeps until that slot. Requests to
/// different hosts never wait on each other.
pub struct HostLimiter {
    min_delay: Duration,
    next_slot: DashMap<String, Instant>,
}

impl HostLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: DashMap::new(),
        }
    }

    /// Wait until a request to `host` is allowed.
    ///
    /// `override_delay` replaces the configured minimum when larger; it
    /// carries a robots.txt `Crawl-delay` for this host.
    pub async fn acquire(&self, host: &str, override_delay: Option<Duration>) {
        let delay = override_delay
            .filter(|d| *d > self.min_delay)
            .unwrap_or(self.min_delay);
        if delay.is_zero() {
            return;
        }

        let now = Instant::now();
        let wait = {
            let mut slot = self.next_slot.entry(host.to_string()).or_insert(now);
            if *slot > now {
                let wait = *slot - now;
                *slot += delay;
                wait
            } else {
                *slot = now + delay;
                Duration::ZERO
            }
        };

        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_passes_immediately() {
        let limiter = HostLimiter::new(Duration::from_secs(1));
        let started = Instant::now();
        limiter.acquire("dno.de:443", None).await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_waits_for_slot() {
        let limiter = HostLimiter::new(Duration::from_secs(1));
        let started = Instant::now();
        limiter.acquire("dno.de:443", None).await;
        limiter.acquire("dno.de:443", None).await;
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hosts_do_not_block_each_other() {
        let limiter = HostLimiter::new(Duration::from_secs(1));
        let started = Instant::now();
        limiter.acquire("a.de:443", None).await;
        limiter.acquire("b.de:443", None).await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_longer_robots_delay_wins() {
        let limiter = HostLimiter::new(Duration::from_secs(1));
        let started = Instant::now();
        limiter
            .acquire("a.de:443", Some(Duration::from_secs(5)))
            .await;
        limiter.acquire("a.de:443", None).await;
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_disables_limiting() {
        let limiter = HostLimiter::new(Duration::ZERO);
        let started = Instant::now();
        for _ in 0..10 {
            limiter.acquire("a.de:443", None).await;
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
