//! Courtesy delay between catalog requests
//!
//! Keeps a minimum time between consecutive page interactions, plus an
//! optional random jitter, to stay under the catalog's rate limits.

use crate::config::CatalogConfig;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Enforces the courtesy delay
#[derive(Debug, Clone)]
pub struct Throttle {
    delay: Duration,
    jitter: Duration,
    last_request_time: Option<Instant>,
}

impl Throttle {
    pub fn new(delay: Duration, jitter: Duration) -> Self {
        Self {
            delay,
            jitter,
            last_request_time: None,
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(
            Duration::from_millis(config.courtesy_delay_ms),
            Duration::from_millis(config.courtesy_jitter_ms),
        )
    }

    /// The delay to keep before the next request: base delay plus jitter
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(jitter_ms)
    }

    /// Time left until a request with the given delay is allowed
    pub fn time_until_ready(&self, now: Instant, delay: Duration) -> Duration {
        match self.last_request_time {
            Some(last) => delay.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Waits out the courtesy delay, then records a request
    pub async fn pause(&mut self) {
        let wait = self.time_until_ready(Instant::now(), self.next_delay());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.last_request_time = Some(Instant::now());
    }
}
