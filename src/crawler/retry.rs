//! Retry controller
//!
//! A single bounded retry combinator reused by every guarded operation.
//! Only page failures (`HarvestError::Page`) are classified and retried;
//! storage and every other error propagate on the first occurrence.

use crate::config::RetryConfig;
use crate::crawler::classifier::{classify, FailureClass, Outcome};
use crate::session::{Browser, SessionManager};
use crate::HarvestError;
use async_trait::async_trait;
use std::time::Duration;

/// How failed attempts are retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Consecutive failures tolerated; the next failure gives up
    pub max_attempts: u32,

    /// Rotate the identity on transient failures too
    pub rotate_on_transient: bool,

    /// Pause before the next attempt
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            rotate_on_transient: config.rotate_on_transient,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Returns true if a failure of this class must switch identity
    pub fn rotates(&self, class: FailureClass) -> bool {
        class.requires_rotation() || (class == FailureClass::Transient && self.rotate_on_transient)
    }
}

/// One guarded operation that can be attempted repeatedly
///
/// Each run must start from scratch: it re-opens whatever pages it needs
/// through the session manager, so a retry after rotation lands on a fresh
/// session.
#[async_trait(?Send)]
pub trait Attempt<B: Browser> {
    type Output;

    /// Short description for logs and errors
    fn describe(&self) -> String;

    /// Runs the operation once
    async fn run(&mut self, sessions: &mut SessionManager<B>) -> Result<Self::Output, HarvestError>;
}

/// Executes attempts under a retry policy
#[derive(Debug, Clone)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs the attempt until it succeeds or the policy gives up
    ///
    /// # Returns
    ///
    /// * `Ok(output)` - An attempt succeeded
    /// * `Err(Unrecoverable)` - A failure classified as fatal
    /// * `Err(AttemptsExhausted)` - `max_attempts + 1` attempts in a row failed
    /// * `Err(ProxyPoolExhausted)` - A rotation was due but no identity was left
    /// * `Err(other)` - A non-page error, never retried
    pub async fn execute<B, A>(
        &self,
        sessions: &mut SessionManager<B>,
        attempt: &mut A,
    ) -> Result<A::Output, HarvestError>
    where
        B: Browser,
        A: Attempt<B>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempt_number = 0;

        loop {
            attempt_number += 1;

            let failure = match attempt.run(sessions).await {
                Ok(output) => return Ok(output),
                Err(HarvestError::Page(failure)) => failure,
                Err(other) => return Err(other),
            };

            let class = classify(&Outcome::Failed(&failure));
            tracing::warn!(
                "{} failed (attempt {}/{}, {:?}, identity {}): {}",
                attempt.describe(),
                attempt_number,
                max_attempts + 1,
                class,
                sessions.identity(),
                failure
            );

            if !class.is_retryable() {
                return Err(HarvestError::Unrecoverable {
                    operation: attempt.describe(),
                    message: failure.to_string(),
                });
            }

            if attempt_number > max_attempts {
                return Err(HarvestError::AttemptsExhausted {
                    operation: attempt.describe(),
                    attempts: attempt_number,
                    last: failure,
                });
            }

            if self.policy.rotates(class) && !sessions.rotate().await {
                return Err(HarvestError::ProxyPoolExhausted {
                    index: sessions.identity().index,
                });
            }

            if !self.policy.retry_delay.is_zero() {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }
    }
}
