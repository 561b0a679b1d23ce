//! Session manager
//!
//! Owns the proxy pool and the single live session. Sessions are replaced,
//! never rebound: rotating closes the current session and the next `open`
//! launches a fresh one on the new identity.

use crate::crawler::guard_page;
use crate::session::{Browser, Condition, ProxyIdentity, ProxyPool, Session};
use crate::OpFailure;
use std::time::Duration;
use url::Url;

/// Owns identity rotation and (re)creates sessions
pub struct SessionManager<B: Browser> {
    browser: B,
    pool: ProxyPool,
    session: Option<B::Session>,
    wait_timeout: Duration,
}

impl<B: Browser> SessionManager<B> {
    /// Creates a new session manager
    ///
    /// # Arguments
    ///
    /// * `browser` - Factory for new sessions
    /// * `pool` - The identities to rotate through
    /// * `wait_timeout` - Bound on every page-load wait
    pub fn new(browser: B, pool: ProxyPool, wait_timeout: Duration) -> Self {
        Self {
            browser,
            pool,
            session: None,
            wait_timeout,
        }
    }

    /// Opens a URL in a session bound to the current identity
    ///
    /// Launches the session if none is live. This is a single attempt: a
    /// failure is returned as-is for the retry controller to classify, and
    /// a page carrying a block, challenge or server error signal counts as
    /// a failure.
    pub async fn open(&mut self, url: &Url) -> Result<&mut B::Session, OpFailure> {
        if self.session.is_none() {
            tracing::debug!("Launching session on identity {}", self.pool.current());
            let session = self.browser.launch(self.pool.current()).await?;
            self.session = Some(session);
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| OpFailure::Unexpected("session was not launched".to_string()))?;

        session.navigate(url).await?;
        session
            .wait_for(&Condition::Loaded, self.wait_timeout)
            .await?;
        guard_page(&mut *session).await?;

        Ok(session)
    }

    /// The live session, if any
    pub fn session_mut(&mut self) -> Option<&mut B::Session> {
        self.session.as_mut()
    }

    /// Advances to the next identity
    ///
    /// Closes the live session so the next `open` is bound to the new
    /// identity. Returns false and changes nothing if the pool is exhausted.
    pub async fn rotate(&mut self) -> bool {
        let previous = self.pool.current().index;
        if !self.pool.advance() {
            tracing::warn!(
                "Proxy pool exhausted at identity #{} (ceiling {})",
                previous,
                self.pool.ceiling()
            );
            return false;
        }

        self.close().await;
        tracing::info!(
            "Rotated identity #{} -> {} ({} left)",
            previous,
            self.pool.current(),
            self.pool.remaining()
        );
        true
    }

    /// Closes the live session, keeping the current identity
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }

    /// Closes the live session and starts the pool over
    pub async fn restart(&mut self) {
        self.close().await;
        self.pool.reset();
    }

    /// The identity sessions are currently bound to
    pub fn identity(&self) -> &ProxyIdentity {
        self.pool.current()
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }
}
