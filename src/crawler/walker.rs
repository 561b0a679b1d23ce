//! Pagination walker
//!
//! Walks the listing of one selected category, one page per call, starting
//! from the page that holds the first record not yet stored. The catalog
//! keeps the selection server-side and can drop it at any time, so every
//! page re-checks the selection marker before its rows are trusted.
//!
//! A walker is finite and cannot be restarted: after a failure the caller
//! re-selects the category and builds a new walker from the new durable
//! count.

use crate::catalog::Extract;
use crate::crawler::classifier::guard_page;
use crate::session::{Condition, Control, Session, Target};
use crate::storage::PositionedRecord;
use crate::OpFailure;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    NotStarted,
    MorePages,
    Finished,
}

/// Resumable traversal of a paginated, server-side stateful listing
pub struct PaginationWalker<'s, S: Session> {
    session: &'s mut S,
    already_parsed: u64,
    page_size: u64,
    wait_timeout: Duration,
    page: u64,
    position: u64,
    state: WalkState,
}

impl<'s, S: Session> PaginationWalker<'s, S> {
    /// Creates a walker over the listing currently shown by the session
    ///
    /// # Arguments
    ///
    /// * `session` - A session whose category was just selected
    /// * `already_parsed` - Records durably stored for this category
    /// * `page_size` - Rows per listing page
    /// * `wait_timeout` - Bound on waiting for the result table
    pub fn new(
        session: &'s mut S,
        already_parsed: u64,
        page_size: u64,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            session,
            already_parsed,
            page_size: page_size.max(1),
            wait_timeout,
            page: 0,
            position: 0,
            state: WalkState::NotStarted,
        }
    }

    /// The 1-based page holding the first record after `already_parsed`
    pub fn start_page(already_parsed: u64, page_size: u64) -> u64 {
        already_parsed / page_size.max(1) + 1
    }

    /// The page most recently rendered, 0 before the first call
    pub fn current_page(&self) -> u64 {
        self.page
    }

    /// Returns the new records of the next page
    ///
    /// Rows at positions up to `already_parsed` are skipped. Returns
    /// `Ok(None)` once the listing has no further page. After an error the
    /// walker is finished.
    pub async fn next_page(&mut self) -> Result<Option<Vec<PositionedRecord>>, OpFailure> {
        let result = self.advance().await;
        if result.is_err() {
            self.state = WalkState::Finished;
        }
        result
    }

    async fn advance(&mut self) -> Result<Option<Vec<PositionedRecord>>, OpFailure> {
        match self.state {
            WalkState::Finished => return Ok(None),
            WalkState::NotStarted => self.enter_start_page().await?,
            WalkState::MorePages => {
                self.session.activate(&Control::NextPage).await?;
                self.page += 1;
            }
        }

        // (a) the page and the server-side selection must both be intact
        guard_page(&mut *self.session).await?;
        self.session
            .wait_for(&Condition::Present(Target::ResultTable), self.wait_timeout)
            .await?;
        if !self.session.locate(&Target::ActiveSelection).await? {
            return Err(OpFailure::SelectionLost);
        }

        // (b) rows beyond the resume point
        let rows = self
            .session
            .extract(Extract::Publications)
            .await?
            .into_publications()?;

        let mut batch = Vec::with_capacity(rows.len());
        for record in rows {
            self.position += 1;
            if self.position <= self.already_parsed {
                continue;
            }
            batch.push(PositionedRecord {
                position: self.position,
                record,
            });
        }

        // (c) continue only if the catalog offers a next page
        self.state = if self.session.locate(&Target::NextPage).await? {
            WalkState::MorePages
        } else {
            WalkState::Finished
        };

        Ok(Some(batch))
    }

    async fn enter_start_page(&mut self) -> Result<(), OpFailure> {
        let start = Self::start_page(self.already_parsed, self.page_size);

        self.session
            .wait_for(&Condition::Present(Target::ResultTable), self.wait_timeout)
            .await?;

        if start > 1 {
            tracing::debug!("Resuming at page {} after {} records", start, self.already_parsed);
            self.session.activate(&Control::GotoPage(start)).await?;
            self.session
                .wait_for(&Condition::Loaded, self.wait_timeout)
                .await?;
        }

        self.page = start;
        self.position = (start - 1) * self.page_size;
        Ok(())
    }
}
