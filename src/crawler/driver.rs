//! Crawl driver - the top-level harvest loop
//!
//! This module contains the loop that composes everything else:
//! - One pass over all entities, skipping those that cannot or need not be
//!   crawled
//! - Per category: guarded selection, pagination, per-page persistence
//! - Repeated passes separated by a cooldown, interruptible with Ctrl-C

use crate::catalog;
use crate::config::Config;
use crate::crawler::checkpoint::CheckpointStore;
use crate::crawler::classifier::guard_page;
use crate::crawler::retry::{Attempt, RetryController, RetryPolicy};
use crate::crawler::throttle::Throttle;
use crate::crawler::walker::PaginationWalker;
use crate::session::{Browser, Condition, Control, ProxyPool, Session, SessionManager, Target};
use crate::state::{CategoryProgress, EntityState};
use crate::storage::{EntityRecord, PassStatus, Storage};
use crate::{HarvestError, OpFailure};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Counters of one driver pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub pass_id: i64,
    pub entities_seen: u32,
    pub entities_crawled: u32,
    pub entities_done: u32,
    pub newly_done: u32,
    pub unresolved: u32,
    pub unprepared: u32,
    pub without_categories: u32,
    pub aborted: u32,
    pub records_written: u64,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pass {}: {} entities, {} crawled, {} done ({} new), {} unresolved, {} unprepared, {} without categories, {} aborted, {} records written",
            self.pass_id,
            self.entities_seen,
            self.entities_crawled,
            self.entities_done,
            self.newly_done,
            self.unresolved,
            self.unprepared,
            self.without_categories,
            self.aborted,
            self.records_written
        )
    }
}

/// What happened to one category in one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// Records were walked; the count of newly stored ones
    Harvested(u64),

    /// The catalog does not offer this category for the entity
    Unavailable,
}

/// Main crawl driver
pub struct Driver<B: Browser, S: Storage> {
    pub(crate) config: Config,
    pub(crate) config_hash: String,
    pub(crate) base_url: Url,
    pub(crate) sessions: SessionManager<B>,
    pub(crate) retry: RetryController,
    pub(crate) checkpoints: CheckpointStore<S>,
    pub(crate) throttle: Throttle,
    current_pass: Option<i64>,
}

impl<B: Browser, S: Storage> Driver<B, S> {
    /// Creates a new driver
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash recorded with every pass
    /// * `browser` - Session factory
    /// * `storage` - Durable state
    pub fn new(
        config: Config,
        config_hash: impl Into<String>,
        browser: B,
        storage: S,
    ) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.catalog.base_url)?;
        let sessions = SessionManager::new(
            browser,
            ProxyPool::from_config(&config.proxy),
            Duration::from_millis(config.catalog.wait_timeout_ms),
        );
        let retry = RetryController::new(RetryPolicy::from_config(&config.retry));
        let throttle = Throttle::from_config(&config.catalog);

        Ok(Self {
            config,
            config_hash: config_hash.into(),
            base_url,
            sessions,
            retry,
            checkpoints: CheckpointStore::new(storage),
            throttle,
            current_pass: None,
        })
    }

    pub fn storage(&self) -> &S {
        self.checkpoints.storage()
    }

    pub fn storage_mut(&mut self) -> &mut S {
        self.checkpoints.storage_mut()
    }

    pub fn sessions(&self) -> &SessionManager<B> {
        &self.sessions
    }

    /// Runs passes until `max_passes` is reached or Ctrl-C is pressed
    ///
    /// `max_passes == 0` runs until stopped. A pass aborted by pool
    /// exhaustion is logged and the next pass starts after the cooldown;
    /// any other pass-level error stops the loop.
    pub async fn run_passes(&mut self, max_passes: u32) -> Result<(), HarvestError> {
        let cooldown = Duration::from_secs(self.config.driver.cooldown_secs);
        let mut pass_number = 0u32;

        loop {
            pass_number += 1;
            tracing::info!("Starting pass {}", pass_number);

            let outcome = tokio::select! {
                result = self.run_pass() => Some(result),
                _ = tokio::signal::ctrl_c() => None,
            };

            match outcome {
                None => {
                    tracing::info!("Interrupted, stopping");
                    return self.interrupt().await;
                }
                Some(Ok(report)) => tracing::info!("Finished {}", report),
                Some(Err(e @ HarvestError::ProxyPoolExhausted { .. })) => {
                    tracing::error!("Pass {} aborted: {}", pass_number, e);
                }
                Some(Err(e)) => return Err(e),
            }

            if max_passes != 0 && pass_number >= max_passes {
                return Ok(());
            }

            tracing::info!("Sleeping {}s before the next pass", cooldown.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(cooldown) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted during cooldown, stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Runs one full pass over every entity
    pub async fn run_pass(&mut self) -> Result<PassReport, HarvestError> {
        let pass_id = self
            .checkpoints
            .storage_mut()
            .create_pass(&self.config_hash)?;
        self.current_pass = Some(pass_id);
        self.sessions.restart().await;

        let mut report = PassReport {
            pass_id,
            ..PassReport::default()
        };

        let result = self.crawl_entities(&mut report).await;
        self.sessions.close().await;
        self.current_pass = None;

        let status = match &result {
            Ok(()) => PassStatus::Completed,
            Err(e) => {
                tracing::error!("Pass {} failed: {}", pass_id, e);
                PassStatus::Failed
            }
        };
        self.storage_mut()
            .finish_pass(pass_id, status, report.entities_done)?;

        result.map(|()| report)
    }

    /// Marks the pass in flight as interrupted
    async fn interrupt(&mut self) -> Result<(), HarvestError> {
        self.sessions.close().await;
        if let Some(pass_id) = self.current_pass.take() {
            let done = self
                .storage()
                .list_entities()?
                .iter()
                .filter(|e| e.done)
                .count() as u32;
            self.storage_mut()
                .finish_pass(pass_id, PassStatus::Interrupted, done)?;
            tracing::info!("Pass {} recorded as interrupted", pass_id);
        }
        Ok(())
    }

    async fn crawl_entities(&mut self, report: &mut PassReport) -> Result<(), HarvestError> {
        let entities = self.storage().list_entities()?;
        tracing::info!("{} entities known", entities.len());

        for entity in entities {
            report.entities_seen += 1;

            match entity.state() {
                EntityState::Unresolved => {
                    tracing::debug!("Empty link for {}, skip", entity.code);
                    report.unresolved += 1;
                    continue;
                }
                EntityState::Done => {
                    report.entities_done += 1;
                    continue;
                }
                EntityState::Unprepared => {
                    tracing::warn!("{} has no category census yet, skip", entity.code);
                    report.unprepared += 1;
                    continue;
                }
                EntityState::Pending => {}
            }

            // Trust only what is stored: earlier passes may have finished it
            let checkpoint = self.checkpoints.recompute(&entity.code)?;
            if checkpoint.done {
                report.entities_done += 1;
                report.newly_done += u32::from(checkpoint.newly_done);
                continue;
            }
            if checkpoint.progress.categories.is_empty() {
                tracing::info!("No useful categories for {}, skip", entity.code);
                report.without_categories += 1;
                continue;
            }

            report.entities_crawled += 1;
            let parsed_before = checkpoint.progress.total_parsed();
            match self
                .crawl_entity(&entity, &checkpoint.progress.categories)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_entity_scoped() => {
                    tracing::error!("Entity {} aborted: {}", entity.code, e);
                    report.aborted += 1;
                }
                Err(e) => return Err(e),
            }

            // Pages stored by failed attempts count too
            let checkpoint = self.checkpoints.recompute(&entity.code)?;
            report.records_written += checkpoint
                .progress
                .total_parsed()
                .saturating_sub(parsed_before);
            if checkpoint.done {
                report.entities_done += 1;
                report.newly_done += 1;
            }
        }

        Ok(())
    }

    /// Crawls every incomplete category of one entity
    async fn crawl_entity(
        &mut self,
        entity: &EntityRecord,
        categories: &[CategoryProgress],
    ) -> Result<(), HarvestError> {
        let link = entity.link.as_deref().unwrap_or("");
        let entity_url = catalog::entity_url(&self.base_url, link)?;

        tracing::info!(
            "Crawling {} ({} of {} categories incomplete)",
            entity.code,
            categories.iter().filter(|c| !c.is_complete()).count(),
            categories.len()
        );

        for category in categories.iter().filter(|c| !c.is_complete()) {
            let mut harvest = CategoryHarvest {
                entity_code: &entity.code,
                entity_url: &entity_url,
                category_id: &category.category_id,
                amount: category.amount,
                page_size: u64::from(self.config.catalog.page_size),
                wait_timeout: self.sessions.wait_timeout(),
                checkpoints: &mut self.checkpoints,
                throttle: &mut self.throttle,
            };

            match self.retry.execute(&mut self.sessions, &mut harvest).await? {
                CategoryOutcome::Harvested(count) => {
                    tracing::debug!(
                        "Category {} of {}: {} new records",
                        category.category_id,
                        entity.code,
                        count
                    );
                }
                CategoryOutcome::Unavailable => {
                    tracing::info!(
                        "Category {} not available for {}, skip",
                        category.category_id,
                        entity.code
                    );
                }
            }
        }

        Ok(())
    }
}

/// Selects exactly one category on an entity page
///
/// Returns `Ok(false)` if the catalog does not list the category.
pub async fn select_category<S: Session + ?Sized>(
    session: &mut S,
    category_id: &str,
    timeout: Duration,
) -> Result<bool, OpFailure> {
    session.activate(&Control::ShowCategories).await?;
    session
        .wait_for(&Condition::Present(Target::CategoryTable), timeout)
        .await?;

    if !session
        .locate(&Target::CategoryRow(category_id.to_string()))
        .await?
    {
        return Ok(false);
    }

    session
        .activate(&Control::ChooseCategory(category_id.to_string()))
        .await?;
    session.wait_for(&Condition::Loaded, timeout).await?;
    guard_page(session).await?;
    Ok(true)
}

/// One attempt at harvesting the rest of a category
///
/// Every run re-opens the entity page and re-selects the category, then
/// resumes from the durable record count, so a retry after a lost
/// selection or a rotation never repeats stored rows.
struct CategoryHarvest<'a, S: Storage> {
    entity_code: &'a str,
    entity_url: &'a Url,
    category_id: &'a str,
    amount: u64,
    page_size: u64,
    wait_timeout: Duration,
    checkpoints: &'a mut CheckpointStore<S>,
    throttle: &'a mut Throttle,
}

#[async_trait(?Send)]
impl<'a, B: Browser, S: Storage> Attempt<B> for CategoryHarvest<'a, S> {
    type Output = CategoryOutcome;

    fn describe(&self) -> String {
        format!("category {} of {}", self.category_id, self.entity_code)
    }

    async fn run(
        &mut self,
        sessions: &mut SessionManager<B>,
    ) -> Result<CategoryOutcome, HarvestError> {
        self.throttle.pause().await;
        let session = sessions.open(self.entity_url).await?;

        if !select_category(&mut *session, self.category_id, self.wait_timeout).await? {
            return Ok(CategoryOutcome::Unavailable);
        }

        let already = self
            .checkpoints
            .durable_count(self.entity_code, self.category_id)?;
        if already >= self.amount {
            return Ok(CategoryOutcome::Harvested(0));
        }

        let mut walker = PaginationWalker::new(session, already, self.page_size, self.wait_timeout);
        let mut written = 0u64;

        while let Some(mut batch) = walker.next_page().await? {
            let remaining = self.amount - (already + written);
            batch.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));

            self.checkpoints
                .append_page(self.entity_code, self.category_id, &batch)?;
            written += batch.len() as u64;
            self.checkpoints.recompute(self.entity_code)?;

            tracing::info!(
                "{} / {}: {} of {} records (page {})",
                self.entity_code,
                self.category_id,
                already + written,
                self.amount,
                walker.current_page()
            );

            if already + written >= self.amount {
                break;
            }
            self.throttle.pause().await;
        }

        Ok(CategoryOutcome::Harvested(written))
    }
}
