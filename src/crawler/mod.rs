//! Crawler module for the resumable catalog harvest
//!
//! This module contains the core crawling logic, including:
//! - Failure classification and bounded retry with proxy rotation
//! - Checkpointing recomputed from stored records
//! - Stateful pagination over one selected category
//! - The crawl driver and the pre-crawl lookup stages

mod checkpoint;
mod classifier;
mod driver;
mod lookup;
mod retry;
mod throttle;
mod walker;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use classifier::{classify, guard_page, probe_signals, FailureClass, Outcome, PageSignals};
pub use driver::{select_category, CategoryOutcome, Driver, PassReport};
pub use lookup::{import_codes, CensusReport, ResolveReport};
pub use retry::{Attempt, RetryController, RetryPolicy};
pub use throttle::Throttle;
pub use walker::PaginationWalker;

use crate::config::Config;
use crate::session::HttpBrowser;
use crate::storage::SqliteStorage;
use crate::HarvestError;
use std::path::Path;

/// Builds a driver over the HTTP session and the configured database
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash recorded with every pass
///
/// # Returns
///
/// * `Ok(Driver)` - Ready to run passes or lookup stages
/// * `Err(HarvestError)` - The database could not be opened
pub fn build_driver(
    config: Config,
    config_hash: &str,
) -> Result<Driver<HttpBrowser, SqliteStorage>, HarvestError> {
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let browser = HttpBrowser::new(&config.catalog);
    Driver::new(config, config_hash, browser, storage)
}

/// Runs the crawl loop
///
/// This is the main entry point for harvesting. It will:
/// 1. Open the durable state
/// 2. Run passes over every entity, resuming from stored records
/// 3. Sleep the cooldown between passes until `passes` is reached
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash recorded with every pass
/// * `passes` - Pass limit, overriding the configured one when set
pub async fn run_harvest(
    config: Config,
    config_hash: &str,
    passes: Option<u32>,
) -> Result<(), HarvestError> {
    let max_passes = passes.unwrap_or(config.driver.max_passes);
    let mut driver = build_driver(config, config_hash)?;
    driver.run_passes(max_passes).await
}
