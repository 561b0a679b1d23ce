//! Checkpoint store
//!
//! Progress is derived, never trusted: `parsed` is always recomputed from
//! the number of durably stored records, so a crash between a record write
//! and a counter update can never skip or repeat work.

use crate::state::{CategoryProgress, EntityProgress};
use crate::storage::{PositionedRecord, Storage};
use crate::HarvestError;

/// Result of recomputing an entity's progress
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub progress: EntityProgress,

    /// The done marker exists after this recompute
    pub done: bool,

    /// The done marker was written by this recompute
    pub newly_done: bool,
}

/// Loads, derives and persists per-entity progress
pub struct CheckpointStore<S: Storage> {
    storage: S,
}

impl<S: Storage> CheckpointStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Loads the stored category state of an entity
    pub fn load(&self, code: &str) -> Result<Vec<CategoryProgress>, HarvestError> {
        Ok(self.storage.load_categories(code)?)
    }

    /// Number of records durably stored for one category
    pub fn durable_count(&self, code: &str, category_id: &str) -> Result<u64, HarvestError> {
        Ok(self.storage.count_records(code, category_id)?)
    }

    /// Appends one page of records in a single transaction
    pub fn append_page(
        &mut self,
        code: &str,
        category_id: &str,
        records: &[PositionedRecord],
    ) -> Result<(), HarvestError> {
        if records.is_empty() {
            return Ok(());
        }
        self.storage.append_records(code, category_id, records)?;
        Ok(())
    }

    /// Re-derives every category's `parsed` from its stored records
    ///
    /// Persists changed counts and writes the permanent done marker once
    /// every category meets its amount. Safe to call any number of times.
    pub fn recompute(&mut self, code: &str) -> Result<Checkpoint, HarvestError> {
        let mut categories = self.storage.load_categories(code)?;

        for category in &mut categories {
            let parsed = self.storage.count_records(code, &category.category_id)?;
            if parsed != category.parsed {
                self.storage
                    .update_parsed(code, &category.category_id, parsed)?;
                category.parsed = parsed;
            }
        }

        let progress = EntityProgress {
            entity_code: code.to_string(),
            categories,
        };

        let newly_done = if progress.all_complete() {
            self.storage.mark_done(code)?
        } else {
            false
        };
        let done = newly_done || self.storage.is_done(code)?;

        if newly_done {
            tracing::info!(
                "Entity {} done: {} records in {} categories",
                code,
                progress.total_parsed(),
                progress.categories.len()
            );
        }

        Ok(Checkpoint {
            progress,
            done,
            newly_done,
        })
    }

    /// Returns true if the entity carries the done marker
    pub fn is_done(&self, code: &str) -> Result<bool, HarvestError> {
        Ok(self.storage.is_done(code)?)
    }
}
