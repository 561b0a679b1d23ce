//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::CategoryProgress;
use crate::storage::{EntityRecord, PassRecord, PassStatus, PositionedRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Pass not found: {0}")]
    PassNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes are never retried by callers: a failed write surfaces as an error
/// and stops the pass, because a lost resume point is worse than a stop.
pub trait Storage {
    // ===== Pass Management =====

    /// Creates a new pass and returns its ID
    fn create_pass(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a pass by ID
    fn get_pass(&self, pass_id: i64) -> StorageResult<PassRecord>;

    /// Gets the most recent pass
    fn get_latest_pass(&self) -> StorageResult<Option<PassRecord>>;

    /// Closes a pass with its final status and the number of entities done so far
    fn finish_pass(
        &mut self,
        pass_id: i64,
        status: PassStatus,
        entities_done: u32,
    ) -> StorageResult<()>;

    /// Counts all recorded passes
    fn count_passes(&self) -> StorageResult<u64>;

    // ===== Names and Links =====

    /// Records the identifiers known for an entity name, in preference order
    ///
    /// Also registers every identifier as an entity without a link.
    fn add_entity_names(&mut self, name: &str, codes: &[String]) -> StorageResult<()>;

    /// Lists every name with its identifiers in preference order
    fn list_entity_names(&self) -> StorageResult<Vec<(String, Vec<String>)>>;

    /// Gets the stored link of an entity
    ///
    /// `None` means the identifier was never looked up, `Some("")` means
    /// the lookup found nothing.
    fn get_link(&self, code: &str) -> StorageResult<Option<String>>;

    /// Stores the link of an entity, creating the entity if needed
    fn set_link(&mut self, code: &str, link: &str) -> StorageResult<()>;

    /// Lists all entities ordered by code
    fn list_entities(&self) -> StorageResult<Vec<EntityRecord>>;

    // ===== Category State =====

    /// Replaces the category state of an entity and sets its census marker
    fn replace_categories(
        &mut self,
        code: &str,
        categories: &[CategoryProgress],
    ) -> StorageResult<()>;

    /// Loads the category state of an entity ordered by category id
    fn load_categories(&self, code: &str) -> StorageResult<Vec<CategoryProgress>>;

    /// Returns true if the census marker exists for an entity
    fn is_prepared(&self, code: &str) -> StorageResult<bool>;

    /// Updates the stored parsed count of one category
    fn update_parsed(&mut self, code: &str, category_id: &str, parsed: u64) -> StorageResult<()>;

    // ===== Records =====

    /// Appends one page of records atomically
    ///
    /// Positions must continue the stored sequence without gaps; anything
    /// else is a constraint violation and nothing is written.
    fn append_records(
        &mut self,
        code: &str,
        category_id: &str,
        records: &[PositionedRecord],
    ) -> StorageResult<()>;

    /// Counts the stored records of one category
    fn count_records(&self, code: &str, category_id: &str) -> StorageResult<u64>;

    /// Loads the stored records of one category in position order
    fn load_records(&self, code: &str, category_id: &str) -> StorageResult<Vec<PositionedRecord>>;

    // ===== Done Markers =====

    /// Writes the permanent done marker; returns true if it was newly written
    fn mark_done(&mut self, code: &str) -> StorageResult<bool>;

    /// Returns true if the done marker exists
    fn is_done(&self, code: &str) -> StorageResult<bool>;

    // ===== Statistics =====

    /// Counts all stored records
    fn count_total_records(&self) -> StorageResult<u64>;

    /// Counts (complete, total) categories across all entities
    fn count_categories(&self) -> StorageResult<(u64, u64)>;
}
