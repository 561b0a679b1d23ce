//! Storage module for persisting harvest state
//!
//! This module holds everything that must survive an interrupted crawl:
//! - Name to identifier mapping (pre-crawl input)
//! - Identifier to remote link mapping (empty link = not found)
//! - Per-entity category state
//! - Append-only per-category record tables
//! - Permanent done markers
//! - Pass tracking
//!
//! Every entity has a single writer. Shards that share one database must own
//! disjoint sets of entities.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{init_database, SqliteStorage};
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::EntityState;
use crate::HarvestError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// One harvested publication row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Catalog identifier of the publication
    pub remote_id: String,

    /// Publication title (lowercased by the extractor)
    pub title: String,

    /// Link to the publication page, as rendered by the catalog
    pub link: String,
}

/// A record together with its 1-based position in the category listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedRecord {
    pub position: u64,
    pub record: Record,
}

/// An entity as known to durable storage
#[derive(Debug, Clone)]
pub struct EntityRecord {
    /// Stable entity code (ISSN)
    pub code: String,

    /// Remote link; `None` = never looked up, `Some("")` = not found
    pub link: Option<String>,

    /// Whether the category census has run for this entity
    pub prepared: bool,

    /// Whether the permanent done marker exists
    pub done: bool,
}

impl EntityRecord {
    /// Derives the lifecycle state of this entity
    pub fn state(&self) -> EntityState {
        EntityState::derive(self.link.as_deref().unwrap_or(""), self.prepared, self.done)
    }
}

/// Represents one full driver pass
#[derive(Debug, Clone)]
pub struct PassRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: PassStatus,
    pub entities_done: u32,
}

/// Status of a driver pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl PassStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
