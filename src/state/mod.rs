//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `EntityState`: Lifecycle of an entity (unresolved, unprepared, pending, done)
//! - `CategoryProgress`: Expected and stored record counts of one category
//! - `EntityProgress`: All category progress of one entity

mod entity_state;
mod progress;

// Re-export main types
pub use entity_state::EntityState;
pub use progress::{CategoryProgress, EntityProgress};
