//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest progress from the storage layer.

use crate::state::EntityState;
use crate::storage::{PassRecord, Storage};
use crate::HarvestError;
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of entities known
    pub total_entities: u64,

    /// Count of entities by lifecycle state
    pub entities_by_state: HashMap<EntityState, u64>,

    /// Categories whose stored records meet their amount
    pub categories_complete: u64,

    /// All categories across entities
    pub categories_total: u64,

    /// Records stored across all categories
    pub total_records: u64,

    /// Number of driver passes recorded
    pub passes: u64,

    /// The most recent pass, if any
    pub latest_pass: Option<PassRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let entities = storage.list_entities()?;

    let mut entities_by_state = HashMap::new();
    for entity in &entities {
        *entities_by_state.entry(entity.state()).or_insert(0) += 1;
    }

    let (categories_complete, categories_total) = storage.count_categories()?;

    Ok(HarvestStatistics {
        total_entities: entities.len() as u64,
        entities_by_state,
        categories_complete,
        categories_total,
        total_records: storage.count_total_records()?,
        passes: storage.count_passes()?,
        latest_pass: storage.get_latest_pass()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Entities: {}", stats.total_entities);
    println!(
        "  Categories complete: {} / {}",
        stats.categories_complete, stats.categories_total
    );
    println!("  Records stored: {}", stats.total_records);
    println!("  Passes: {}", stats.passes);
    println!();

    println!("Entities by State:");
    for state in EntityState::all_states() {
        let count = stats.entities_by_state.get(&state).copied().unwrap_or(0);
        let percentage = if stats.total_entities > 0 {
            (count as f64 / stats.total_entities as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if let Some(pass) = &stats.latest_pass {
        println!("Latest Pass:");
        println!("  #{} {}", pass.id, pass.status.to_db_string());
        println!("  Started: {}", pass.started_at);
        if let Some(finished) = &pass.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Entities done: {}", pass.entities_done);
    }
}
