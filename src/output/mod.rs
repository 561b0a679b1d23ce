//! Output module for harvest progress reports
//!
//! This module handles:
//! - Loading progress statistics from storage
//! - Printing them for the operator

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};
