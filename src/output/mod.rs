//! Output module for mirror summaries
//!
//! This module handles reading back the manifest of a finished or
//! interrupted mirror run and presenting its statistics.

pub mod stats;

pub use stats::{load_statistics, print_statistics, MirrorStatistics};
