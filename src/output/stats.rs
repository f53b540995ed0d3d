//! Statistics generation from the mirror manifest
//!
//! This module provides functionality for extracting and displaying
//! mirror statistics from the storage layer.

use crate::state::PageState;
use crate::storage::{RunRecord, Storage};
use crate::MirrorError;
use std::collections::HashMap;

/// Mirror statistics summary
#[derive(Debug, Clone)]
pub struct MirrorStatistics {
    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Total number of page targets recorded
    pub total_pages: u64,

    /// Count of pages by state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Number of archived resources
    pub total_resources: u64,

    /// Render attempts across all pages
    pub total_attempts: u64,
}

impl MirrorStatistics {
    pub fn count(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Pages that reached a final state: saved, given up or dropped
    pub fn finished(&self) -> u64 {
        self.pages_by_state
            .iter()
            .filter(|(state, _)| state.is_terminal())
            .map(|(_, count)| count)
            .sum()
    }

    /// Pages last recorded between retries, left behind by an interrupted run
    pub fn awaiting_retry(&self) -> u64 {
        self.pages_by_state
            .iter()
            .filter(|(state, _)| state.is_retry())
            .map(|(_, count)| count)
            .sum()
    }

    /// Renders beyond the first attempt of each page
    pub fn retries(&self) -> u64 {
        let rendered = self.total_pages - self.count(PageState::DepthExceeded);
        self.total_attempts.saturating_sub(rendered)
    }

    /// Seconds between run start and finish, when the run finished
    pub fn duration_seconds(&self) -> Option<i64> {
        let run = self.latest_run.as_ref()?;
        let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
        let finished = run
            .finished_at
            .as_ref()?
            .parse::<chrono::DateTime<chrono::Utc>>()
            .ok()?;
        Some((finished - started).num_seconds())
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(MirrorStatistics)` - Successfully loaded statistics
/// * `Err(MirrorError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<MirrorStatistics, MirrorError> {
    let latest_run = storage.get_latest_run()?;
    let total_pages = storage.count_total_pages()?;
    let total_resources = storage.count_resources()?;
    let total_attempts = storage.count_attempts()?;

    let mut pages_by_state = HashMap::new();
    for state in PageState::all_states() {
        let count = storage.count_pages_by_state(state)?;
        if count > 0 {
            pages_by_state.insert(state, count);
        }
    }

    Ok(MirrorStatistics {
        latest_run,
        total_pages,
        pages_by_state,
        total_resources,
        total_attempts,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &MirrorStatistics) {
    println!("=== Mirror Statistics ===\n");

    if let Some(run) = &stats.latest_run {
        println!("Latest run #{}:", run.id);
        println!("  Seed: {}", run.seed_url);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        if let Some(seconds) = stats.duration_seconds() {
            println!("  Duration: {}s", seconds);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!();
    }

    println!("Overview:");
    println!("  Total pages recorded: {}", stats.total_pages);
    println!("  Resources archived: {}", stats.total_resources);
    println!("  Finished: {}", stats.finished());
    println!("  Retries: {}", stats.retries());
    let awaiting = stats.awaiting_retry();
    if awaiting > 0 {
        println!("  Awaiting retry: {}", awaiting);
    }
    println!();

    println!("Pages by State:");
    let mut state_counts: Vec<_> = stats.pages_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (state, count) in state_counts {
        let percentage = if stats.total_pages > 0 {
            (*count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    let saved = stats.count(PageState::Saved);
    let success_rate = if stats.total_pages > 0 {
        (saved as f64 / stats.total_pages as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages saved)",
        success_rate, saved, stats.total_pages
    );
}
