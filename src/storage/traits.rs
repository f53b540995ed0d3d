//! Storage traits and error types
//!
//! This module defines the trait interface for manifest backends and
//! associated error types.

use crate::archive::ResourceRecord;
use crate::state::PageState;
use crate::storage::{PageRecord, PageUpdate, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for manifest backend implementations
///
/// The manifest records what a mirror run did. It is written as the crawl
/// progresses and read back for statistics; the crawl itself never depends
/// on anything read from it.
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new mirror run
    ///
    /// # Arguments
    ///
    /// * `seed_url` - The seed URL of the run
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Page Tracking =====

    /// Inserts or replaces the record of a page target
    fn record_page(&mut self, run_id: i64, page: &PageUpdate<'_>) -> StorageResult<()>;

    /// Gets a page by URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    // ===== Resource Tracking =====

    /// Inserts or replaces the record of an archived resource
    fn record_resource(&mut self, run_id: i64, resource: &ResourceRecord) -> StorageResult<()>;

    /// Gets an archived resource by source URL
    fn get_resource(&self, url: &str) -> StorageResult<Option<ResourceRecord>>;

    // ===== Statistics =====

    /// Counts pages by state
    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64>;

    /// Gets total page count
    fn count_total_pages(&self) -> StorageResult<u64>;

    /// Gets total archived resource count
    fn count_resources(&self) -> StorageResult<u64>;

    /// Gets the total number of render attempts across all pages
    fn count_attempts(&self) -> StorageResult<u64>;
}
