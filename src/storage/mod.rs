//! Storage module for the mirror manifest
//!
//! This module handles all database operations for the mirror, including:
//! - SQLite database initialization and schema management
//! - Run tracking
//! - Page outcome and resource archive records

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::PageState;
use crate::MirrorError;

use std::path::Path;

/// Initializes or opens a manifest database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(MirrorError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, MirrorError> {
    Ok(SqliteStorage::new(path)?)
}

/// Represents a page in the manifest
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub url: String,
    pub run_id: i64,
    pub depth: u32,
    pub state: PageState,
    pub status_code: Option<u16>,
    pub local_path: Option<String>,
    pub attempts: u32,
    pub updated_at: String,
}

/// The latest observation of a page, as written by the orchestrator
#[derive(Debug, Clone)]
pub struct PageUpdate<'a> {
    pub url: &'a str,
    pub depth: u32,
    pub state: PageState,
    pub status_code: Option<u16>,
    pub local_path: Option<&'a str>,
    pub attempts: u32,
}

/// Represents a mirror run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub seed_url: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a mirror run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }
}
