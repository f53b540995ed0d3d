//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::archive::ResourceRecord;
use crate::state::PageState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{PageRecord, PageUpdate, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database, for tests and throwaway runs
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        seed_url: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Failed),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (seed_url, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![seed_url, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, seed_url, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, seed_url, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Page Tracking =====

    fn record_page(&mut self, run_id: i64, page: &PageUpdate<'_>) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO pages (url, run_id, depth, state, status_code, local_path, attempts, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(url) DO UPDATE SET
                run_id = excluded.run_id,
                depth = excluded.depth,
                state = excluded.state,
                status_code = excluded.status_code,
                local_path = COALESCE(excluded.local_path, pages.local_path),
                attempts = excluded.attempts,
                updated_at = excluded.updated_at",
            params![
                page.url,
                run_id,
                page.depth,
                page.state.to_db_string(),
                page.status_code,
                page.local_path,
                page.attempts,
                now
            ],
        )?;
        Ok(())
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                "SELECT url, run_id, depth, state, status_code, local_path, attempts, updated_at
                 FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(PageRecord {
                        url: row.get(0)?,
                        run_id: row.get(1)?,
                        depth: row.get(2)?,
                        state: PageState::from_db_string(&row.get::<_, String>(3)?)
                            .unwrap_or(PageState::Pending),
                        status_code: row.get(4)?,
                        local_path: row.get(5)?,
                        attempts: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?;

        Ok(page)
    }

    // ===== Resource Tracking =====

    fn record_resource(&mut self, run_id: i64, resource: &ResourceRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO resources (url, run_id, content_hash, local_path, content_type, archived_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                resource.source_url,
                run_id,
                resource.content_hash,
                resource.local_path,
                resource.content_type,
                now
            ],
        )?;
        Ok(())
    }

    fn get_resource(&self, url: &str) -> StorageResult<Option<ResourceRecord>> {
        let resource = self
            .conn
            .query_row(
                "SELECT url, content_hash, local_path, content_type FROM resources WHERE url = ?1",
                params![url],
                |row| {
                    Ok(ResourceRecord {
                        source_url: row.get(0)?,
                        content_hash: row.get(1)?,
                        local_path: row.get(2)?,
                        content_type: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(resource)
    }

    // ===== Statistics =====

    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_resources(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_attempts(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(attempts), 0) FROM pages",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn page<'a>(url: &'a str, state: PageState, attempts: u32) -> PageUpdate<'a> {
        PageUpdate {
            url,
            depth: 1,
            state,
            status_code: None,
            local_path: None,
            attempts,
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_create_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.sqlite");
        let mut storage = SqliteStorage::new(&path).unwrap();
        storage.create_run("https://a.com/", "hash").unwrap();
        drop(storage);

        let reopened = SqliteStorage::new(&path).unwrap();
        assert!(reopened.get_latest_run().unwrap().is_some());
    }

    #[test]
    fn test_create_and_finish_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("https://a.com/", "abc123").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.seed_url, "https://a.com/");
        assert_eq!(run.config_hash, "abc123");
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        storage.finish_run(run_id, RunStatus::Completed).unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(storage.get_run(42), Err(StorageError::RunNotFound(42))));
        assert!(matches!(
            storage.finish_run(42, RunStatus::Completed),
            Err(StorageError::RunNotFound(42))
        ));
        assert!(storage.get_latest_run().unwrap().is_none());
    }

    #[test]
    fn test_record_page_upserts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("https://a.com/", "h").unwrap();

        storage
            .record_page(run_id, &page("https://a.com/x", PageState::LoadFailedRetry, 1))
            .unwrap();

        let saved = PageUpdate {
            status_code: Some(200),
            local_path: Some("a.com/x.html"),
            ..page("https://a.com/x", PageState::Saved, 2)
        };
        storage.record_page(run_id, &saved).unwrap();

        let record = storage.get_page("https://a.com/x").unwrap().unwrap();
        assert_eq!(record.state, PageState::Saved);
        assert_eq!(record.status_code, Some(200));
        assert_eq!(record.local_path.as_deref(), Some("a.com/x.html"));
        assert_eq!(record.attempts, 2);
        assert_eq!(storage.count_total_pages().unwrap(), 1);
    }

    #[test]
    fn test_record_page_keeps_local_path() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("https://a.com/", "h").unwrap();

        let saved = PageUpdate {
            local_path: Some("a.com/index.html"),
            ..page("https://a.com/", PageState::Saved, 1)
        };
        storage.record_page(run_id, &saved).unwrap();
        storage
            .record_page(run_id, &page("https://a.com/", PageState::Saved, 1))
            .unwrap();

        let record = storage.get_page("https://a.com/").unwrap().unwrap();
        assert_eq!(record.local_path.as_deref(), Some("a.com/index.html"));
    }

    #[test]
    fn test_record_resource() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("https://a.com/", "h").unwrap();

        let resource = ResourceRecord {
            source_url: "https://a.com/logo.png".to_string(),
            content_hash: "ab12".to_string(),
            local_path: "resources/ab/ab12.png".to_string(),
            content_type: Some("image/png".to_string()),
        };
        storage.record_resource(run_id, &resource).unwrap();
        storage.record_resource(run_id, &resource).unwrap();

        assert_eq!(storage.count_resources().unwrap(), 1);
        assert_eq!(
            storage.get_resource("https://a.com/logo.png").unwrap(),
            Some(resource)
        );
        assert_eq!(storage.get_resource("https://a.com/missing").unwrap(), None);
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("https://a.com/", "h").unwrap();

        storage
            .record_page(run_id, &page("https://a.com/1", PageState::Saved, 1))
            .unwrap();
        storage
            .record_page(run_id, &page("https://a.com/2", PageState::Saved, 3))
            .unwrap();
        storage
            .record_page(run_id, &page("https://a.com/3", PageState::GaveUp, 11))
            .unwrap();

        assert_eq!(storage.count_total_pages().unwrap(), 3);
        assert_eq!(storage.count_pages_by_state(PageState::Saved).unwrap(), 2);
        assert_eq!(storage.count_pages_by_state(PageState::GaveUp).unwrap(), 1);
        assert_eq!(storage.count_pages_by_state(PageState::Pending).unwrap(), 0);
        assert_eq!(storage.count_attempts().unwrap(), 15);
    }
}
