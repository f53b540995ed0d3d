//! Database schema definitions
//!
//! This module contains the SQL schema of the mirror manifest.

/// SQL schema for the manifest database
pub const SCHEMA_SQL: &str = r#"
-- Track mirror runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Latest known state of every page target
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    depth INTEGER NOT NULL,
    state TEXT NOT NULL,
    status_code INTEGER,
    local_path TEXT,
    attempts INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_state ON pages(state);

-- Archived resources
CREATE TABLE IF NOT EXISTS resources (
    url TEXT PRIMARY KEY,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    content_hash TEXT NOT NULL,
    local_path TEXT NOT NULL,
    content_type TEXT,
    archived_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
