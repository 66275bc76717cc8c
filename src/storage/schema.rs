//! Database schema definitions
//!
//! This module contains the SQL schema for the PageCrunch tracking database.

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per normalized URL, kept across runs
CREATE TABLE IF NOT EXISTS crawled_urls (
    url TEXT PRIMARY KEY,
    content_hash TEXT NOT NULL,
    markdown_hash TEXT,
    first_crawled_at TEXT NOT NULL,
    last_crawled_at TEXT NOT NULL,
    change_count INTEGER NOT NULL DEFAULT 0,
    last_status TEXT NOT NULL,
    http_status INTEGER
);

CREATE INDEX IF NOT EXISTS idx_crawled_urls_content_hash ON crawled_urls(content_hash);
CREATE INDEX IF NOT EXISTS idx_crawled_urls_last_crawled ON crawled_urls(last_crawled_at);
"#;

/// Columns in the order every record query selects them
pub const RECORD_COLUMNS: &str = "url, content_hash, markdown_hash, first_crawled_at, \
     last_crawled_at, change_count, last_status, http_status";

/// Initializes the database schema
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Reads the schema version recorded in the database
pub fn get_schema_version(conn: &rusqlite::Connection) -> Result<u32, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}
