//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the TrackingStore
//! trait, backed by an r2d2 connection pool so that workers do not serialize
//! on a single handle.

use crate::hash::ContentHash;
use crate::storage::locks::KeyedLocks;
use crate::storage::schema::{initialize_schema, RECORD_COLUMNS};
use crate::storage::traits::{StorageError, StorageResult, TrackingStore};
use crate::storage::{apply_observation, ContentStatus, CrawlRecord, DuplicateGroup};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// How long a connection waits on a competing writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a worker waits for a free pooled connection
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite tracking store backend
pub struct SqliteTrackingStore {
    pool: Pool<SqliteConnectionManager>,
    locks: KeyedLocks,
}

impl SqliteTrackingStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `max_connections` - Upper bound on simultaneously open connections
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteTrackingStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open or initialize the database
    pub fn open(path: &Path, max_connections: usize) -> StorageResult<Self> {
        // Open once up front so a file that is not a database fails here
        // instead of inside the pool's retry loop
        {
            let mut conn = Connection::open(path)?;
            configure_connection(&mut conn)?;
            initialize_schema(&conn)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(configure_connection);
        let pool = Pool::builder()
            .max_size(max_connections.max(1) as u32)
            .min_idle(Some(1))
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)?;

        tracing::debug!(
            "Opened tracking store at {} ({} connections max)",
            path.display(),
            max_connections
        );

        Ok(Self {
            pool,
            locks: KeyedLocks::new(),
        })
    }

    /// Creates an in-memory store
    ///
    /// All callers share a single connection, since each in-memory connection
    /// would otherwise see its own empty database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(SqliteConnectionManager::memory())?;
        initialize_schema(&*pool.get()?)?;

        Ok(Self {
            pool,
            locks: KeyedLocks::new(),
        })
    }

    fn checkout(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Reads the previous row, classifies the observation and writes it back
    /// inside one IMMEDIATE transaction; callers hold the URL's lock
    fn write_observation(
        &self,
        url: &str,
        content_hash: &ContentHash,
        markdown_hash: Option<&ContentHash>,
        http_status: Option<u16>,
        now: DateTime<Utc>,
    ) -> StorageResult<(CrawlRecord, ContentStatus)> {
        let mut conn = self.checkout()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous = tx
            .query_row(
                &format!("SELECT {} FROM crawled_urls WHERE url = ?1", RECORD_COLUMNS),
                params![url],
                read_raw,
            )
            .optional()?
            .map(|values| decode_record(&values))
            .transpose()
            .map_err(|reason| StorageError::Row {
                url: url.to_string(),
                reason,
            })?;

        let (record, status) =
            apply_observation(previous, url, content_hash, markdown_hash, http_status, now);

        tx.execute(
            "INSERT INTO crawled_urls
                (url, content_hash, markdown_hash, first_crawled_at, last_crawled_at,
                 change_count, last_status, http_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(url) DO UPDATE SET
                content_hash = excluded.content_hash,
                markdown_hash = excluded.markdown_hash,
                last_crawled_at = excluded.last_crawled_at,
                change_count = excluded.change_count,
                last_status = excluded.last_status,
                http_status = excluded.http_status",
            params![
                record.url,
                record.content_hash.as_str(),
                record.markdown_hash.as_ref().map(ContentHash::as_str),
                format_timestamp(&record.first_crawled_at),
                format_timestamp(&record.last_crawled_at),
                record.change_count as i64,
                record.last_status.to_db_string(),
                record.http_status.map(i64::from),
            ],
        )?;
        tx.commit()?;

        Ok((record, status))
    }
}

impl TrackingStore for SqliteTrackingStore {
    fn lookup(&self, url: &str) -> StorageResult<Option<CrawlRecord>> {
        let conn = self.checkout()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM crawled_urls WHERE url = ?1", RECORD_COLUMNS),
                params![url],
                read_raw,
            )
            .optional()?;

        raw.map(|values| decode_record(&values))
            .transpose()
            .map_err(|reason| StorageError::Row {
                url: url.to_string(),
                reason,
            })
    }

    fn upsert_at(
        &self,
        url: &str,
        content_hash: &ContentHash,
        markdown_hash: Option<&ContentHash>,
        http_status: Option<u16>,
        now: DateTime<Utc>,
    ) -> StorageResult<(CrawlRecord, ContentStatus)> {
        // Stored timestamps carry microseconds; keep the returned record equal
        // to what a later lookup reads back.
        let now = now.trunc_subsecs(6);

        let (record, status) = self.locks.with_lock(url, || {
            self.write_observation(url, content_hash, markdown_hash, http_status, now)
        })?;

        tracing::trace!("Upserted {} as {}", url, status.to_db_string());
        Ok((record, status))
    }

    // ===== Queries =====

    fn duplicate_groups(&self) -> StorageResult<Vec<DuplicateGroup>> {
        let conn = self.checkout()?;
        let mut stmt = conn.prepare(
            "SELECT content_hash, url FROM crawled_urls
             WHERE content_hash IN (
                 SELECT content_hash FROM crawled_urls
                 GROUP BY content_hash HAVING COUNT(*) > 1
             )
             ORDER BY content_hash, url",
        )?;

        let pairs = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: Vec<DuplicateGroup> = Vec::new();
        for (hash, url) in pairs {
            let Some(content_hash) = ContentHash::from_hex(&hash) else {
                tracing::warn!("Skipping {} in duplicate report: malformed hash", url);
                continue;
            };
            match groups.last_mut() {
                Some(group) if group.content_hash == content_hash => group.urls.push(url),
                _ => groups.push(DuplicateGroup {
                    content_hash,
                    urls: vec![url],
                }),
            }
        }

        groups.retain(|group| group.urls.len() > 1);
        groups.sort_by(|a, b| {
            b.urls
                .len()
                .cmp(&a.urls.len())
                .then_with(|| a.content_hash.cmp(&b.content_hash))
        });
        Ok(groups)
    }

    fn recently_crawled(&self, limit: usize) -> StorageResult<Vec<CrawlRecord>> {
        let conn = self.checkout()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM crawled_urls ORDER BY last_crawled_at DESC, url LIMIT ?1",
            RECORD_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![limit as i64], read_raw)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for values in rows {
            match decode_record(&values) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    let url = match values.first() {
                        Some(Value::Text(url)) => url.as_str(),
                        _ => "<unknown>",
                    };
                    tracing::warn!("Skipping unreadable row for {}: {}", url, reason);
                }
            }
        }
        Ok(records)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let conn = self.checkout()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM crawled_urls", [], |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }

    fn count_changed(&self) -> StorageResult<u64> {
        let conn = self.checkout()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM crawled_urls WHERE change_count > 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_by_status(&self) -> StorageResult<HashMap<ContentStatus, u64>> {
        let conn = self.checkout()?;
        let mut stmt = conn.prepare(
            "SELECT last_status, COUNT(*) FROM crawled_urls GROUP BY last_status",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (status, count) in rows {
            match ContentStatus::from_db_string(&status) {
                Some(status) => {
                    counts.insert(status, count as u64);
                }
                None => tracing::warn!("Ignoring {} rows with unknown status {:?}", count, status),
            }
        }
        Ok(counts)
    }
}

// ===== Row decoding =====

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vec<Value>> {
    (0..8).map(|i| row.get::<_, Value>(i)).collect()
}

/// Decodes a raw row into a record
///
/// Columns are read as untyped values first so that a single bad row surfaces
/// as a row-level failure instead of a query failure.
fn decode_record(values: &[Value]) -> Result<CrawlRecord, String> {
    let [url, content_hash, markdown_hash, first, last, change_count, last_status, http_status] =
        values
    else {
        return Err(format!("expected 8 columns, got {}", values.len()));
    };

    let url = text(url, "url")?.to_string();
    let content_hash = hash(content_hash, "content_hash")?;
    let markdown_hash = match markdown_hash {
        Value::Null => None,
        other => Some(hash(other, "markdown_hash")?),
    };
    let first_crawled_at = timestamp(first, "first_crawled_at")?;
    let last_crawled_at = timestamp(last, "last_crawled_at")?;

    let change_count = match change_count {
        Value::Integer(n) if *n >= 0 => *n as u64,
        other => return Err(format!("change_count is not a count: {:?}", other)),
    };

    let status_text = text(last_status, "last_status")?;
    let last_status = ContentStatus::from_db_string(status_text)
        .ok_or_else(|| format!("unknown last_status {:?}", status_text))?;

    let http_status = match http_status {
        Value::Null => None,
        Value::Integer(code) => Some(
            u16::try_from(*code).map_err(|_| format!("http_status out of range: {}", code))?,
        ),
        other => return Err(format!("http_status is not an integer: {:?}", other)),
    };

    Ok(CrawlRecord {
        url,
        content_hash,
        markdown_hash,
        first_crawled_at,
        last_crawled_at,
        change_count,
        last_status,
        http_status,
    })
}

fn text<'a>(value: &'a Value, column: &str) -> Result<&'a str, String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(format!("{} is not text: {:?}", column, other)),
    }
}

fn hash(value: &Value, column: &str) -> Result<ContentHash, String> {
    let raw = text(value, column)?;
    ContentHash::from_hex(raw).ok_or_else(|| format!("{} is not a fingerprint: {:?}", column, raw))
}

fn timestamp(value: &Value, column: &str) -> Result<DateTime<Utc>, String> {
    let raw = text(value, column)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("{} is not a timestamp ({}): {:?}", column, e, raw))
}

fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn configure_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(BUSY_TIMEOUT)?;

    // WAL lets lookups proceed while a writer holds the database; FULL sync
    // makes every committed upsert survive a crash.
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;
        PRAGMA temp_store = MEMORY;
    ",
    )
}
