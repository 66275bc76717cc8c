//! URL tracking store
//!
//! This module persists one record per normalized URL across crawl runs:
//! - SQLite database initialization and schema management
//! - Transactional lookup and upsert with change classification
//! - Per-URL write serialization
//! - Queries for duplicate content and run statistics
//!
//! Records are never deleted by the crawler; retention is left to operators.

mod locks;
mod schema;
mod sqlite;
mod traits;

pub use locks::KeyedLocks;
pub use sqlite::SqliteTrackingStore;
pub use traits::{StorageError, StorageResult, TrackingStore};

use crate::hash::ContentHash;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Opens (or creates) the tracking store at the given path
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `max_connections` - Maximum number of idle pooled connections
///
/// # Returns
///
/// * `Ok(SqliteTrackingStore)` - Successfully opened store
/// * `Err(StorageError)` - The store is unreachable or corrupted
pub fn open_store(path: &Path, max_connections: usize) -> StorageResult<SqliteTrackingStore> {
    SqliteTrackingStore::open(path, max_connections)
}

/// Classification of a crawled URL relative to its prior history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// First time this URL was classified
    New,
    /// Content fingerprint differs from the stored one
    Updated,
    /// Content fingerprint matches the stored one
    Unchanged,
}

impl ContentStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "updated" => Some(Self::Updated),
            "unchanged" => Some(Self::Unchanged),
            _ => None,
        }
    }

    /// Returns all statuses in display order
    pub fn all() -> [Self; 3] {
        [Self::New, Self::Updated, Self::Unchanged]
    }
}

/// Persistent per-URL crawl record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlRecord {
    /// Normalized absolute URL; the sole identity key
    pub url: String,
    pub content_hash: ContentHash,
    pub markdown_hash: Option<ContentHash>,
    pub first_crawled_at: DateTime<Utc>,
    pub last_crawled_at: DateTime<Utc>,
    /// Number of runs in which the content fingerprint changed
    pub change_count: u64,
    pub last_status: ContentStatus,
    /// HTTP status of the most recent fetch, if the orchestrator reported one
    pub http_status: Option<u16>,
}

/// URLs sharing one content fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub content_hash: ContentHash,
    /// Member URLs in ascending order
    pub urls: Vec<String>,
}

/// Applies one crawl observation to the previous record, if any
///
/// This is the pure core of upsert:
/// - no previous record: a new record with `change_count = 0`
/// - same content hash: `unchanged`, only the timestamp advances
/// - different content hash: `updated`, `change_count` grows by one
///
/// A `None` markdown hash means markdown was not produced for this observation.
/// On unchanged content the stored markdown hash still describes the page and
/// is kept; on changed content it is stale and is cleared.
pub fn apply_observation(
    previous: Option<CrawlRecord>,
    url: &str,
    content_hash: &ContentHash,
    markdown_hash: Option<&ContentHash>,
    http_status: Option<u16>,
    now: DateTime<Utc>,
) -> (CrawlRecord, ContentStatus) {
    match previous {
        None => {
            let record = CrawlRecord {
                url: url.to_string(),
                content_hash: content_hash.clone(),
                markdown_hash: markdown_hash.cloned(),
                first_crawled_at: now,
                last_crawled_at: now,
                change_count: 0,
                last_status: ContentStatus::New,
                http_status,
            };
            (record, ContentStatus::New)
        }
        Some(mut record) => {
            let status = if record.content_hash == *content_hash {
                ContentStatus::Unchanged
            } else {
                record.change_count += 1;
                record.content_hash = content_hash.clone();
                ContentStatus::Updated
            };

            match markdown_hash {
                Some(md) => record.markdown_hash = Some(md.clone()),
                None if status == ContentStatus::Updated => record.markdown_hash = None,
                None => {}
            }
            if http_status.is_some() {
                record.http_status = http_status;
            }
            record.last_crawled_at = now;
            record.last_status = status;

            (record, status)
        }
    }
}
