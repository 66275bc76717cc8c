//! Storage traits and error types
//!
//! This module defines the trait interface for tracking store backends and
//! associated error types.

use crate::hash::ContentHash;
use crate::storage::{ContentStatus, CrawlRecord, DuplicateGroup};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// `Row` is the only recoverable kind: the affected URL is skipped and the run
/// continues. Every other variant means the store itself cannot be trusted.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Tracking store unavailable: {0}")]
    Unavailable(String),

    #[error("Unreadable tracking row for {url}: {reason}")]
    Row { url: String, reason: String },
}

impl StorageError {
    /// Returns true if the run must be aborted
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Row { .. })
    }
}

impl From<r2d2::Error> for StorageError {
    fn from(e: r2d2::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for tracking store implementations
///
/// Implementations are shared between workers, so every method takes `&self`
/// and must be safe to call concurrently. Upserts on the same URL are
/// linearized; upserts on different URLs must not wait on each other.
pub trait TrackingStore: Send + Sync {
    /// Looks up the record for a normalized URL
    ///
    /// Never observes a partially written record.
    fn lookup(&self, url: &str) -> StorageResult<Option<CrawlRecord>>;

    /// Records one crawl observation at an explicit time
    ///
    /// # Arguments
    ///
    /// * `url` - The normalized URL
    /// * `content_hash` - Fingerprint of the extracted content
    /// * `markdown_hash` - Fingerprint of the rendered markdown, if produced
    /// * `http_status` - HTTP status reported by the fetcher
    /// * `now` - Observation time
    ///
    /// # Returns
    ///
    /// The record as persisted and its classification for this observation
    fn upsert_at(
        &self,
        url: &str,
        content_hash: &ContentHash,
        markdown_hash: Option<&ContentHash>,
        http_status: Option<u16>,
        now: DateTime<Utc>,
    ) -> StorageResult<(CrawlRecord, ContentStatus)>;

    /// Records one crawl observation at the current time
    fn upsert(
        &self,
        url: &str,
        content_hash: &ContentHash,
        markdown_hash: Option<&ContentHash>,
    ) -> StorageResult<(CrawlRecord, ContentStatus)> {
        self.upsert_at(url, content_hash, markdown_hash, None, Utc::now())
    }

    // ===== Queries =====

    /// Groups URLs whose content fingerprints are equal
    fn duplicate_groups(&self) -> StorageResult<Vec<DuplicateGroup>>;

    /// Most recently crawled records first
    fn recently_crawled(&self, limit: usize) -> StorageResult<Vec<CrawlRecord>>;

    /// Gets total record count
    fn count_total(&self) -> StorageResult<u64>;

    /// Counts records whose content changed at least once
    fn count_changed(&self) -> StorageResult<u64>;

    /// Counts records by their last content status
    fn count_by_status(&self) -> StorageResult<HashMap<ContentStatus, u64>>;
}
