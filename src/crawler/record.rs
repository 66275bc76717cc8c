//! Page input and emission types

use crate::extract::RegionKind;
use crate::hash::ContentHash;
use crate::robots::AccessReason;
use crate::storage::{ContentStatus, CrawlRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Content types treated as HTML
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// A page as delivered by the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    pub html: String,
    /// `Content-Type` header, if the fetcher reported one
    pub content_type: Option<String>,
}

impl FetchedPage {
    pub fn new(url: &str, status: u16, html: &str) -> Self {
        Self {
            url: url.to_string(),
            status,
            html: html.to_string(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// True when no content type is known or its media type is HTML
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(content_type) => {
                let essence = content_type
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase();
                HTML_CONTENT_TYPES.contains(&essence.as_str())
            }
        }
    }
}

/// Output record for a processed page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    /// Extracted region, whitespace-normalized
    pub content: String,
    pub content_hash: ContentHash,
    pub crawled_at: DateTime<Utc>,
    /// HTTP status code
    pub status: u16,
    /// Byte length of `content`
    pub length: usize,
    pub robots_meta: Option<String>,
    pub content_status: ContentStatus,
    pub content_region: RegionKind,
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_hash: Option<ContentHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_length: Option<usize>,
}

/// Stored fields re-emitted for a URL that was not refetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedRecord {
    pub url: String,
    pub content_hash: ContentHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_hash: Option<ContentHash>,
    pub first_crawled_at: DateTime<Utc>,
    pub crawled_at: DateTime<Utc>,
    pub change_count: u64,
    /// HTTP status of the last real fetch
    pub status: Option<u16>,
    /// Always `unchanged`: nothing was fetched to compare against
    pub content_status: ContentStatus,
    pub cached: bool,
}

impl From<CrawlRecord> for CachedRecord {
    fn from(record: CrawlRecord) -> Self {
        Self {
            url: record.url,
            content_hash: record.content_hash,
            markdown_hash: record.markdown_hash,
            first_crawled_at: record.first_crawled_at,
            crawled_at: record.last_crawled_at,
            change_count: record.change_count,
            status: record.http_status,
            content_status: ContentStatus::Unchanged,
            cached: true,
        }
    }
}

/// Minimal marker for a silently skipped URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStub {
    pub url: String,
    pub content_status: ContentStatus,
    pub skipped: bool,
}

impl SkippedStub {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            content_status: ContentStatus::Unchanged,
            skipped: true,
        }
    }
}

/// Why a fetched page produced no record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum SkipReason {
    /// The access gate denied the page
    AccessDenied(AccessReason),
    /// The stored row for the URL could not be read
    StorageRow(String),
    /// The response is not an HTML document
    NotHtml(String),
    /// The URL lies outside the crawl scope
    OutOfScope,
    /// The URL could not be parsed or normalized
    InvalidUrl(String),
}

/// What the core produces for one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Emission {
    Page(PageRecord),
    Cached(CachedRecord),
    Stub(SkippedStub),
    Skipped(SkipReason),
}

impl Emission {
    /// The processed page record, if this emission carries one
    pub fn as_page(&self) -> Option<&PageRecord> {
        match self {
            Self::Page(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}
