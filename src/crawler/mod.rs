//! Crawler core for fetched pages
//!
//! This module contains the per-page crawling logic, including:
//! - HTML parsing for metadata and link discovery
//! - The processing pipeline from fetched page to emitted record
//! - Batch coordination across worker threads

mod coordinator;
mod parser;
mod processor;
mod record;

pub use coordinator::{process_batch, BatchItem, BatchOutcome};
pub use parser::{parse_document, parse_html, LinkFilter, ParsedPage};
pub use processor::{PageProcessor, Precheck};
pub use record::{CachedRecord, Emission, FetchedPage, PageRecord, SkipReason, SkippedStub};
