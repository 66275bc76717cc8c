//! Output reporting for tracked crawl state
//!
//! This module provides:
//! - Statistics loading and display
//! - Duplicate content reports

mod stats;

pub use stats::{
    format_statistics, load_statistics, print_duplicates, print_statistics, CrawlStatistics,
};
