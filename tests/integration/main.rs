//! Integration tests for PageCrunch
//!
//! These tests drive the public API end-to-end against real SQLite stores,
//! in memory and on disk.

mod pipeline_tests;
mod store_tests;

use pagecrunch::config::{parse_config, Config};

/// Builds a configuration scoped to `https://example.com/docs`
pub fn docs_config(extra: &str) -> Config {
    parse_config(&format!(
        "[crawl]\nstart-url = \"https://example.com/docs/\"\npath-prefix = \"/docs\"\n{}",
        extra
    ))
    .expect("Failed to parse test config")
}

/// Wraps a body fragment into a full HTML document
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}
