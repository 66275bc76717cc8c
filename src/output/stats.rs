//! Statistics generation from the tracking database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{ContentStatus, DuplicateGroup, StorageResult, TrackingStore};
use serde::Serialize;
use std::collections::HashMap;

/// Tracking statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStatistics {
    /// Total number of tracked URLs
    pub total_urls: u64,

    /// URLs whose content changed at least once
    pub changed_urls: u64,

    /// Count of URLs by their last content status
    pub urls_by_status: HashMap<ContentStatus, u64>,

    /// Groups of URLs sharing identical content
    pub duplicate_groups: Vec<DuplicateGroup>,
}

impl CrawlStatistics {
    /// Number of URLs that share their content with at least one other URL
    pub fn duplicate_urls(&self) -> usize {
        self.duplicate_groups.iter().map(|g| g.urls.len()).sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The tracking store to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(store: &dyn TrackingStore) -> StorageResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        total_urls: store.count_total()?,
        changed_urls: store.count_changed()?,
        urls_by_status: store.count_by_status()?,
        duplicate_groups: store.duplicate_groups()?,
    })
}

/// Renders statistics as the end-of-run summary
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Statistics ===\n\n");
    out.push_str(&format!("Total crawled URLs: {}\n", stats.total_urls));
    out.push_str(&format!("URLs with changes: {}\n\n", stats.changed_urls));

    out.push_str("URLs by last status:\n");
    for status in ContentStatus::all() {
        let count = stats.urls_by_status.get(&status).copied().unwrap_or(0);
        let percentage = if stats.total_urls > 0 {
            (count as f64 / stats.total_urls as f64) * 100.0
        } else {
            0.0
        };
        out.push_str(&format!(
            "  {}: {} ({:.1}%)\n",
            status.to_db_string(),
            count,
            percentage
        ));
    }

    if !stats.duplicate_groups.is_empty() {
        out.push_str(&format!(
            "\nDuplicate content: {} groups covering {} URLs\n",
            stats.duplicate_groups.len(),
            stats.duplicate_urls()
        ));
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}

/// Prints every duplicate group to stdout
pub fn print_duplicates(groups: &[DuplicateGroup]) {
    if groups.is_empty() {
        println!("No duplicate content found.");
        return;
    }

    for group in groups {
        println!("{} ({} URLs)", group.content_hash, group.urls.len());
        for url in &group.urls {
            println!("  - {}", url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::fingerprint;
    use crate::storage::SqliteTrackingStore;

    #[test]
    fn test_load_statistics() {
        let store = SqliteTrackingStore::open_in_memory().unwrap();
        store
            .upsert("https://example.com/a", &fingerprint(b"same"), None)
            .unwrap();
        store
            .upsert("https://example.com/b", &fingerprint(b"same"), None)
            .unwrap();
        store
            .upsert("https://example.com/b", &fingerprint(b"new"), None)
            .unwrap();
        store
            .upsert("https://example.com/c", &fingerprint(b"new"), None)
            .unwrap();

        let stats = load_statistics(&store).unwrap();

        assert_eq!(stats.total_urls, 3);
        assert_eq!(stats.changed_urls, 1);
        assert_eq!(stats.urls_by_status.get(&ContentStatus::New), Some(&2));
        assert_eq!(stats.urls_by_status.get(&ContentStatus::Updated), Some(&1));
        assert_eq!(stats.duplicate_groups.len(), 1);
        assert_eq!(stats.duplicate_urls(), 2);
    }

    #[test]
    fn test_format_statistics() {
        let mut urls_by_status = HashMap::new();
        urls_by_status.insert(ContentStatus::New, 3);
        urls_by_status.insert(ContentStatus::Unchanged, 1);

        let stats = CrawlStatistics {
            total_urls: 4,
            changed_urls: 0,
            urls_by_status,
            duplicate_groups: Vec::new(),
        };
        let text = format_statistics(&stats);

        assert!(text.contains("Total crawled URLs: 4"));
        assert!(text.contains("URLs with changes: 0"));
        assert!(text.contains("  new: 3 (75.0%)"));
        assert!(text.contains("  updated: 0 (0.0%)"));
        assert!(!text.contains("Duplicate content"));
    }
}
