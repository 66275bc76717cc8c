//! Tests for the on-disk tracking store

use chrono::{Duration, Utc};
use pagecrunch::hash::fingerprint;
use pagecrunch::storage::{open_store, ContentStatus, SqliteTrackingStore, TrackingStore};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("urls.db");
    let first_seen = Utc::now() - Duration::days(10);

    {
        let store = open_store(&db_path, 2).expect("Failed to open store");
        store
            .upsert_at(
                "https://example.com/docs",
                &fingerprint(b"v1"),
                Some(&fingerprint(b"md")),
                Some(200),
                first_seen,
            )
            .expect("upsert failed");
    }

    let store = open_store(&db_path, 2).expect("Failed to reopen store");
    let (record, status) = store
        .upsert_at(
            "https://example.com/docs",
            &fingerprint(b"v2"),
            None,
            Some(200),
            Utc::now(),
        )
        .expect("upsert failed");

    assert_eq!(status, ContentStatus::Updated);
    assert_eq!(record.change_count, 1);
    assert_eq!(record.first_crawled_at.timestamp(), first_seen.timestamp());
    // The content changed and no markdown came with it: the old fingerprint is stale
    assert_eq!(record.markdown_hash, None);
    assert_eq!(
        store
            .lookup("https://example.com/docs")
            .expect("lookup failed")
            .expect("record missing")
            .markdown_hash,
        None
    );
}

#[test]
fn test_concurrent_upserts_for_one_url() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("urls.db");
    let store = Arc::new(SqliteTrackingStore::open(&db_path, 4).expect("Failed to open store"));

    const THREADS: usize = 8;
    const PER_THREAD: usize = 10;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut statuses = Vec::new();
                for i in 0..PER_THREAD {
                    let hash = fingerprint(format!("thread {} write {}", t, i).as_bytes());
                    let (_, status) = store
                        .upsert("https://example.com/hot", &hash, None)
                        .expect("upsert failed");
                    statuses.push(status);
                }
                statuses
            })
        })
        .collect();

    let statuses: Vec<ContentStatus> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("Writer thread panicked"))
        .collect();

    // Every write carried a distinct hash, so all but the first are changes
    let total = THREADS * PER_THREAD;
    let new = statuses.iter().filter(|s| **s == ContentStatus::New).count();
    let updated = statuses.iter().filter(|s| **s == ContentStatus::Updated).count();
    assert_eq!(new, 1);
    assert_eq!(updated, total - 1);

    let record = store
        .lookup("https://example.com/hot")
        .expect("lookup failed")
        .expect("record missing");
    assert_eq!(record.change_count, (total - 1) as u64);
    assert_eq!(store.count_total().expect("count failed"), 1);
}

#[test]
fn test_concurrent_upserts_for_distinct_urls() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("urls.db");
    let store = Arc::new(SqliteTrackingStore::open(&db_path, 4).expect("Failed to open store"));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    let url = format!("https://example.com/t{}/p{}", t, i);
                    store
                        .upsert(&url, &fingerprint(b"same body"), None)
                        .expect("upsert failed");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Writer thread panicked");
    }

    assert_eq!(store.count_total().expect("count failed"), 100);
    assert_eq!(store.count_changed().expect("count failed"), 0);

    let groups = store.duplicate_groups().expect("duplicate_groups failed");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].urls.len(), 100);
}

#[test]
fn test_unreadable_database_is_fatal() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("garbage.db");
    std::fs::write(&db_path, b"this is not a sqlite database, just bytes padded out to a page")
        .expect("Failed to write garbage file");

    match open_store(&db_path, 1) {
        Ok(_) => panic!("Opening a garbage file should fail"),
        Err(e) => assert!(e.is_fatal()),
    }
}
