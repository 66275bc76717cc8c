//! End-to-end tests for the page pipeline
//!
//! Each test feeds saved pages through a [`PageProcessor`] and checks both the
//! emitted record and what ended up in the tracking store.

use crate::{docs_config, html_page};
use chrono::{Duration, Utc};
use pagecrunch::crawler::{process_batch, BatchItem, Emission, FetchedPage, PageProcessor, SkipReason};
use pagecrunch::output::load_statistics;
use pagecrunch::refresh::PolicyDecision;
use pagecrunch::robots::RobotsRules;
use pagecrunch::storage::{ContentStatus, SqliteTrackingStore, TrackingStore};
use std::sync::Arc;

fn shared_store() -> Arc<dyn TrackingStore> {
    Arc::new(SqliteTrackingStore::open_in_memory().expect("Failed to open in-memory store"))
}

fn docs_page(path: &str, body: &str) -> FetchedPage {
    FetchedPage::new(
        &format!("https://example.com{}", path),
        200,
        &html_page("Docs", body),
    )
}

#[test]
fn test_forced_crawl_then_cached_reemit() {
    let store = shared_store();
    let page = docs_page("/docs/install", "<main><p>Install with cargo.</p></main>");
    let crawled_at = Utc::now() - Duration::days(2);

    // First run: force refetches everything
    let forced = PageProcessor::new(&docs_config("[refresh]\nmode = \"force\"\n"), Arc::clone(&store))
        .expect("Failed to create processor");
    assert_eq!(
        forced.decide(&page.url, crawled_at).expect("decide failed"),
        PolicyDecision::Fetch
    );
    let first = forced
        .process(&page, None, crawled_at)
        .expect("First run failed");
    let first = first.as_page().expect("Expected a page record");
    assert_eq!(first.content_status, ContentStatus::New);

    // Second run: the record is two days old, younger than the 7-day window
    let auto = PageProcessor::new(
        &docs_config("[refresh]\nmode = \"auto\"\ndays = 7\noutput-cache = true\n"),
        Arc::clone(&store),
    )
    .expect("Failed to create processor");
    let now = Utc::now();
    let decision = auto.decide(&page.url, now).expect("decide failed");
    assert_eq!(decision, PolicyDecision::SkipReemitCached);

    let cached = auto
        .cached_emission(&page.url, decision)
        .expect("cached_emission failed");
    match cached {
        Some(Emission::Cached(record)) => {
            assert_eq!(record.url, "https://example.com/docs/install");
            assert_eq!(record.content_hash, first.content_hash);
            assert_eq!(record.crawled_at, first.crawled_at);
            assert_eq!(record.content_status, ContentStatus::Unchanged);
            assert_eq!(record.status, Some(200));
            assert!(record.cached);
        }
        other => panic!("Expected a cached record, got {:?}", other),
    }

    // Nothing was written by the skip
    let stored = store
        .lookup("https://example.com/docs/install")
        .expect("lookup failed")
        .expect("record missing");
    assert_eq!(stored.last_crawled_at, first.crawled_at);
    assert_eq!(stored.change_count, 0);
}

#[test]
fn test_change_tracking_across_runs() {
    let store = shared_store();
    let processor = PageProcessor::new(&docs_config(""), Arc::clone(&store))
        .expect("Failed to create processor");
    let start = Utc::now() - Duration::days(30);

    let runs = [
        ("<main>version one</main>", ContentStatus::New, 0),
        ("<main>version one</main>", ContentStatus::Unchanged, 0),
        ("<main>version two</main>", ContentStatus::Updated, 1),
        ("<main>version   two\n</main>", ContentStatus::Unchanged, 1),
        ("<main>version three</main>", ContentStatus::Updated, 2),
    ];

    for (day, (body, expected_status, expected_changes)) in runs.iter().enumerate() {
        let now = start + Duration::days(day as i64 * 8);
        let emission = processor
            .process(&docs_page("/docs/changelog", body), None, now)
            .expect("process failed");
        let record = emission.as_page().expect("Expected a page record");
        assert_eq!(record.content_status, *expected_status, "run {}", day);

        let stored = store
            .lookup("https://example.com/docs/changelog")
            .expect("lookup failed")
            .expect("record missing");
        assert_eq!(stored.change_count, *expected_changes, "run {}", day);
        assert_eq!(stored.first_crawled_at, record.crawled_at - Duration::days(day as i64 * 8));
    }
}

#[test]
fn test_duplicate_content_is_reported() {
    let store = shared_store();
    let processor = PageProcessor::new(&docs_config(""), Arc::clone(&store))
        .expect("Failed to create processor");
    let now = Utc::now();

    let body = "<article><p>Shared boilerplate page.</p></article>";
    for path in ["/docs/a", "/docs/b", "/docs/c"] {
        processor
            .process(&docs_page(path, body), None, now)
            .expect("process failed");
    }
    processor
        .process(&docs_page("/docs/unique", "<article>Only here</article>"), None, now)
        .expect("process failed");

    let stats = load_statistics(store.as_ref()).expect("Failed to load statistics");
    assert_eq!(stats.total_urls, 4);
    assert_eq!(stats.duplicate_groups.len(), 1);
    assert_eq!(
        stats.duplicate_groups[0].urls,
        vec![
            "https://example.com/docs/a".to_string(),
            "https://example.com/docs/b".to_string(),
            "https://example.com/docs/c".to_string(),
        ]
    );
}

#[test]
fn test_denied_pages_never_reach_the_store() {
    let store = shared_store();
    let processor = PageProcessor::new(&docs_config(""), Arc::clone(&store))
        .expect("Failed to create processor");
    let robots = RobotsRules::from_content("User-agent: *\nDisallow: /docs/private");
    let now = Utc::now();

    let disallowed = processor
        .process(&docs_page("/docs/private/keys", "<main>secret</main>"), Some(&robots), now)
        .expect("process failed");
    assert!(matches!(
        disallowed,
        Emission::Skipped(SkipReason::AccessDenied(_))
    ));

    let noindex = FetchedPage::new(
        "https://example.com/docs/draft",
        200,
        r#"<html><head><meta name="robots" content="noindex"></head><body><main>draft</main></body></html>"#,
    );
    let emission = processor
        .process(&noindex, Some(&robots), now)
        .expect("process failed");
    assert!(emission.is_skipped());

    assert_eq!(store.count_total().expect("count failed"), 0);
}

#[test]
fn test_markdown_output_end_to_end() {
    let store = shared_store();
    let processor = PageProcessor::new(&docs_config("[markdown]\nenabled = true\n"), Arc::clone(&store))
        .expect("Failed to create processor");

    let page = docs_page(
        "/docs/usage",
        r#"<main>
            <h2>Usage</h2>
            <p>See <a href="/docs/install">the install guide</a>.</p>
            <pre><code class="language-sh">pagecrunch crawl.toml --stats</code></pre>
        </main>"#,
    );

    let emission = processor.process(&page, None, Utc::now()).expect("process failed");
    let record = emission.as_page().expect("Expected a page record");

    let markdown = record.markdown_content.as_deref().expect("markdown missing");
    assert!(markdown.starts_with("## Usage"));
    assert!(markdown.contains("[the install guide](https://example.com/docs/install)"));
    assert!(markdown.contains("```sh\npagecrunch crawl.toml --stats\n```"));
    assert_eq!(record.markdown_length, Some(markdown.len()));
    assert_eq!(record.links, vec!["https://example.com/docs/install".to_string()]);

    // Reprocessing the same page reproduces the same markdown fingerprint
    let again = processor.process(&page, None, Utc::now()).expect("process failed");
    assert_eq!(
        again.as_page().expect("Expected a page record").markdown_hash,
        record.markdown_hash
    );
}

#[tokio::test]
async fn test_batch_against_shared_store() {
    let store = shared_store();
    let processor = Arc::new(
        PageProcessor::new(&docs_config(""), Arc::clone(&store))
            .expect("Failed to create processor"),
    );
    let robots = Arc::new(RobotsRules::from_content("User-agent: *\nDisallow: /docs/hidden"));

    let mut items: Vec<BatchItem> = (0..10)
        .map(|i| {
            BatchItem::new(docs_page(&format!("/docs/page{}", i), &format!("<main>page {}</main>", i)))
                .with_robots(Arc::clone(&robots))
        })
        .collect();
    items.push(BatchItem::new(docs_page("/docs/hidden", "<main>hidden</main>")).with_robots(robots));
    items.push(BatchItem::new(docs_page("/blog/post", "<main>off-scope</main>")));

    let outcomes = process_batch(Arc::clone(&processor), items, 3)
        .await
        .expect("Batch failed");

    assert_eq!(outcomes.len(), 12);
    let pages = outcomes
        .iter()
        .filter(|o| matches!(o.result, Ok(Emission::Page(_))))
        .count();
    assert_eq!(pages, 10);
    assert!(matches!(
        outcomes[10].result,
        Ok(Emission::Skipped(SkipReason::AccessDenied(_)))
    ));
    assert!(matches!(
        outcomes[11].result,
        Ok(Emission::Skipped(SkipReason::OutOfScope))
    ));
    assert_eq!(store.count_total().expect("count failed"), 10);
}
