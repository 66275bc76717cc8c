//! Batch coordinator
//!
//! Runs fetched pages through a shared [`PageProcessor`] on tokio's blocking
//! pool. Concurrency is bounded by a semaphore; per-URL failures, including a
//! worker that panics, are reported per page, while a fatal store error stops
//! the batch.

use crate::crawler::processor::PageProcessor;
use crate::crawler::record::{Emission, FetchedPage};
use crate::robots::RobotsRules;
use crate::CrunchError;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One fetched page plus the robots rules for its domain
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub page: FetchedPage,
    pub robots: Option<Arc<RobotsRules>>,
}

impl BatchItem {
    pub fn new(page: FetchedPage) -> Self {
        Self { page, robots: None }
    }

    pub fn with_robots(mut self, robots: Arc<RobotsRules>) -> Self {
        self.robots = Some(robots);
        self
    }
}

/// Result for one page of a batch
#[derive(Debug)]
pub struct BatchOutcome {
    /// The URL as handed in, before normalization
    pub url: String,
    pub result: Result<Emission, CrunchError>,
}

/// Processes a batch of fetched pages concurrently
///
/// # Arguments
///
/// * `processor` - Shared page processor
/// * `items` - Pages to process
/// * `max_concurrent` - Upper bound on pages processed at once
///
/// # Returns
///
/// * `Ok(Vec<BatchOutcome>)` - One outcome per item, in input order; a page whose
///   worker panicked carries a `CrunchError::Worker` result
/// * `Err(CrunchError)` - The first fatal error; remaining work is abandoned
pub async fn process_batch(
    processor: Arc<PageProcessor>,
    items: Vec<BatchItem>,
    max_concurrent: usize,
) -> Result<Vec<BatchOutcome>, CrunchError> {
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();
    let urls: Vec<String> = items.iter().map(|item| item.page.url.clone()).collect();

    tracing::info!("Processing batch of {} pages", total);

    for (index, item) in items.into_iter().enumerate() {
        let processor = Arc::clone(&processor);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let url = item.page.url.clone();
            let result = match semaphore.acquire_owned().await {
                Ok(permit) => {
                    let joined = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        processor.process(&item.page, item.robots.as_deref(), Utc::now())
                    })
                    .await;
                    joined.unwrap_or_else(|e| Err(CrunchError::Worker(e.to_string())))
                }
                Err(_) => Err(CrunchError::Worker("batch cancelled".to_string())),
            };
            (index, BatchOutcome { url, result })
        });
    }

    let mut outcomes: Vec<Option<BatchOutcome>> = (0..total).map(|_| None).collect();

    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("Batch task failed: {}", e);
                continue;
            }
        };

        match outcome.result {
            Err(e) if e.is_fatal() => {
                tracing::error!("Fatal error while processing {}: {}", outcome.url, e);
                semaphore.close();
                tasks.abort_all();
                return Err(e);
            }
            Err(ref e) => tracing::warn!("Failed to process {}: {}", outcome.url, e),
            Ok(_) => {}
        }

        if let Some(slot) = outcomes.get_mut(index) {
            *slot = Some(outcome);
        }
    }

    let outcomes: Vec<BatchOutcome> = outcomes
        .into_iter()
        .zip(urls)
        .map(|(slot, url)| {
            slot.unwrap_or_else(|| BatchOutcome {
                url,
                result: Err(CrunchError::Worker("task ended without a result".to_string())),
            })
        })
        .collect();
    let processed = outcomes.iter().filter(|o| o.result.is_ok()).count();
    tracing::info!("Batch complete: {} of {} pages processed", processed, total);
    Ok(outcomes)
}
