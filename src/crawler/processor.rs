//! Per-page processing pipeline
//!
//! The processor owns the run's immutable settings and a handle to the
//! tracking store. For each URL it answers two questions:
//! 1. Before fetching: should this URL be fetched at all? ([`PageProcessor::decide`])
//! 2. After fetching: what record does this page produce? ([`PageProcessor::process`])
//!
//! The store upsert is the last side effect of `process`; a page that fails or
//! is denied earlier leaves the store untouched.

use crate::config::Config;
use crate::crawler::parser::{parse_document, LinkFilter};
use crate::crawler::record::{
    CachedRecord, Emission, FetchedPage, PageRecord, SkipReason, SkippedStub,
};
use crate::extract::{extract_from_document, ContentMode};
use crate::hash::fingerprint;
use crate::markdown::{MarkdownArtifact, MarkdownConverter, MarkdownOptions};
use crate::refresh::{self, PolicyDecision, RefreshPolicy, SkipOutput};
use crate::robots::{MetaDirectives, PrimeDirective, RobotsRules};
use crate::storage::{StorageError, TrackingStore};
use crate::url::{normalize_url, CrawlScope};
use crate::{CrunchError, Result};
use chrono::{DateTime, Utc};
use scraper::Html;
use std::sync::Arc;

/// Markdown settings for a run with conversion enabled
#[derive(Debug, Clone)]
struct MarkdownSettings {
    options: MarkdownOptions,
    max_input_bytes: usize,
}

/// Outcome of checking a URL before it is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precheck {
    /// The refresh policy's decision
    Decided(PolicyDecision),
    /// The stored row is unreadable; the URL is skipped as `process` would
    Skipped(Emission),
}

/// Processes fetched pages against the tracking store
pub struct PageProcessor {
    store: Arc<dyn TrackingStore>,
    policy: RefreshPolicy,
    content_mode: ContentMode,
    markdown: Option<MarkdownSettings>,
    gate: PrimeDirective,
    scope: CrawlScope,
}

impl PageProcessor {
    /// Creates a processor from a validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(PageProcessor)` - Ready to process pages
    /// * `Err(CrunchError)` - The refresh policy or crawl scope is invalid
    pub fn new(config: &Config, store: Arc<dyn TrackingStore>) -> Result<Self> {
        let markdown = config.markdown.enabled.then(|| MarkdownSettings {
            options: config.markdown.options.clone(),
            max_input_bytes: config.markdown.max_input_bytes,
        });

        Ok(Self {
            store,
            policy: config.refresh.policy()?,
            content_mode: config.content.mode,
            markdown,
            gate: PrimeDirective::from_config(&config.prime_directive, &config.crawl.user_agent),
            scope: config.crawl.scope()?,
        })
    }

    pub fn store(&self) -> &Arc<dyn TrackingStore> {
        &self.store
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    pub fn scope(&self) -> &CrawlScope {
        &self.scope
    }

    /// Decides whether a URL should be fetched
    ///
    /// # Returns
    ///
    /// * `Ok(PolicyDecision)` - The refresh decision
    /// * `Err(CrunchError)` - The URL is invalid or its stored row is unreadable
    pub fn decide(&self, url: &str, now: DateTime<Utc>) -> Result<PolicyDecision> {
        let url = normalize_url(url)?;
        let record = self.store.lookup(url.as_str())?;
        let decision = refresh::decide(record.as_ref(), &self.policy, now);

        tracing::debug!("Refresh decision for {}: {:?}", url, decision);
        Ok(decision)
    }

    /// Like [`decide`](Self::decide), but an unreadable stored row becomes a
    /// `Skipped(StorageRow)` emission instead of an error
    ///
    /// # Returns
    ///
    /// * `Ok(Precheck)` - A decision, or the skip for this URL
    /// * `Err(CrunchError)` - The URL is invalid or the store is unusable
    pub fn precheck(&self, url: &str, now: DateTime<Utc>) -> Result<Precheck> {
        match self.decide(url, now) {
            Ok(decision) => Ok(Precheck::Decided(decision)),
            Err(CrunchError::Storage(StorageError::Row { url, reason })) => {
                tracing::warn!("Skipping {}: unreadable tracking row ({})", url, reason);
                Ok(Precheck::Skipped(Emission::Skipped(SkipReason::StorageRow(reason))))
            }
            Err(e) => Err(e),
        }
    }

    /// Builds the emission for a URL that will not be fetched
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Emission))` - A cached record or a skip stub
    /// * `Ok(None)` - Nothing to emit: the URL is being fetched, or skips are silent
    /// * `Err(CrunchError)` - The URL is invalid or the store failed
    pub fn cached_emission(&self, url: &str, decision: PolicyDecision) -> Result<Option<Emission>> {
        let url = normalize_url(url)?;

        match decision {
            PolicyDecision::Fetch => Ok(None),
            PolicyDecision::SkipReemitCached => Ok(self
                .store
                .lookup(url.as_str())?
                .map(|record| Emission::Cached(CachedRecord::from(record)))),
            PolicyDecision::SkipSilent => match self.policy.on_skip {
                SkipOutput::Silent => Ok(None),
                SkipOutput::Stub => Ok(Some(Emission::Stub(SkippedStub::new(url.as_str())))),
            },
        }
    }

    /// Runs a fetched page through the full pipeline
    ///
    /// # Arguments
    ///
    /// * `page` - The fetched page
    /// * `robots` - Robots.txt rules for the page's domain, if known
    /// * `now` - Crawl time recorded in the store
    ///
    /// # Returns
    ///
    /// * `Ok(Emission::Page)` - The page was classified and stored
    /// * `Ok(Emission::Skipped)` - The page was skipped for a per-URL reason
    /// * `Err(CrunchError)` - The tracking store is unusable
    pub fn process(
        &self,
        page: &FetchedPage,
        robots: Option<&RobotsRules>,
        now: DateTime<Utc>,
    ) -> Result<Emission> {
        let url = match normalize_url(&page.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", page.url, e);
                return Ok(Emission::Skipped(SkipReason::InvalidUrl(e.to_string())));
            }
        };

        if !self.scope.contains(&url) {
            tracing::debug!("Skipping {}: outside crawl scope", url);
            return Ok(Emission::Skipped(SkipReason::OutOfScope));
        }

        if !page.is_html() {
            let content_type = page.content_type.clone().unwrap_or_default();
            tracing::debug!("Skipping {}: content type {}", url, content_type);
            return Ok(Emission::Skipped(SkipReason::NotHtml(content_type)));
        }

        let mut document = Html::parse_document(&page.html);

        let meta = MetaDirectives::from_document(&document);
        let access = self.gate.evaluate(&url, robots, &meta);
        if !access.allowed {
            tracing::debug!("Access denied for {}: {:?}", url, access.reason);
            return Ok(Emission::Skipped(SkipReason::AccessDenied(access.reason)));
        }

        let mut parsed = parse_document(
            &document,
            &url,
            LinkFilter {
                scope: Some(&self.scope),
                drop_nofollow: self.gate.drops_nofollow_links(),
            },
        );
        // A page-level nofollow withholds every link from discovery
        if self.gate.is_enabled() && meta.nofollow {
            parsed.links.clear();
        }

        let region = extract_from_document(&mut document, self.content_mode);
        if region.is_empty() {
            tracing::debug!("No content region found for {}", url);
        }
        let content = region.normalized();
        let content_hash = fingerprint(content.as_bytes());

        let markdown = self.markdown.as_ref().and_then(|settings| {
            match MarkdownConverter::new(settings.options.clone())
                .with_base_url(url.clone())
                .with_max_input_bytes(settings.max_input_bytes)
                .convert_region(&region)
            {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    tracing::warn!("Markdown conversion failed for {}: {}", url, e);
                    None
                }
            }
        });

        let upserted = self.store.upsert_at(
            url.as_str(),
            &content_hash,
            markdown.as_ref().map(|artifact| &artifact.hash),
            Some(page.status),
            now,
        );
        let (record, content_status) = match upserted {
            Ok(result) => result,
            Err(StorageError::Row { url, reason }) => {
                tracing::warn!("Skipping {}: unreadable tracking row ({})", url, reason);
                return Ok(Emission::Skipped(SkipReason::StorageRow(reason)));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Processed {} ({:?})", url, content_status);

        let (markdown_content, markdown_hash, markdown_length) = match markdown {
            Some(MarkdownArtifact { text, hash, .. }) => {
                let length = text.len();
                (Some(text), Some(hash), Some(length))
            }
            None => (None, None, None),
        };

        Ok(Emission::Page(PageRecord {
            url: record.url,
            title: parsed.title,
            meta_description: parsed.meta_description,
            length: content.len(),
            content,
            content_hash,
            crawled_at: record.last_crawled_at,
            status: page.status,
            robots_meta: parsed.robots_meta,
            content_status,
            content_region: region.kind,
            links: parsed.links,
            markdown_content,
            markdown_hash,
            markdown_length,
        }))
    }
}
