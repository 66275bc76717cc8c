//! Refresh policy
//!
//! Decides, before any network activity, whether a URL should be fetched
//! again. The decision is a pure function of the stored record, the run's
//! policy and the current time.

use crate::storage::CrawlRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How previously crawled URLs are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Re-fetch once the stored record is older than the refresh window
    Auto,
    /// Always re-fetch
    Force,
    /// Never re-fetch a known URL
    None,
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "force" => Ok(Self::Force),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown refresh mode '{}' (expected auto, force or none)",
                other
            )),
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Force => "force",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// What to emit for a skipped URL when cached output is disabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipOutput {
    /// Emit nothing
    #[default]
    Silent,
    /// Emit a minimal record marking the URL as skipped
    Stub,
}

/// Validated, run-scoped refresh settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub mode: RefreshMode,
    /// Refresh window in whole days, always positive
    pub days: u32,
    /// Re-emit the stored record for skipped URLs
    pub output_cache: bool,
    pub on_skip: SkipOutput,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            mode: RefreshMode::Auto,
            days: 7,
            output_cache: false,
            on_skip: SkipOutput::Silent,
        }
    }
}

/// Outcome of the refresh policy for one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyDecision {
    Fetch,
    SkipReemitCached,
    SkipSilent,
}

impl PolicyDecision {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch)
    }
}

/// Decides whether to fetch a URL
///
/// # Arguments
///
/// * `record` - The stored record for the URL, if any
/// * `policy` - The run's refresh policy
/// * `now` - Current time
///
/// # Returns
///
/// * `Fetch` for unknown URLs, under `force`, or when an `auto` record is due
/// * `SkipReemitCached` for a skipped URL when `output_cache` is set
/// * `SkipSilent` for any other skip
///
/// # Example
///
/// ```
/// use pagecrunch::refresh::{decide, PolicyDecision, RefreshPolicy};
/// use chrono::Utc;
///
/// let decision = decide(None, &RefreshPolicy::default(), Utc::now());
/// assert_eq!(decision, PolicyDecision::Fetch);
/// ```
pub fn decide(
    record: Option<&CrawlRecord>,
    policy: &RefreshPolicy,
    now: DateTime<Utc>,
) -> PolicyDecision {
    let Some(record) = record else {
        return PolicyDecision::Fetch;
    };

    match policy.mode {
        RefreshMode::Force => PolicyDecision::Fetch,
        RefreshMode::Auto if is_due(record, policy.days, now) => PolicyDecision::Fetch,
        RefreshMode::Auto | RefreshMode::None => skip(policy),
    }
}

// Whole days only: a record crawled 6d23h ago is not yet due under a 7-day window.
fn is_due(record: &CrawlRecord, days: u32, now: DateTime<Utc>) -> bool {
    (now - record.last_crawled_at).num_days() >= i64::from(days)
}

fn skip(policy: &RefreshPolicy) -> PolicyDecision {
    if policy.output_cache {
        PolicyDecision::SkipReemitCached
    } else {
        PolicyDecision::SkipSilent
    }
}
