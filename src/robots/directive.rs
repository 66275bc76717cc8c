//! The PrimeDirective access gate
//!
//! Runs after a page is fetched and before anything is extracted or stored.
//! A denied page leaves no trace in the tracking store.

use crate::config::PrimeDirectiveConfig;
use crate::robots::{MetaDirectives, RobotsRules};
use serde::Serialize;
use url::Url;

/// Why a page was allowed or denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessReason {
    /// Robots.txt disallows the path
    RobotsRule,
    /// A `noindex` (or `none`) meta directive
    MetaNoindex,
    /// A `nofollow` meta directive while nofollow is honored
    MetaNofollow,
    /// Enforcement is switched off by the operator
    OverrideDisabled,
    /// Nothing restricts the page
    NoRuleMatched,
}

/// Outcome of the access gate for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny(reason: AccessReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// Robots exclusion enforcement for one run
#[derive(Debug, Clone)]
pub struct PrimeDirective {
    enabled: bool,
    honor_nofollow: bool,
    user_agent: String,
}

impl PrimeDirective {
    pub fn new(enabled: bool, honor_nofollow: bool, user_agent: &str) -> Self {
        Self {
            enabled,
            honor_nofollow,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn from_config(config: &PrimeDirectiveConfig, user_agent: &str) -> Self {
        Self::new(config.enabled, config.honor_nofollow, user_agent)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `rel="nofollow"` links should be left out of link discovery
    pub fn drops_nofollow_links(&self) -> bool {
        self.enabled
    }

    /// Decides whether a fetched page may be processed
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL
    /// * `rules` - Robots.txt rules for the page's domain; `None` allows all
    /// * `meta` - Directives from the page's robots meta tags
    ///
    /// # Example
    ///
    /// ```
    /// use pagecrunch::robots::{MetaDirectives, PrimeDirective, RobotsRules};
    /// use url::Url;
    ///
    /// let gate = PrimeDirective::new(false, false, "PageCrunch");
    /// let rules = RobotsRules::from_content("User-agent: *\nDisallow: /");
    /// let url = Url::parse("https://example.com/page").unwrap();
    /// let decision = gate.evaluate(&url, Some(&rules), &MetaDirectives::default());
    /// assert!(decision.allowed);
    /// ```
    pub fn evaluate(
        &self,
        url: &Url,
        rules: Option<&RobotsRules>,
        meta: &MetaDirectives,
    ) -> AccessDecision {
        if !self.enabled {
            return AccessDecision::allow(AccessReason::OverrideDisabled);
        }

        if let Some(rules) = rules {
            if !rules.is_allowed(url, &self.user_agent) {
                return AccessDecision::deny(AccessReason::RobotsRule);
            }
        }

        if meta.noindex {
            return AccessDecision::deny(AccessReason::MetaNoindex);
        }
        if meta.nofollow && self.honor_nofollow {
            return AccessDecision::deny(AccessReason::MetaNofollow);
        }

        AccessDecision::allow(AccessReason::NoRuleMatched)
    }
}
