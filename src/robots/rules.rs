//! Robots.txt rules
//!
//! Wraps raw robots.txt content and evaluates it with the robotstxt crate.
//! Fetching the file is the orchestrator's job; this type only holds what was
//! fetched for one domain.

use robotstxt::DefaultMatcher;
use url::Url;

/// Robots.txt content for one domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    /// Raw robots.txt content; empty means allow all
    content: String,
}

impl RobotsRules {
    /// Creates rules from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Rules that allow everything, used when no robots.txt is known
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If a rule for the agent (or `*`) disallows it
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://example.com").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_allow_all() {
        let robots = RobotsRules::allow_all();
        assert!(robots.is_allowed(&url("/any/path"), "PageCrunch"));
        assert!(robots.is_allowed(&url("/admin"), "PageCrunch"));
    }

    #[test]
    fn test_disallow_all() {
        let robots = RobotsRules::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed(&url("/"), "PageCrunch"));
        assert!(!robots.is_allowed(&url("/page"), "PageCrunch"));
    }

    #[test]
    fn test_disallow_specific() {
        let robots = RobotsRules::from_content("User-agent: *\nDisallow: /admin");
        assert!(robots.is_allowed(&url("/"), "PageCrunch"));
        assert!(robots.is_allowed(&url("/page"), "PageCrunch"));
        assert!(!robots.is_allowed(&url("/admin"), "PageCrunch"));
        assert!(!robots.is_allowed(&url("/admin/users"), "PageCrunch"));
    }

    #[test]
    fn test_allow_overrides_broader_disallow() {
        let robots =
            RobotsRules::from_content("User-agent: *\nDisallow: /private\nAllow: /private/public");
        assert!(!robots.is_allowed(&url("/private"), "PageCrunch"));
        assert!(robots.is_allowed(&url("/private/public"), "PageCrunch"));
    }

    #[test]
    fn test_specific_user_agent() {
        let robots =
            RobotsRules::from_content("User-agent: PageCrunch\nDisallow: /\n\nUser-agent: *\nAllow: /");
        assert!(!robots.is_allowed(&url("/page"), "PageCrunch"));
        assert!(robots.is_allowed(&url("/page"), "OtherBot"));
    }

    #[test]
    fn test_garbage_allows() {
        let robots = RobotsRules::from_content("This is not valid robots.txt {{{");
        assert!(robots.is_allowed(&url("/any/path"), "PageCrunch"));
    }
}
