//! `<meta name="robots">` directives

use scraper::{Html, Selector};
use serde::Serialize;

/// Directives parsed from a page's robots meta tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetaDirectives {
    pub noindex: bool,
    pub nofollow: bool,
    /// Raw content of the first robots meta tag
    pub raw: Option<String>,
}

impl MetaDirectives {
    /// Parses one directive list such as `"noindex, nofollow"`
    ///
    /// Tokens are case-insensitive and may be separated by commas or spaces.
    /// `none` means both `noindex` and `nofollow`.
    pub fn parse(content: &str) -> Self {
        let mut directives = Self {
            raw: Some(content.trim().to_string()),
            ..Self::default()
        };
        directives.merge_tokens(content);
        directives
    }

    /// Reads every `<meta name="robots">` tag in the document
    ///
    /// Directives from multiple tags are combined; `raw` keeps the first.
    pub fn from_document(document: &Html) -> Self {
        let Ok(selector) = Selector::parse("meta[name][content]") else {
            return Self::default();
        };

        let mut directives = Self::default();
        for element in document.select(&selector) {
            let is_robots = element
                .value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("robots"));
            if !is_robots {
                continue;
            }
            let content = element.value().attr("content").unwrap_or_default();
            if directives.raw.is_none() {
                directives.raw = Some(content.trim().to_string());
            }
            directives.merge_tokens(content);
        }
        directives
    }

    fn merge_tokens(&mut self, content: &str) {
        for token in content.split(|c: char| c == ',' || c.is_whitespace()) {
            match token.trim().to_ascii_lowercase().as_str() {
                "noindex" => self.noindex = true,
                "nofollow" => self.nofollow = true,
                "none" => {
                    self.noindex = true;
                    self.nofollow = true;
                }
                _ => {}
            }
        }
    }
}
