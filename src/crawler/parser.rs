//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Page title and meta description
//! - The raw robots meta directive
//! - Links to follow, normalized and limited to the crawl scope

use crate::url::{normalize_url, CrawlScope};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from `<title>`), empty when absent
    pub title: String,

    /// Content of `<meta name="description">`, empty when absent
    pub meta_description: String,

    /// Raw content of `<meta name="robots">`
    pub robots_meta: Option<String>,

    /// In-scope links in first-seen order (normalized absolute URLs)
    pub links: Vec<String>,
}

/// Which discovered links to keep
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkFilter<'a> {
    /// Keep only links inside this scope
    pub scope: Option<&'a CrawlScope>,
    /// Leave out `rel="nofollow"` links
    pub drop_nofollow: bool,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
/// - `rel="nofollow"` links when the filter asks for it
/// - Links outside the filter's scope
///
/// # Example
///
/// ```
/// use pagecrunch::crawler::{parse_html, LinkFilter};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url, LinkFilter::default());
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://example.com/page"]);
/// ```
pub fn parse_html(html: &str, base_url: &Url, filter: LinkFilter<'_>) -> ParsedPage {
    let document = Html::parse_document(html);
    parse_document(&document, base_url, filter)
}

/// Extracts metadata and links from an already parsed document
pub fn parse_document(document: &Html, base_url: &Url, filter: LinkFilter<'_>) -> ParsedPage {
    ParsedPage {
        title: extract_title(document),
        meta_description: meta_content(document, "description")
            .map(|content| content.trim().to_string())
            .unwrap_or_default(),
        robots_meta: meta_content(document, "robots").map(|content| content.trim().to_string()),
        links: extract_links(document, base_url, filter),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Content of the first `<meta>` whose name matches, ignoring case
fn meta_content<'a>(document: &'a Html, name: &str) -> Option<&'a str> {
    let selector = Selector::parse("meta[name][content]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .and_then(|element| element.value().attr("content"))
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url, filter: LinkFilter<'_>) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if filter.drop_nofollow && is_nofollow(element.value().attr("rel")) {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, base_url) else {
            continue;
        };

        if let Some(scope) = filter.scope {
            if !scope.contains(&url) {
                continue;
            }
        }

        let url = url.to_string();
        if seen.insert(url.clone()) {
            links.push(url);
        }
    }

    links
}

fn is_nofollow(rel: Option<&str>) -> bool {
    rel.is_some_and(|rel| {
        rel.split_whitespace()
            .any(|token| token.eq_ignore_ascii_case("nofollow"))
    })
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    // Skip empty hrefs
    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    // Skip fragment-only links (same page anchors)
    if href.starts_with('#') {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    normalize_url(absolute_url.as_str()).ok()
}
