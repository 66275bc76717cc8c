use crate::url::normalize::normalize_url;
use crate::UrlError;
use url::Url;

/// The domain/path subtree a crawl is restricted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope {
    domain: String,
    top_domain: String,
    ignore_subdomains: bool,
    path_prefix: Option<String>,
}

impl CrawlScope {
    /// Creates a scope for an explicit domain
    ///
    /// # Arguments
    ///
    /// * `domain` - The allowed host
    /// * `ignore_subdomains` - Treat every host under the same top domain as in scope
    /// * `path_prefix` - Optional path subtree, e.g. `/docs`
    pub fn new(domain: &str, ignore_subdomains: bool, path_prefix: Option<&str>) -> Self {
        let domain = domain.to_lowercase();
        let top_domain = top_domain(&domain).to_string();
        let path_prefix = path_prefix
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Self {
            domain,
            top_domain,
            ignore_subdomains,
            path_prefix,
        }
    }

    /// Creates a scope whose domain defaults to the start URL's host
    pub fn from_start_url(
        start_url: &str,
        domain: Option<&str>,
        ignore_subdomains: bool,
        path_prefix: Option<&str>,
    ) -> Result<Self, UrlError> {
        let start = normalize_url(start_url)?;
        let host = match domain {
            Some(d) => d.to_string(),
            None => extract_domain(&start).ok_or(UrlError::MissingDomain)?,
        };
        Ok(Self::new(&host, ignore_subdomains, path_prefix))
    }

    /// The configured domain
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns true if the URL falls inside this scope
    pub fn contains(&self, url: &Url) -> bool {
        let Some(host) = extract_domain(url) else {
            return false;
        };

        let host_ok = if self.ignore_subdomains {
            top_domain(&host) == self.top_domain
        } else {
            host == self.domain
        };

        host_ok && self.path_in_scope(url.path())
    }

    /// Checks the path against the prefix on segment boundaries
    ///
    /// `/docs` admits `/docs` and `/docs/intro` but not `/docsearch`.
    fn path_in_scope(&self, path: &str) -> bool {
        match &self.path_prefix {
            None => true,
            Some(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// Extracts the lowercase host from a URL
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the last two labels of a host name
///
/// `blog.example.com` becomes `example.com`; hosts with two or fewer labels
/// are returned unchanged.
pub fn top_domain(domain: &str) -> &str {
    let mut dots = domain.rmatch_indices('.');
    match (dots.next(), dots.next()) {
        (Some(_), Some((second, _))) => &domain[second + 1..],
        _ => domain,
    }
}
