//! URL handling module for PageCrunch
//!
//! This module provides the URL normalization that produces tracking keys and
//! the domain/path scope check that keeps a crawl inside its subtree.

mod normalize;
mod scope;

pub use normalize::normalize_url;
pub use scope::{extract_domain, top_domain, CrawlScope};
