//! Main content extraction
//!
//! Picks the single HTML region of a page that carries its main content.
//! Script, style and comment nodes are stripped before any selection, so they
//! never reach fingerprints or markdown.

use crate::hash::normalize_content;
use ego_tree::NodeId;
use scraper::node::Node;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Region selection strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Walk the priority table, falling back to `<body>`
    #[default]
    Auto,
    /// Always take the whole `<body>`
    Body,
}

/// Which rule produced a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    Main,
    Article,
    Content,
    MainBlock,
    Body,
    /// Nothing usable was found
    Empty,
}

/// Ordered region rules, first match wins
///
/// Within a row, the first element in document order is taken.
const REGION_RULES: &[(RegionKind, &str)] = &[
    (RegionKind::Main, "main"),
    (RegionKind::Article, "article"),
    (RegionKind::Content, ".content, #content"),
    (RegionKind::MainBlock, ".main, #main"),
];

const BODY_RULE: (RegionKind, &str) = (RegionKind::Body, "body");

/// One extracted content region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Outer HTML of the region
    pub html: String,
    pub kind: RegionKind,
}

impl ExtractionResult {
    fn empty() -> Self {
        Self {
            html: String::new(),
            kind: RegionKind::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == RegionKind::Empty
    }

    /// The region with whitespace runs collapsed; the form that is fingerprinted
    pub fn normalized(&self) -> String {
        normalize_content(&self.html)
    }
}

/// Extracts the main content region from raw HTML
pub fn extract_content(html: &str, mode: ContentMode) -> ExtractionResult {
    let mut document = Html::parse_document(html);
    extract_from_document(&mut document, mode)
}

/// Extracts the main content region from an already parsed document
///
/// The document is modified: script, style and comment nodes are detached.
pub fn extract_from_document(document: &mut Html, mode: ContentMode) -> ExtractionResult {
    strip_non_content(document);

    let rules: &[(RegionKind, &str)] = match mode {
        ContentMode::Auto => REGION_RULES,
        ContentMode::Body => &[],
    };

    for &(kind, selector) in rules.iter().chain(std::iter::once(&BODY_RULE)) {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            if kind == RegionKind::Body && element.inner_html().trim().is_empty() {
                break;
            }
            tracing::trace!("Content region matched {:?}", kind);
            return ExtractionResult {
                html: element.html(),
                kind,
            };
        }
    }

    ExtractionResult::empty()
}

/// Detaches every script, style and comment node from the tree
pub fn strip_non_content(document: &mut Html) {
    let doomed: Vec<NodeId> = document
        .tree
        .root()
        .descendants()
        .filter(|node| match node.value() {
            Node::Comment(_) => true,
            Node::Element(element) => matches!(element.name(), "script" | "style"),
            _ => false,
        })
        .map(|node| node.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}
