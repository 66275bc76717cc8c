//! HTML to markdown conversion
//!
//! Converts an extracted content region into markdown under a fixed set of
//! options. Conversion is pure: identical HTML and options always produce
//! byte-identical text and therefore an identical fingerprint.

mod handlers;
mod table;

use crate::extract::ExtractionResult;
use crate::hash::{fingerprint, ContentHash};
use ego_tree::NodeRef;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Deepest element nesting the converter accepts
pub const MAX_NESTING_DEPTH: usize = 256;

/// Errors for input the converter refuses to process
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Input of {size} bytes exceeds the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Element nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("Markdown rendering failed: {0}")]
    Render(String),
}

/// Heading syntax
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    /// `# Title`
    #[default]
    Atx,
    /// `Title` underlined with `=` or `-`; levels 3 to 6 fall back to ATX
    Setext,
}

/// Conversion options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MarkdownOptions {
    pub heading_style: HeadingStyle,
    /// Render `<img>` as `![alt](src)`; when false images vanish entirely
    pub preserve_images: bool,
    /// Render tables as pipe tables; when false one plain line per row
    pub preserve_tables: bool,
    /// Render links as their text only
    pub ignore_links: bool,
    /// Keep `language-*` hints on fenced code blocks
    pub code_highlighting: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            preserve_images: true,
            preserve_tables: true,
            ignore_links: false,
            code_highlighting: true,
        }
    }
}

/// Rendered markdown with its fingerprint and the options that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkdownArtifact {
    pub text: String,
    pub hash: ContentHash,
    pub options: MarkdownOptions,
}

impl MarkdownArtifact {
    /// Length of the rendered text in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// HTML to markdown converter
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    options: MarkdownOptions,
    base_url: Option<Url>,
    max_input_bytes: usize,
}

impl MarkdownConverter {
    pub fn new(options: MarkdownOptions) -> Self {
        Self {
            options,
            base_url: None,
            max_input_bytes: crate::config::DEFAULT_MAX_MARKDOWN_INPUT,
        }
    }

    /// Resolves relative link and image targets against `base_url`
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_max_input_bytes(mut self, max_input_bytes: usize) -> Self {
        self.max_input_bytes = max_input_bytes;
        self
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Converts an HTML fragment
    ///
    /// # Returns
    ///
    /// * `Ok(MarkdownArtifact)` - The rendered markdown; empty input yields empty text
    /// * `Err(ConversionError)` - The input is too large or too deeply nested
    ///
    /// # Example
    ///
    /// ```
    /// use pagecrunch::markdown::{MarkdownConverter, MarkdownOptions};
    ///
    /// let converter = MarkdownConverter::new(MarkdownOptions::default());
    /// let artifact = converter.convert("<h1>Hello</h1><p>World</p>").unwrap();
    /// assert_eq!(artifact.text, "# Hello\n\nWorld");
    /// ```
    pub fn convert(&self, html: &str) -> Result<MarkdownArtifact, ConversionError> {
        if html.len() > self.max_input_bytes {
            return Err(ConversionError::InputTooLarge {
                size: html.len(),
                limit: self.max_input_bytes,
            });
        }

        let text = if html.trim().is_empty() {
            String::new()
        } else {
            // htmd recurses once per element level
            let fragment = Html::parse_fragment(html);
            if nesting_depth(fragment.tree.root()) > MAX_NESTING_DEPTH {
                return Err(ConversionError::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                });
            }

            let converter = handlers::build(&self.options, self.base_url.as_ref());
            let raw = converter
                .convert(html)
                .map_err(|e| ConversionError::Render(e.to_string()))?;
            handlers::finish(&raw)
        };

        Ok(MarkdownArtifact {
            hash: fingerprint(text.as_bytes()),
            text,
            options: self.options.clone(),
        })
    }

    /// Converts an extracted region; an empty region yields empty markdown
    pub fn convert_region(
        &self,
        region: &ExtractionResult,
    ) -> Result<MarkdownArtifact, ConversionError> {
        self.convert(&region.html)
    }
}

/// Deepest element nesting below `root`, walked without recursion
fn nesting_depth(root: NodeRef<'_, Node>) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(root, 0usize)];

    while let Some((node, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        for child in node.children() {
            if child.value().is_element() {
                stack.push((child, depth + 1));
            }
        }
    }
    deepest
}
