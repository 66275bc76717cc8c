//! Content fingerprinting
//!
//! Every fingerprint is a lowercase hex SHA-256 digest, so it is always
//! [`HASH_LEN`] characters long regardless of input size.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a hex-encoded fingerprint
pub const HASH_LEN: usize = 64;

/// A fixed-length content fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wraps an existing hex digest, rejecting anything that is not one
    ///
    /// Used when reading fingerprints back from storage.
    pub fn from_hex(hex_digest: &str) -> Option<Self> {
        let valid = hex_digest.len() == HASH_LEN
            && hex_digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(hex_digest.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a byte sequence
///
/// # Example
///
/// ```
/// use pagecrunch::hash::fingerprint;
///
/// let a = fingerprint(b"hello");
/// let b = fingerprint(b"hello");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
pub fn fingerprint(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentHash(hex::encode(hasher.finalize()))
}

/// Collapses every whitespace run to a single space and trims the ends
///
/// Content fingerprints are taken over this form so that re-indented markup
/// does not register as a content change.
pub fn normalize_content(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            fingerprint(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_different_input_different_hash() {
        assert_ne!(fingerprint(b"content 1"), fingerprint(b"content 2"));
    }

    #[test]
    fn test_from_hex_roundtrip() {
        let hash = fingerprint(b"page");
        assert_eq!(ContentHash::from_hex(hash.as_str()), Some(hash));
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert_eq!(ContentHash::from_hex("abc"), None);
        assert_eq!(ContentHash::from_hex(&"G".repeat(HASH_LEN)), None);
        assert_eq!(ContentHash::from_hex(&"A".repeat(HASH_LEN)), None);
    }

    #[test]
    fn test_normalize_content() {
        assert_eq!(
            normalize_content("  <p>\n  Hello \t world</p>  "),
            "<p> Hello world</p>"
        );
        assert_eq!(normalize_content("   "), "");
    }
}
