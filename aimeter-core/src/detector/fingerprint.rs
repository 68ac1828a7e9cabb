//! Message fingerprints
//!
//! A fingerprint identifies one rendered user message across re-renders: the
//! first characters of its trimmed text plus a few site-specific attributes,
//! hashed with SHA-256.

use super::MessageElement;
use crate::types::TrackedSite;
use sha2::{Digest, Sha256};

/// Characters of message text that take part in the fingerprint
const TEXT_PREFIX_CHARS: usize = 50;

/// Hex-encoded SHA-256 identity of a message element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-site recipe for fingerprinting message elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintScheme {
    attributes: &'static [&'static str],
    skip_empty: bool,
}

impl FingerprintScheme {
    /// Scheme for sites detected through their message list.
    ///
    /// Returns `None` for sites that use submission-action detection.
    pub fn for_site(site: TrackedSite) -> Option<Self> {
        match site {
            TrackedSite::ChatGpt => Some(Self {
                attributes: &["data-testid", "data-message-id"],
                skip_empty: false,
            }),
            TrackedSite::Claude => Some(Self {
                attributes: &["class", "data-is-user"],
                skip_empty: true,
            }),
            TrackedSite::Gemini => None,
        }
    }

    /// Fingerprint one element, or `None` if the scheme ignores it
    pub fn fingerprint(&self, element: &MessageElement) -> Option<Fingerprint> {
        let text = element.text.trim();
        if self.skip_empty && text.is_empty() {
            return None;
        }

        let mut hasher = Sha256::new();
        let prefix: String = text.chars().take(TEXT_PREFIX_CHARS).collect();
        hasher.update(prefix.as_bytes());
        for name in self.attributes {
            hasher.update([0u8]);
            let value = element
                .attributes
                .get(*name)
                .map(String::as_str)
                .unwrap_or("");
            hasher.update(value.as_bytes());
        }

        Some(Fingerprint(hex::encode(hasher.finalize())))
    }

    /// Fingerprints of every element the scheme keeps, in page order
    pub fn fingerprints(&self, elements: &[MessageElement]) -> Vec<Fingerprint> {
        elements.iter().filter_map(|e| self.fingerprint(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(text: &str, attrs: &[(&str, &str)]) -> MessageElement {
        MessageElement::new(text).with_attributes(attrs.iter().copied())
    }

    #[test]
    fn test_gemini_has_no_scheme() {
        assert!(FingerprintScheme::for_site(TrackedSite::Gemini).is_none());
    }

    #[test]
    fn test_text_prefix_only() {
        let scheme = FingerprintScheme::for_site(TrackedSite::ChatGpt).unwrap();
        let base = "x".repeat(50);
        let a = element(&format!("{base}aaa"), &[]);
        let b = element(&format!("  {base}bbb  "), &[]);
        assert_eq!(scheme.fingerprint(&a), scheme.fingerprint(&b));
    }

    #[test]
    fn test_attributes_distinguish_identical_text() {
        let scheme = FingerprintScheme::for_site(TrackedSite::ChatGpt).unwrap();
        let a = element("hello", &[("data-message-id", "m1")]);
        let b = element("hello", &[("data-message-id", "m2")]);
        assert_ne!(scheme.fingerprint(&a), scheme.fingerprint(&b));

        // Attributes outside the scheme are ignored
        let c = element("hello", &[("data-message-id", "m1"), ("style", "x")]);
        assert_eq!(scheme.fingerprint(&a), scheme.fingerprint(&c));
    }

    #[test]
    fn test_claude_skips_empty_messages() {
        let claude = FingerprintScheme::for_site(TrackedSite::Claude).unwrap();
        let chatgpt = FingerprintScheme::for_site(TrackedSite::ChatGpt).unwrap();
        let blank = element("   ", &[("class", "user-message")]);

        assert!(claude.fingerprint(&blank).is_none());
        assert_eq!(chatgpt.fingerprint(&blank).unwrap().as_str().len(), 64);
    }
}
