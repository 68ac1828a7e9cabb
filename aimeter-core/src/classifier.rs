//! URL to tracked-site classification

use crate::types::TrackedSite;

/// Classify a URL as one of the tracked sites.
///
/// Matches the URL against each site's host patterns in [`TrackedSite::ALL`]
/// order and returns the first hit. Empty or unrecognized URLs yield `None`.
pub fn classify(url: &str) -> Option<TrackedSite> {
    if url.is_empty() {
        return None;
    }

    TrackedSite::ALL
        .into_iter()
        .find(|site| site.host_patterns().iter().any(|p| url.contains(p)))
}
