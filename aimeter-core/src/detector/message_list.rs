//! Message-list observation
//!
//! Watches the rendered list of user messages. Mutations are coalesced with
//! a quiescence deadline; once it passes, the list is re-read and every
//! fingerprint not seen before counts as one question.

use super::fingerprint::{Fingerprint, FingerprintScheme};
use super::Page;
use crate::config::DetectorConfig;
use crate::types::TrackedSite;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Polling schedule used before the known set is seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizePolicy {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&DetectorConfig> for StabilizePolicy {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.stabilize_initial_delay_ms),
            interval: Duration::from_millis(config.stabilize_interval_ms),
            max_attempts: config.stabilize_max_attempts,
        }
    }
}

/// Outcome of [`stabilize`]. Both variants carry the seed sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stabilization {
    /// Message count stopped changing between two samples
    Ready {
        attempts: u32,
        seed: Vec<Fingerprint>,
    },
    /// Attempts exhausted; the last sample is used anyway
    GaveUp {
        attempts: u32,
        seed: Vec<Fingerprint>,
    },
}

impl Stabilization {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts, .. } | Self::GaveUp { attempts, .. } => *attempts,
        }
    }

    pub fn into_seed(self) -> Vec<Fingerprint> {
        match self {
            Self::Ready { seed, .. } | Self::GaveUp { seed, .. } => seed,
        }
    }
}

/// Wait until the page's message list stops growing.
///
/// Samples after `initial_delay`, then every `interval`. The list is stable
/// once a sample has the same count as the previous one (never on the first
/// sample). After `max_attempts` samples the last one is returned as-is.
pub async fn stabilize(
    page: &dyn Page,
    scheme: &FingerprintScheme,
    policy: &StabilizePolicy,
) -> Stabilization {
    tokio::time::sleep(policy.initial_delay).await;

    let mut previous = 0usize;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let seed = scheme.fingerprints(&page.user_messages());
        let count = seed.len();
        tracing::debug!(attempt = attempts, count, "Sampled message list");

        if attempts > 1 && count == previous {
            return Stabilization::Ready { attempts, seed };
        }
        if attempts >= policy.max_attempts {
            return Stabilization::GaveUp { attempts, seed };
        }

        previous = count;
        tokio::time::sleep(policy.interval).await;
    }
}

/// Per-page-load state of message-list detection
#[derive(Debug)]
pub struct MessageListObserver {
    site: TrackedSite,
    scheme: FingerprintScheme,
    quiescence: Duration,
    known: HashSet<Fingerprint>,
    ready: bool,
    deadline: Option<Instant>,
}

impl MessageListObserver {
    pub fn new(site: TrackedSite, scheme: FingerprintScheme, quiescence: Duration) -> Self {
        Self {
            site,
            scheme,
            quiescence,
            known: HashSet::new(),
            ready: false,
            deadline: None,
        }
    }

    pub fn site(&self) -> TrackedSite {
        self.site
    }

    pub fn scheme(&self) -> FingerprintScheme {
        self.scheme
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Replace the known set with pre-existing messages and start observing
    pub fn seed(&mut self, fingerprints: impl IntoIterator<Item = Fingerprint>) {
        self.known = fingerprints.into_iter().collect();
        self.ready = true;
        tracing::debug!(site = %self.site, known = self.known.len(), "Message tracking ready");
    }

    /// A mutation batch; pushes the evaluation deadline out. Ignored until seeded.
    pub fn on_mutation(&mut self, now: Instant) {
        if self.ready {
            self.deadline = Some(now + self.quiescence);
        }
    }

    /// When the pending evaluation is due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Run the pending evaluation if due. Returns the number of new messages.
    pub fn poll(&mut self, now: Instant, page: &dyn Page) -> usize {
        match self.deadline {
            Some(deadline) if now >= deadline => self.deadline = None,
            _ => return 0,
        }

        let mut new = 0;
        for fingerprint in self.scheme.fingerprints(&page.user_messages()) {
            if self.known.insert(fingerprint) {
                new += 1;
            }
        }

        if new > 0 {
            tracing::debug!(site = %self.site, new, known = self.known.len(), "New user messages");
        }
        new
    }
}
