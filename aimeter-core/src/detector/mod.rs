//! Question event detection
//!
//! Turns page-level signals into "the user asked one question on site S".
//! Each tracked site uses one of two strategies:
//!
//! - **Message list** (ChatGPT, Claude): diff fingerprints of rendered user
//!   messages after mutations settle
//! - **Submission action** (Gemini): count Enter/click gestures on the
//!   composer, suppressing repeats of the same text
//!
//! Detector state lives for one page load. [`run_page`] drives a detector
//! from a signal channel and reports detections through a
//! [`Notifier`](crate::messaging::Notifier).

mod fingerprint;
mod message_list;
mod page;
mod submission;

pub use fingerprint::{Fingerprint, FingerprintScheme};
pub use message_list::{stabilize, MessageListObserver, StabilizePolicy, Stabilization};
pub use page::run_page;
pub use submission::SubmissionObserver;

use crate::classifier::classify;
use crate::config::DetectorConfig;
use crate::types::TrackedSite;
use std::collections::BTreeMap;
use tokio::time::Instant;

/// A rendered user-authored message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageElement {
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

impl MessageElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attributes<'a>(
        mut self,
        attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        self.attributes
            .extend(attrs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }
}

/// Read access to the page's current document.
pub trait Page: Send + Sync {
    /// User-authored message elements, in document order
    fn user_messages(&self) -> Vec<MessageElement>;
}

/// Modifier keys held during a key press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Element that had focus when a key was pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    /// Text area, text input or content-editable element, with its content
    TextInput { text: String },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub modifiers: Modifiers,
    pub target: FocusTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTarget {
    /// Whether the click landed on (or inside) a button
    pub on_button: bool,
    /// Content of the page's composer, if one was found
    pub composer_text: Option<String>,
}

/// UI signals observed in the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSignal {
    /// A batch of DOM mutations
    Mutation,
    KeyDown(KeyPress),
    Click(ClickTarget),
}

/// Site-specific detection strategy for one page load
#[derive(Debug)]
pub enum Detector {
    MessageList(MessageListObserver),
    SubmissionAction(SubmissionObserver),
}

impl Detector {
    pub fn for_site(site: TrackedSite, config: &DetectorConfig) -> Self {
        match FingerprintScheme::for_site(site) {
            Some(scheme) => {
                Self::MessageList(MessageListObserver::new(site, scheme, config.quiescence()))
            }
            None => Self::SubmissionAction(SubmissionObserver::new(
                site,
                config.submission_quiet_window(),
            )),
        }
    }

    /// Detector for the page at `url`; `None` on untracked pages
    pub fn for_url(url: &str, config: &DetectorConfig) -> Option<Self> {
        classify(url).map(|site| Self::for_site(site, config))
    }

    pub fn site(&self) -> TrackedSite {
        match self {
            Self::MessageList(obs) => obs.site(),
            Self::SubmissionAction(obs) => obs.site(),
        }
    }

    /// Feed one signal. Returns detections that are known immediately.
    ///
    /// Message-list detections only surface through [`Detector::poll`].
    pub fn handle(&mut self, signal: &PageSignal, now: Instant) -> usize {
        match (self, signal) {
            (Self::MessageList(obs), PageSignal::Mutation) => {
                obs.on_mutation(now);
                0
            }
            (Self::SubmissionAction(obs), PageSignal::KeyDown(key)) => {
                usize::from(obs.on_key(key, now))
            }
            (Self::SubmissionAction(obs), PageSignal::Click(click)) => {
                usize::from(obs.on_click(click, now))
            }
            _ => 0,
        }
    }

    /// When [`Detector::poll`] next has work to do
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Self::MessageList(obs) => obs.deadline(),
            Self::SubmissionAction(_) => None,
        }
    }

    /// Run any due evaluation against the page
    pub fn poll(&mut self, now: Instant, page: &dyn Page) -> usize {
        match self {
            Self::MessageList(obs) => obs.poll(now, page),
            Self::SubmissionAction(_) => 0,
        }
    }
}
