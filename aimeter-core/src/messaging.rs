//! Cross-context messages from page detectors to the background context

use crate::error::{Error, Result};
use crate::types::TrackedSite;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Runtime message wire format (`{"type":"QUESTION_ASKED","site":"claude"}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuntimeMessage {
    #[serde(rename = "QUESTION_ASKED")]
    QuestionAsked { site: TrackedSite },
}

/// Sending side of the runtime messaging channel.
pub trait Notifier: Send + Sync {
    /// Fails when the receiving context is gone.
    fn send(&self, message: RuntimeMessage) -> Result<()>;
}

/// [`Notifier`] over an in-process channel to the dispatcher
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<RuntimeMessage>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<RuntimeMessage>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn send(&self, message: RuntimeMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| Error::ChannelClosed("background context is gone".to_string()))
    }
}

/// Report one detected question. A torn-down channel is not an error.
pub fn notify_question(notifier: &dyn Notifier, site: TrackedSite) {
    match notifier.send(RuntimeMessage::QuestionAsked { site }) {
        Ok(()) => tracing::debug!(site = %site, "Question notification sent"),
        Err(e) => tracing::debug!(site = %site, error = %e, "Dropped question notification"),
    }
}
