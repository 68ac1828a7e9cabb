//! Submission-action observation
//!
//! Counts the two submission gestures directly: Enter in the composer, or a
//! click on a button while the composer holds text. The same text accepted
//! twice within the quiet window is one submission.

use super::{ClickTarget, FocusTarget, KeyPress};
use crate::types::TrackedSite;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct SubmissionObserver {
    site: TrackedSite,
    quiet_window: Duration,
    last: Option<(String, Instant)>,
}

impl SubmissionObserver {
    pub fn new(site: TrackedSite, quiet_window: Duration) -> Self {
        Self {
            site,
            quiet_window,
            last: None,
        }
    }

    pub fn site(&self) -> TrackedSite {
        self.site
    }

    /// Returns `true` if the key press submits a new question
    pub fn on_key(&mut self, key: &KeyPress, now: Instant) -> bool {
        if key.key != "Enter" || key.modifiers.any() {
            return false;
        }
        match &key.target {
            FocusTarget::TextInput { text } => self.accept(text, now),
            FocusTarget::Other => false,
        }
    }

    /// Returns `true` if the click submits a new question
    pub fn on_click(&mut self, click: &ClickTarget, now: Instant) -> bool {
        if !click.on_button {
            return false;
        }
        match &click.composer_text {
            Some(text) => self.accept(text, now),
            None => false,
        }
    }

    fn accept(&mut self, text: &str, now: Instant) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        if let Some((last_text, last_at)) = &self.last {
            if last_text == text && now.duration_since(*last_at) <= self.quiet_window {
                tracing::trace!(site = %self.site, "Suppressed repeated submission");
                return false;
            }
        }

        self.last = Some((text.to_string(), now));
        tracing::debug!(site = %self.site, "Submission detected");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Modifiers;

    fn enter(text: &str) -> KeyPress {
        KeyPress {
            key: "Enter".to_string(),
            modifiers: Modifiers::default(),
            target: FocusTarget::TextInput {
                text: text.to_string(),
            },
        }
    }

    fn click(text: Option<&str>) -> ClickTarget {
        ClickTarget {
            on_button: true,
            composer_text: text.map(str::to_string),
        }
    }

    fn observer() -> SubmissionObserver {
        SubmissionObserver::new(TrackedSite::Gemini, Duration::from_millis(1000))
    }

    #[test]
    fn test_key_and_click_for_same_text_count_once() {
        let mut obs = observer();
        let t0 = Instant::now();
        assert!(obs.on_key(&enter("what is rust?"), t0));
        assert!(!obs.on_click(&click(Some("what is rust?")), t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_different_text_counts_immediately() {
        let mut obs = observer();
        let t0 = Instant::now();
        assert!(obs.on_key(&enter("first"), t0));
        assert!(obs.on_key(&enter("second"), t0 + Duration::from_millis(50)));
    }

    #[test]
    fn test_same_text_after_quiet_window_counts() {
        let mut obs = observer();
        let t0 = Instant::now();
        assert!(obs.on_key(&enter("again"), t0));
        // Exactly at the window is still suppressed
        assert!(!obs.on_key(&enter("again"), t0 + Duration::from_millis(1000)));
        assert!(obs.on_key(&enter("again"), t0 + Duration::from_millis(1001)));
    }

    #[test]
    fn test_gestures_that_do_not_submit() {
        let mut obs = observer();
        let now = Instant::now();

        let mut shift_enter = enter("draft");
        shift_enter.modifiers.shift = true;
        assert!(!obs.on_key(&shift_enter, now));

        let mut ctrl_enter = enter("draft");
        ctrl_enter.modifiers.ctrl = true;
        assert!(!obs.on_key(&ctrl_enter, now));

        let mut other_key = enter("draft");
        other_key.key = "a".to_string();
        assert!(!obs.on_key(&other_key, now));

        let outside = KeyPress {
            key: "Enter".to_string(),
            modifiers: Modifiers::default(),
            target: FocusTarget::Other,
        };
        assert!(!obs.on_key(&outside, now));

        assert!(!obs.on_key(&enter("   "), now));
        assert!(!obs.on_click(&click(None), now));
        assert!(!obs.on_click(&click(Some("  ")), now));
        assert!(!obs.on_click(
            &ClickTarget {
                on_button: false,
                composer_text: Some("draft".to_string()),
            },
            now
        ));
    }
}
