//! Focus state machine
//!
//! Decides which tab, if any, accrues time. It performs no I/O: callers feed
//! it the re-evaluated tab and apply the returned [`Transition`]s to a
//! [`TimerRegistry`](super::TimerRegistry).

use crate::classifier::classify;
use crate::types::{TabId, TabInfo, TrackedSite};

/// Accrual state of the background context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    Accruing { tab_id: TabId, site: TrackedSite },
}

/// Timer action produced by a state change. Stops always precede starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start { tab_id: TabId, site: TrackedSite },
    Stop { tab_id: TabId },
}

/// Idle/Accruing state machine; at most one tab accrues at a time.
#[derive(Debug, Default)]
pub struct FocusStateMachine {
    state: TrackerState,
}

impl FocusStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Re-evaluate against the active tab of the focused window.
    ///
    /// `None` covers both "no such tab" and "tab metadata unavailable".
    pub fn evaluate(&mut self, tab: Option<&TabInfo>) -> Vec<Transition> {
        let candidate = tab.and_then(|tab| {
            if !(tab.active && tab.focused) {
                return None;
            }
            let site = classify(tab.url.as_deref().unwrap_or(""))?;
            Some((tab.id, site))
        });

        match (self.state, candidate) {
            (TrackerState::Accruing { tab_id, site }, Some((new_tab, new_site)))
                if tab_id == new_tab && site == new_site =>
            {
                Vec::new()
            }
            (TrackerState::Accruing { tab_id, .. }, Some((new_tab, new_site))) => {
                self.state = TrackerState::Accruing {
                    tab_id: new_tab,
                    site: new_site,
                };
                vec![
                    Transition::Stop { tab_id },
                    Transition::Start {
                        tab_id: new_tab,
                        site: new_site,
                    },
                ]
            }
            (TrackerState::Idle, Some((tab_id, site))) => {
                self.state = TrackerState::Accruing { tab_id, site };
                vec![Transition::Start { tab_id, site }]
            }
            (_, None) => self.go_idle(),
        }
    }

    /// A tab was closed
    pub fn tab_removed(&mut self, removed: TabId) -> Vec<Transition> {
        match self.state {
            TrackerState::Accruing { tab_id, .. } if tab_id == removed => self.go_idle(),
            _ => Vec::new(),
        }
    }

    /// Focus moved to no window
    pub fn focus_lost(&mut self) -> Vec<Transition> {
        self.go_idle()
    }

    fn go_idle(&mut self) -> Vec<Transition> {
        match std::mem::take(&mut self.state) {
            TrackerState::Accruing { tab_id, .. } => vec![Transition::Stop { tab_id }],
            TrackerState::Idle => Vec::new(),
        }
    }
}
