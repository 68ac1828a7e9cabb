//! Background event dispatcher
//!
//! The single owner of tracking state in the background context. Browser
//! lifecycle events drive the [`FocusStateMachine`] and its timers; question
//! notifications from page detectors pass a per-site debounce and land in
//! the [`DailyStore`].

use crate::aggregate::{today_key, DailyStore};
use crate::browser::{Browser, BrowserEvent, LoadStatus};
use crate::config::DispatcherConfig;
use crate::error::{Error, Result};
use crate::messaging::{ChannelNotifier, RuntimeMessage};
use crate::tracker::{FocusStateMachine, TabTrackingState, TimerRegistry, TrackerState, Transition};
use crate::types::{TrackedSite, WindowId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Process-wide duplicate suppression for question notifications
#[derive(Debug)]
pub struct QuestionDebounce {
    window: Duration,
    last_accepted: HashMap<TrackedSite, Instant>,
}

impl QuestionDebounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Returns `false` if `site` already had a notification accepted within the window
    pub fn accept(&mut self, site: TrackedSite, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(&site) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }
        self.last_accepted.insert(site, now);
        true
    }
}

pub struct EventDispatcher {
    browser: Arc<dyn Browser>,
    store: Arc<DailyStore>,
    machine: FocusStateMachine,
    timers: TimerRegistry,
    questions: QuestionDebounce,
}

impl EventDispatcher {
    /// Must be created inside a tokio runtime; timers are spawned on it.
    pub fn new(
        browser: Arc<dyn Browser>,
        store: Arc<DailyStore>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            browser,
            timers: TimerRegistry::new(store.clone()),
            store,
            machine: FocusStateMachine::new(),
            questions: QuestionDebounce::new(config.question_debounce()),
        }
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.machine.state()
    }

    pub fn active_timers(&self) -> Vec<TabTrackingState> {
        self.timers.active()
    }

    /// Route one browser lifecycle event to the tab timer
    pub fn handle_browser_event(&mut self, event: &BrowserEvent) {
        tracing::trace!(?event, "Browser event");

        let transitions = match *event {
            BrowserEvent::Startup => self.reevaluate(None),
            BrowserEvent::Installed => {
                let key = today_key();
                if let Err(e) = self.store.get_or_init(&key) {
                    tracing::warn!(day = %key, error = %e, "Failed to initialize today's record");
                }
                self.reevaluate(None)
            }
            BrowserEvent::TabActivated { .. } => self.reevaluate(None),
            BrowserEvent::TabUpdated {
                status: LoadStatus::Complete,
                ..
            } => self.reevaluate(None),
            BrowserEvent::TabUpdated {
                status: LoadStatus::Loading,
                ..
            } => Vec::new(),
            BrowserEvent::TabRemoved { tab_id } => self.machine.tab_removed(tab_id),
            BrowserEvent::WindowFocusChanged { window_id: None } => self.machine.focus_lost(),
            BrowserEvent::WindowFocusChanged {
                window_id: Some(window_id),
            } => self.reevaluate(Some(window_id)),
        };

        self.timers.apply(&transitions);
    }

    /// Handle a runtime message. Returns `true` if a question was recorded.
    pub fn handle_message(&mut self, message: RuntimeMessage) -> bool {
        match message {
            RuntimeMessage::QuestionAsked { site } => {
                if !self.questions.accept(site, Instant::now()) {
                    tracing::debug!(site = %site, "Debounced question notification");
                    return false;
                }

                let key = today_key();
                match self.store.increment_questions(&key, site, 1) {
                    Ok(record) => {
                        tracing::info!(
                            site = %site,
                            day = %key,
                            questions = record.site(site).questions,
                            "Question recorded"
                        );
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            site = %site,
                            day = %key,
                            error = %e,
                            "Failed to record question"
                        );
                        false
                    }
                }
            }
        }
    }

    fn reevaluate(&mut self, window_id: Option<WindowId>) -> Vec<Transition> {
        let tab = match self.browser.active_tab(window_id) {
            Ok(tab) => tab,
            Err(e) => {
                tracing::warn!(error = %e, "Tab query failed, treating as untracked");
                None
            }
        };
        self.machine.evaluate(tab.as_ref())
    }

    /// Process events and messages until both channels close, then stop all timers
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<BrowserEvent>,
        mut messages: mpsc::UnboundedReceiver<RuntimeMessage>,
    ) {
        let mut events_open = true;
        let mut messages_open = true;

        while events_open || messages_open {
            tokio::select! {
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_browser_event(&event),
                    None => events_open = false,
                },
                message = messages.recv(), if messages_open => match message {
                    Some(message) => {
                        self.handle_message(message);
                    }
                    None => messages_open = false,
                },
            }
        }

        self.timers.stop_all();
        tracing::info!("Dispatcher stopped");
    }
}

/// Handle to a dispatcher running on its own task
pub struct DispatcherHandle {
    events_tx: mpsc::UnboundedSender<BrowserEvent>,
    messages_tx: mpsc::UnboundedSender<RuntimeMessage>,
    join: JoinHandle<()>,
}

/// Start a dispatcher task on the current runtime
pub fn spawn(
    browser: Arc<dyn Browser>,
    store: Arc<DailyStore>,
    config: &DispatcherConfig,
) -> DispatcherHandle {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (messages_tx, messages_rx) = mpsc::unbounded_channel();
    let dispatcher = EventDispatcher::new(browser, store, config);
    let join = tokio::spawn(dispatcher.run(events_rx, messages_rx));

    DispatcherHandle {
        events_tx,
        messages_tx,
        join,
    }
}

impl DispatcherHandle {
    /// Notifier for a page detector
    pub fn notifier(&self) -> ChannelNotifier {
        ChannelNotifier::new(self.messages_tx.clone())
    }

    pub fn send_event(&self, event: BrowserEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .map_err(|_| Error::ChannelClosed("dispatcher is not running".to_string()))
    }

    pub fn send_message(&self, message: RuntimeMessage) -> Result<()> {
        self.messages_tx
            .send(message)
            .map_err(|_| Error::ChannelClosed("dispatcher is not running".to_string()))
    }

    /// Close the channels and wait for the dispatcher to drain.
    ///
    /// Notifiers handed out by [`DispatcherHandle::notifier`] keep the
    /// message channel open; drop them first.
    pub async fn shutdown(self) {
        drop(self.events_tx);
        drop(self.messages_tx);
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Dispatcher task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::InMemoryBrowser;
    use crate::storage::MemoryStore;
    use crate::types::TabInfo;

    struct FailingBrowser;

    impl Browser for FailingBrowser {
        fn active_tab(&self, _window_id: Option<WindowId>) -> Result<Option<TabInfo>> {
            Err(Error::Browser("tab closed mid-query".to_string()))
        }
    }

    fn store() -> Arc<DailyStore> {
        Arc::new(DailyStore::new(Arc::new(MemoryStore::new())))
    }

    fn questions(store: &DailyStore, site: TrackedSite) -> u64 {
        store
            .get(&today_key())
            .unwrap()
            .map(|r| r.site(site).questions)
            .unwrap_or(0)
    }

    #[test]
    fn test_question_debounce_window() {
        let mut debounce = QuestionDebounce::new(Duration::from_millis(2000));
        let t0 = Instant::now();

        assert!(debounce.accept(TrackedSite::Claude, t0));
        assert!(!debounce.accept(TrackedSite::Claude, t0 + Duration::from_millis(1999)));
        // Independent per site
        assert!(debounce.accept(TrackedSite::Gemini, t0 + Duration::from_millis(10)));
        assert!(debounce.accept(TrackedSite::Claude, t0 + Duration::from_millis(2000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_notifications_counted_once() {
        let store = store();
        let mut dispatcher = EventDispatcher::new(
            Arc::new(InMemoryBrowser::new()),
            store.clone(),
            &DispatcherConfig::default(),
        );

        let asked = RuntimeMessage::QuestionAsked {
            site: TrackedSite::ChatGpt,
        };
        assert!(dispatcher.handle_message(asked));
        assert!(!dispatcher.handle_message(asked));
        assert_eq!(questions(&store, TrackedSite::ChatGpt), 1);

        tokio::time::advance(Duration::from_millis(2500)).await;
        assert!(dispatcher.handle_message(asked));
        assert_eq!(questions(&store, TrackedSite::ChatGpt), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_browser_failure_goes_idle() {
        let mut dispatcher = EventDispatcher::new(
            Arc::new(FailingBrowser),
            store(),
            &DispatcherConfig::default(),
        );

        dispatcher.handle_browser_event(&BrowserEvent::Startup);
        assert_eq!(dispatcher.tracker_state(), TrackerState::Idle);
        assert!(dispatcher.active_timers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_installed_initializes_today() {
        let store = store();
        let mut dispatcher = EventDispatcher::new(
            Arc::new(InMemoryBrowser::new()),
            store.clone(),
            &DispatcherConfig::default(),
        );

        dispatcher.handle_browser_event(&BrowserEvent::Installed);
        let record = store.get(&today_key()).unwrap().unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_changes_drive_timer() {
        let browser = Arc::new(InMemoryBrowser::new());
        browser.open_tab(1, 10, Some("https://claude.ai/".to_string()));
        browser.activate(1, 10);
        browser.focus_window(Some(10));

        let mut dispatcher =
            EventDispatcher::new(browser.clone(), store(), &DispatcherConfig::default());

        dispatcher.handle_browser_event(&BrowserEvent::TabActivated {
            tab_id: 1,
            window_id: 10,
        });
        assert_eq!(
            dispatcher.tracker_state(),
            TrackerState::Accruing {
                tab_id: 1,
                site: TrackedSite::Claude
            }
        );

        // Loading does not re-evaluate
        browser.navigate(1, Some("https://example.com/".to_string()));
        dispatcher.handle_browser_event(&BrowserEvent::TabUpdated {
            tab_id: 1,
            status: LoadStatus::Loading,
        });
        assert!(matches!(dispatcher.tracker_state(), TrackerState::Accruing { .. }));

        dispatcher.handle_browser_event(&BrowserEvent::TabUpdated {
            tab_id: 1,
            status: LoadStatus::Complete,
        });
        assert_eq!(dispatcher.tracker_state(), TrackerState::Idle);

        browser.navigate(1, Some("https://chatgpt.com/".to_string()));
        dispatcher.handle_browser_event(&BrowserEvent::WindowFocusChanged { window_id: Some(10) });
        assert!(matches!(dispatcher.tracker_state(), TrackerState::Accruing { .. }));

        browser.focus_window(None);
        dispatcher.handle_browser_event(&BrowserEvent::WindowFocusChanged { window_id: None });
        assert_eq!(dispatcher.tracker_state(), TrackerState::Idle);
        assert!(dispatcher.active_timers().is_empty());
    }
}
