//! Per-tab accrual timers

use super::state::Transition;
use crate::aggregate::{today_key, DailyStore};
use crate::types::{TabId, TrackedSite};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Fixed accrual tick period
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Seconds credited per tick
const TICK_SECONDS: u64 = 1;

/// In-memory record of a running timer. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabTrackingState {
    pub tab_id: TabId,
    pub site: TrackedSite,
    pub started_at: DateTime<Local>,
}

struct ActiveTimer {
    state: TabTrackingState,
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ActiveTimer {
    fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.abort();
    }
}

/// Owner of every running accrual timer.
///
/// Must be used from within a tokio runtime. Dropping the registry stops all
/// timers.
pub struct TimerRegistry {
    store: Arc<DailyStore>,
    timers: HashMap<TabId, ActiveTimer>,
}

impl TimerRegistry {
    pub fn new(store: Arc<DailyStore>) -> Self {
        Self {
            store,
            timers: HashMap::new(),
        }
    }

    /// Start accruing `site` for `tab_id`.
    ///
    /// Returns `false` when a timer already runs for the tab.
    pub fn start(&mut self, tab_id: TabId, site: TrackedSite) -> bool {
        if self.timers.contains_key(&tab_id) {
            tracing::debug!(tab_id, site = %site, "Timer already running");
            return false;
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(tick_loop(
            self.store.clone(),
            tab_id,
            site,
            cancelled.clone(),
        ));

        tracing::info!(tab_id, site = %site, "Started accrual timer");
        self.timers.insert(
            tab_id,
            ActiveTimer {
                state: TabTrackingState {
                    tab_id,
                    site,
                    started_at: Local::now(),
                },
                cancelled,
                handle,
            },
        );
        true
    }

    /// Stop the timer of `tab_id`. Returns `false` if none was running.
    pub fn stop(&mut self, tab_id: TabId) -> bool {
        match self.timers.remove(&tab_id) {
            Some(timer) => {
                let elapsed = Local::now() - timer.state.started_at;
                tracing::info!(
                    tab_id,
                    site = %timer.state.site,
                    elapsed_secs = elapsed.num_seconds(),
                    "Stopped accrual timer"
                );
                timer.cancel();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        let tabs: Vec<TabId> = self.timers.keys().copied().collect();
        for tab_id in tabs {
            self.stop(tab_id);
        }
    }

    pub fn is_running(&self, tab_id: TabId) -> bool {
        self.timers.contains_key(&tab_id)
    }

    /// Tracking states of the running timers
    pub fn active(&self) -> Vec<TabTrackingState> {
        self.timers.values().map(|t| t.state.clone()).collect()
    }

    /// Apply state machine output in order
    pub fn apply(&mut self, transitions: &[Transition]) {
        for transition in transitions {
            match *transition {
                Transition::Stop { tab_id } => {
                    self.stop(tab_id);
                }
                Transition::Start { tab_id, site } => {
                    self.start(tab_id, site);
                }
            }
        }
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.cancel();
        }
    }
}

async fn tick_loop(
    store: Arc<DailyStore>,
    tab_id: TabId,
    site: TrackedSite,
    cancelled: Arc<AtomicBool>,
) {
    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        let key = today_key();
        if let Err(e) = store.increment_time(&key, site, TICK_SECONDS) {
            tracing::warn!(tab_id, site = %site, day = %key, error = %e, "Failed to record tick");
        }
    }
}
