//! Browser capability and lifecycle events
//!
//! The background context never holds tab state of its own: on every
//! lifecycle event it asks the [`Browser`] which tab is active in the focused
//! window and re-evaluates from that answer.

use crate::error::{Error, Result};
use crate::types::{TabId, TabInfo, WindowId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Tab and window metadata queries.
pub trait Browser: Send + Sync {
    /// Active tab of `window_id`, or of the focused window when `None`.
    ///
    /// `Ok(None)` means there is no such tab (no focused window, empty window).
    fn active_tab(&self, window_id: Option<WindowId>) -> Result<Option<TabInfo>>;
}

/// Tab load status reported with tab updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// Lifecycle events routed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// Browser started with the extension already installed
    Startup,
    /// Extension installed or updated
    Installed,
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabUpdated {
        tab_id: TabId,
        status: LoadStatus,
    },
    TabRemoved {
        tab_id: TabId,
    },
    /// Focus moved to `window_id`, or away from every window when `None`
    WindowFocusChanged {
        window_id: Option<WindowId>,
    },
}

/// Changes applied to an [`InMemoryBrowser`], as reported by a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowserUpdate {
    Startup,
    Installed,
    /// A new tab; becomes active only through a later `tab_activated`
    TabCreated {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default)]
        url: Option<String>,
    },
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
        status: LoadStatus,
    },
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabRemoved {
        tab_id: TabId,
    },
    WindowFocusChanged {
        #[serde(default)]
        window_id: Option<WindowId>,
    },
}

#[derive(Debug, Clone)]
struct TabRecord {
    window_id: WindowId,
    url: Option<String>,
    active: bool,
}

#[derive(Debug, Default)]
struct BrowserModel {
    tabs: BTreeMap<TabId, TabRecord>,
    focused_window: Option<WindowId>,
}

impl BrowserModel {
    fn snapshot(&self, tab_id: TabId) -> Option<TabInfo> {
        self.tabs.get(&tab_id).map(|tab| TabInfo {
            id: tab_id,
            window_id: tab.window_id,
            url: tab.url.clone(),
            active: tab.active,
            focused: self.focused_window == Some(tab.window_id),
        })
    }
}

/// Tab/window model kept in memory and fed by [`BrowserUpdate`]s.
#[derive(Debug, Default)]
pub struct InMemoryBrowser {
    model: Mutex<BrowserModel>,
}

impl InMemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tab in a window (inactive until activated)
    pub fn open_tab(&self, tab_id: TabId, window_id: WindowId, url: Option<String>) {
        let mut model = self.model.lock().unwrap();
        model.tabs.insert(
            tab_id,
            TabRecord {
                window_id,
                url,
                active: false,
            },
        );
    }

    /// Change a tab's URL; unknown tabs are ignored
    pub fn navigate(&self, tab_id: TabId, url: Option<String>) {
        let mut model = self.model.lock().unwrap();
        if let Some(tab) = model.tabs.get_mut(&tab_id) {
            tab.url = url;
        }
    }

    /// Make a tab the selected tab of `window_id`, creating it if unknown
    pub fn activate(&self, tab_id: TabId, window_id: WindowId) {
        let mut model = self.model.lock().unwrap();
        for tab in model.tabs.values_mut() {
            if tab.window_id == window_id {
                tab.active = false;
            }
        }
        let tab = model.tabs.entry(tab_id).or_insert(TabRecord {
            window_id,
            url: None,
            active: false,
        });
        tab.window_id = window_id;
        tab.active = true;
    }

    pub fn close_tab(&self, tab_id: TabId) {
        self.model.lock().unwrap().tabs.remove(&tab_id);
    }

    /// Move input focus to a window, or to none
    pub fn focus_window(&self, window_id: Option<WindowId>) {
        self.model.lock().unwrap().focused_window = window_id;
    }

    /// Current metadata of one tab
    pub fn tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.model.lock().unwrap().snapshot(tab_id)
    }

    /// Apply a host-reported change and return the event to dispatch, if any.
    pub fn apply(&self, update: BrowserUpdate) -> Option<BrowserEvent> {
        match update {
            BrowserUpdate::Startup => Some(BrowserEvent::Startup),
            BrowserUpdate::Installed => Some(BrowserEvent::Installed),
            BrowserUpdate::TabCreated {
                tab_id,
                window_id,
                url,
            } => {
                self.open_tab(tab_id, window_id, url);
                None
            }
            BrowserUpdate::TabUpdated {
                tab_id,
                url,
                status,
            } => {
                if url.is_some() {
                    self.navigate(tab_id, url);
                }
                Some(BrowserEvent::TabUpdated { tab_id, status })
            }
            BrowserUpdate::TabActivated { tab_id, window_id } => {
                self.activate(tab_id, window_id);
                Some(BrowserEvent::TabActivated { tab_id, window_id })
            }
            BrowserUpdate::TabRemoved { tab_id } => {
                self.close_tab(tab_id);
                Some(BrowserEvent::TabRemoved { tab_id })
            }
            BrowserUpdate::WindowFocusChanged { window_id } => {
                self.focus_window(window_id);
                Some(BrowserEvent::WindowFocusChanged { window_id })
            }
        }
    }
}

impl Browser for InMemoryBrowser {
    fn active_tab(&self, window_id: Option<WindowId>) -> Result<Option<TabInfo>> {
        let model = self
            .model
            .lock()
            .map_err(|_| Error::Browser("browser model lock poisoned".to_string()))?;

        let Some(window_id) = window_id.or(model.focused_window) else {
            return Ok(None);
        };

        let active = model
            .tabs
            .iter()
            .find(|(_, tab)| tab.window_id == window_id && tab.active)
            .map(|(id, _)| *id);

        Ok(active.and_then(|id| model.snapshot(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_active_tab_of_focused_window() {
        let browser = InMemoryBrowser::new();
        browser.open_tab(1, 10, url("https://claude.ai/"));
        browser.open_tab(2, 10, url("https://example.com/"));
        browser.activate(1, 10);
        browser.focus_window(Some(10));

        let tab = browser.active_tab(None).unwrap().unwrap();
        assert_eq!(tab.id, 1);
        assert!(tab.active);
        assert!(tab.focused);

        browser.activate(2, 10);
        let tab = browser.active_tab(None).unwrap().unwrap();
        assert_eq!(tab.id, 2);
        assert!(!browser.tab(1).unwrap().active);
    }

    #[test]
    fn test_no_focused_window_has_no_active_tab() {
        let browser = InMemoryBrowser::new();
        browser.activate(1, 10);
        assert!(browser.active_tab(None).unwrap().is_none());

        // Explicit window lookups still work, but report the window unfocused
        let tab = browser.active_tab(Some(10)).unwrap().unwrap();
        assert!(!tab.focused);
    }

    #[test]
    fn test_apply_maps_updates_to_events() {
        let browser = InMemoryBrowser::new();
        assert_eq!(
            browser.apply(BrowserUpdate::TabCreated {
                tab_id: 3,
                window_id: 1,
                url: url("https://gemini.google.com/app"),
            }),
            None
        );
        assert_eq!(
            browser.apply(BrowserUpdate::TabActivated {
                tab_id: 3,
                window_id: 1
            }),
            Some(BrowserEvent::TabActivated {
                tab_id: 3,
                window_id: 1
            })
        );
        browser.apply(BrowserUpdate::TabUpdated {
            tab_id: 3,
            url: url("https://chatgpt.com/"),
            status: LoadStatus::Complete,
        });
        assert_eq!(
            browser.tab(3).unwrap().url.as_deref(),
            Some("https://chatgpt.com/")
        );

        browser.apply(BrowserUpdate::TabRemoved { tab_id: 3 });
        assert!(browser.tab(3).is_none());
    }

    #[test]
    fn test_update_json_shape() {
        let update: BrowserUpdate = serde_json::from_str(
            r#"{"event":"tab_updated","tab_id":4,"url":"https://claude.ai/","status":"complete"}"#,
        )
        .unwrap();
        assert_eq!(
            update,
            BrowserUpdate::TabUpdated {
                tab_id: 4,
                url: url("https://claude.ai/"),
                status: LoadStatus::Complete,
            }
        );

        let update: BrowserUpdate =
            serde_json::from_str(r#"{"event":"window_focus_changed","window_id":null}"#).unwrap();
        assert_eq!(update, BrowserUpdate::WindowFocusChanged { window_id: None });
    }
}
