//! Core domain types for aimeter
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **TrackedSite** | One of the fixed set of AI chat websites being measured |
//! | **DailyAggregate** | The persisted per-day record of time and question counts |
//! | **Accrual** | Adding elapsed seconds to a site while it is the focused, active tab |
//! | **Tab / Window** | Browser identifiers, opaque integers handed out by the browser |

use serde::{Deserialize, Serialize};

// ============================================
// Tracked sites
// ============================================

/// An AI chat website whose usage is measured.
///
/// The set is fixed at compile time. Enumeration order matters: URL
/// classification returns the first site whose host patterns match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedSite {
    ChatGpt,
    Gemini,
    Claude,
}

impl TrackedSite {
    /// All tracked sites in classification order.
    pub const ALL: [TrackedSite; 3] = [
        TrackedSite::ChatGpt,
        TrackedSite::Gemini,
        TrackedSite::Claude,
    ];

    /// Hostname substrings identifying this site.
    pub fn host_patterns(&self) -> &'static [&'static str] {
        match self {
            TrackedSite::ChatGpt => &["chat.openai.com", "chatgpt.com"],
            TrackedSite::Gemini => &["gemini.google.com"],
            TrackedSite::Claude => &["claude.ai"],
        }
    }

    /// Returns the display name for this site
    pub fn display_name(&self) -> &'static str {
        match self {
            TrackedSite::ChatGpt => "ChatGPT",
            TrackedSite::Gemini => "Gemini",
            TrackedSite::Claude => "Claude",
        }
    }

    /// Returns the identifier used in stored records and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedSite::ChatGpt => "chatgpt",
            TrackedSite::Gemini => "gemini",
            TrackedSite::Claude => "claude",
        }
    }
}

impl std::fmt::Display for TrackedSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TrackedSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chatgpt" | "ChatGPT" => Ok(TrackedSite::ChatGpt),
            "gemini" | "Gemini" => Ok(TrackedSite::Gemini),
            "claude" | "Claude" => Ok(TrackedSite::Claude),
            _ => Err(format!("unknown site: {}", s)),
        }
    }
}

// ============================================
// Daily aggregate
// ============================================

/// Time and question counters for one site (or the total).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteUsage {
    /// Seconds of active use
    #[serde(default)]
    pub time: u64,
    /// Questions submitted
    #[serde(default)]
    pub questions: u64,
}

impl SiteUsage {
    fn saturating_add(self, other: SiteUsage) -> SiteUsage {
        SiteUsage {
            time: self.time.saturating_add(other.time),
            questions: self.questions.saturating_add(other.questions),
        }
    }
}

/// Persisted usage record for one calendar day.
///
/// Serialized as
/// `{"date": "2025-01-31", "chatgpt": {...}, "gemini": {...}, "claude": {...}, "total": {...}}`.
/// `total` is always the element-wise sum of the site entries after any
/// write made through [`DailyStore`](crate::aggregate::DailyStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Day key, `YYYY-MM-DD` in local time
    pub date: String,
    #[serde(default)]
    pub chatgpt: SiteUsage,
    #[serde(default)]
    pub gemini: SiteUsage,
    #[serde(default)]
    pub claude: SiteUsage,
    #[serde(default)]
    pub total: SiteUsage,
}

impl DailyAggregate {
    /// All-zero record for the given day.
    pub fn zeroed(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            chatgpt: SiteUsage::default(),
            gemini: SiteUsage::default(),
            claude: SiteUsage::default(),
            total: SiteUsage::default(),
        }
    }

    /// Usage for one site.
    pub fn site(&self, site: TrackedSite) -> &SiteUsage {
        match site {
            TrackedSite::ChatGpt => &self.chatgpt,
            TrackedSite::Gemini => &self.gemini,
            TrackedSite::Claude => &self.claude,
        }
    }

    fn site_mut(&mut self, site: TrackedSite) -> &mut SiteUsage {
        match site {
            TrackedSite::ChatGpt => &mut self.chatgpt,
            TrackedSite::Gemini => &mut self.gemini,
            TrackedSite::Claude => &mut self.claude,
        }
    }

    /// Add seconds to a site, keeping the total in step.
    pub fn add_time(&mut self, site: TrackedSite, seconds: u64) {
        let usage = self.site_mut(site);
        usage.time = usage.time.saturating_add(seconds);
        self.recompute_total();
    }

    /// Add questions to a site, keeping the total in step.
    pub fn add_questions(&mut self, site: TrackedSite, count: u64) {
        let usage = self.site_mut(site);
        usage.questions = usage.questions.saturating_add(count);
        self.recompute_total();
    }

    /// Sum of the per-site entries.
    pub fn site_sum(&self) -> SiteUsage {
        TrackedSite::ALL
            .iter()
            .fold(SiteUsage::default(), |acc, s| acc.saturating_add(*self.site(*s)))
    }

    /// Overwrite `total` with the sum of the per-site entries.
    pub fn recompute_total(&mut self) {
        self.total = self.site_sum();
    }

    /// Whether `total` matches the per-site sum.
    pub fn is_consistent(&self) -> bool {
        self.total == self.site_sum()
    }

    /// Whether every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.site_sum() == SiteUsage::default() && self.total == SiteUsage::default()
    }
}

// ============================================
// Browser tabs
// ============================================

/// Browser tab identifier
pub type TabId = i64;

/// Browser window identifier
pub type WindowId = i64;

/// Snapshot of a tab's metadata at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    /// Current URL, absent for tabs the extension cannot see into
    pub url: Option<String>,
    /// Whether this is the selected tab of its window
    pub active: bool,
    /// Whether the tab's window currently has input focus
    pub focused: bool,
}
