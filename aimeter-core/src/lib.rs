//! # aimeter-core
//!
//! Core library for aimeter - a usage meter for AI chat websites.
//!
//! This library provides:
//! - URL classification of tracked sites (ChatGPT, Gemini, Claude)
//! - The daily aggregate store over a persistent key-value capability
//! - Focus tracking with per-tab accrual timers
//! - Question detection from page signals
//! - The background event dispatcher
//! - Configuration and logging infrastructure
//!
//! ## Architecture
//!
//! Browser tab/window events flow into the [`EventDispatcher`], which drives
//! the focus state machine and its one-second timers. Page-resident
//! detectors report questions over a runtime channel to the same
//! dispatcher. Both paths converge on the [`DailyStore`], which broadcasts
//! every write to read-side subscribers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use aimeter_core::{Config, DailyStore, SqliteStore};
//! use std::sync::Arc;
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let kv = SqliteStore::open(&config.resolved_database_path()).expect("failed to open database");
//! kv.migrate().expect("failed to run migrations");
//!
//! let store = DailyStore::new(Arc::new(kv));
//! let today = store.get_or_init(&aimeter_core::today_key()).expect("failed to read today");
//! println!("{} seconds today", today.total.time);
//! ```

// Re-export commonly used items at the crate root
pub use aggregate::{day_key, parse_day_key, today_key, DailyStore};
pub use browser::{Browser, BrowserEvent, BrowserUpdate, InMemoryBrowser};
pub use classifier::classify;
pub use config::Config;
pub use dispatcher::{DispatcherHandle, EventDispatcher};
pub use error::{Error, Result};
pub use messaging::{Notifier, RuntimeMessage};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use types::*;

// Public modules
pub mod aggregate;
pub mod browser;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod logging;
pub mod messaging;
pub mod storage;
pub mod tracker;
pub mod types;
