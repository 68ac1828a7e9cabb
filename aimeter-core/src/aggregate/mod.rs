//! Daily aggregate store
//!
//! [`DailyStore`] owns every persisted [`DailyAggregate`]. Records are keyed
//! by the local calendar date (`YYYY-MM-DD`), created lazily on first read or
//! write, and never deleted. Every write is broadcast to subscribers with the
//! full updated record.
//!
//! ## Concurrency
//!
//! Timer ticks and question notifications update the same record from
//! different tasks. Each update re-reads the latest record, mutates one
//! field, recomputes `total` and writes the full record back, with no await
//! point between the read and the write. Writers within this process are
//! additionally serialized; writers in other processes sharing the same
//! backing store remain last-write-wins.

mod summary;

pub use summary::{most_used_site, week_summary, WeekDay};

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;
use crate::types::{DailyAggregate, TrackedSite};
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Capacity of the change notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Format a calendar date as a day key (`YYYY-MM-DD`).
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Day key for the current local date.
pub fn today_key() -> String {
    day_key(Local::now().date_naive())
}

/// Parse a `YYYY-MM-DD` day key.
pub fn parse_day_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| Error::InvalidDayKey(key.to_string()))
}

/// Persistent store of per-day usage records.
pub struct DailyStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<DailyAggregate>,
}

impl DailyStore {
    /// Create a store over the given key-value capability
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            kv,
            write_lock: Mutex::new(()),
            changes,
        }
    }

    /// Read a record without creating it.
    ///
    /// Absent and malformed records both read as `None`. A record whose
    /// `date` does not match its key counts as malformed.
    pub fn get(&self, key: &str) -> Result<Option<DailyAggregate>> {
        let mut found = self.kv.get(&[key])?;
        let Some(value) = found.remove(key) else {
            return Ok(None);
        };

        match serde_json::from_value::<DailyAggregate>(value) {
            Ok(record) if record.date == key => Ok(Some(record)),
            Ok(record) => {
                tracing::warn!(
                    day = %key,
                    stored_date = %record.date,
                    "Day record stored under the wrong key, treating as uninitialized"
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    day = %key,
                    error = %e,
                    "Malformed day record, treating as uninitialized"
                );
                Ok(None)
            }
        }
    }

    /// Read a record, creating and persisting the zero record if absent.
    pub fn get_or_init(&self, key: &str) -> Result<DailyAggregate> {
        let _guard = self.write_lock.lock().unwrap();
        self.load_or_init(key)
    }

    /// Add seconds to a site's time for the given day.
    pub fn increment_time(
        &self,
        key: &str,
        site: TrackedSite,
        seconds: u64,
    ) -> Result<DailyAggregate> {
        self.update(key, |record| record.add_time(site, seconds))
    }

    /// Add questions to a site's count for the given day.
    pub fn increment_questions(
        &self,
        key: &str,
        site: TrackedSite,
        count: u64,
    ) -> Result<DailyAggregate> {
        self.update(key, |record| record.add_questions(site, count))
    }

    /// Overwrite the day with the zero record.
    pub fn reset(&self, key: &str) -> Result<DailyAggregate> {
        parse_day_key(key)?;
        let record = DailyAggregate::zeroed(key);
        let _guard = self.write_lock.lock().unwrap();
        self.write(&record)?;
        tracing::info!(day = %key, "Day record reset");
        Ok(record)
    }

    /// Persist a full record as given, with `total` normalized.
    pub fn set(&self, mut record: DailyAggregate) -> Result<DailyAggregate> {
        parse_day_key(&record.date)?;
        record.recompute_total();
        let _guard = self.write_lock.lock().unwrap();
        self.write(&record)?;
        Ok(record)
    }

    /// Re-read the day and re-notify subscribers with it.
    pub fn refresh(&self, key: &str) -> Result<DailyAggregate> {
        let record = self.get_or_init(key)?;
        self.notify(&record);
        Ok(record)
    }

    /// Subscribe to every record written through this store.
    pub fn subscribe(&self) -> broadcast::Receiver<DailyAggregate> {
        self.changes.subscribe()
    }

    /// Subscribe to writes of a single day.
    pub fn subscribe_day(&self, key: impl Into<String>) -> DaySubscription {
        DaySubscription {
            key: key.into(),
            rx: self.changes.subscribe(),
        }
    }

    /// All stored day keys in ascending order.
    pub fn day_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .kv
            .keys()?
            .into_iter()
            .filter(|k| parse_day_key(k).is_ok())
            .collect())
    }

    fn update<F>(&self, key: &str, mutate: F) -> Result<DailyAggregate>
    where
        F: FnOnce(&mut DailyAggregate),
    {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_or_init(key)?;
        mutate(&mut record);
        record.recompute_total();
        self.write(&record)?;
        Ok(record)
    }

    /// Caller must hold `write_lock`.
    fn load_or_init(&self, key: &str) -> Result<DailyAggregate> {
        if let Some(record) = self.get(key)? {
            return Ok(record);
        }

        parse_day_key(key)?;
        let record = DailyAggregate::zeroed(key);
        self.write(&record)?;
        tracing::debug!(day = %key, "Initialized day record");
        Ok(record)
    }

    /// Caller must hold `write_lock`.
    fn write(&self, record: &DailyAggregate) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.kv.set(HashMap::from([(record.date.clone(), value)]))?;
        self.notify(record);
        Ok(())
    }

    fn notify(&self, record: &DailyAggregate) {
        // No receivers is not an error
        let _ = self.changes.send(record.clone());
    }
}

/// Change notifications for one day.
pub struct DaySubscription {
    key: String,
    rx: broadcast::Receiver<DailyAggregate>,
}

impl DaySubscription {
    /// The day this subscription follows
    pub fn day(&self) -> &str {
        &self.key
    }

    /// Wait for the next write of this day.
    ///
    /// Returns `None` once the store is dropped.
    pub async fn recv(&mut self) -> Option<DailyAggregate> {
        loop {
            match self.rx.recv().await {
                Ok(record) if record.date == self.key => return Some(record),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(day = %self.key, skipped, "Change subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
