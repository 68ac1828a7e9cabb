//! In-process key-value store

use super::KeyValueStore;
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Key-value store backed by a map in memory.
///
/// Counts `set` calls so callers can verify how many writes an operation
/// actually performed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls made so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Store a raw value without counting it as a write (fixture seeding)
    pub fn insert_raw(&self, key: impl Into<String>, value: Value) {
        self.entries.write().unwrap().insert(key.into(), value);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
        let mut stored = self.entries.write().map_err(|_| poisoned())?;
        stored.extend(entries);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.keys().cloned().collect())
    }
}

fn poisoned() -> Error {
    Error::Storage("memory store lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_returns_only_present_keys() {
        let store = MemoryStore::new();
        store
            .set(HashMap::from([("a".to_string(), json!(1))]))
            .unwrap();

        let got = store.get(&["a", "b"]).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!(1));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_insert_raw_is_not_counted() {
        let store = MemoryStore::new();
        store.insert_raw("2025-01-01", json!("garbage"));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.keys().unwrap(), vec!["2025-01-01".to_string()]);
    }
}
