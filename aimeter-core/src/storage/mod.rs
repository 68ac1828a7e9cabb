//! Persistent key-value capability
//!
//! The daily aggregate store is built on top of a minimal key-value
//! interface so that it can run over SQLite in the host process and over an
//! in-memory map in tests:
//!
//! - [`KeyValueStore::get`] returns only the keys that exist
//! - [`KeyValueStore::set`] writes every entry of the mapping
//!
//! Implementations provide no transactions across calls; callers that need
//! read-modify-write semantics must serialize themselves.

mod memory;
pub mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Key-value capability holding JSON values.
pub trait KeyValueStore: Send + Sync {
    /// Read the given keys. Missing keys are absent from the result.
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>>;

    /// Write all entries, replacing existing values.
    fn set(&self, entries: HashMap<String, Value>) -> Result<()>;

    /// List every stored key in ascending order.
    fn keys(&self) -> Result<Vec<String>>;
}
