//! SQLite-backed key-value store

use super::schema;
use super::KeyValueStore;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Key-value store persisted in a SQLite file (single connection)
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets a CLI reader run next to the background host
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        schema::run_migrations(&conn)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT value FROM entries WHERE key = ?1")?;

        let mut found = HashMap::new();
        for key in keys {
            let raw: Option<String> = stmt
                .query_row(params![key], |row| row.get(0))
                .optional()?;

            let Some(raw) = raw else { continue };
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    found.insert(key.to_string(), value);
                }
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        error = %e,
                        "Stored value is not valid JSON, treating as absent"
                    );
                }
            }
        }

        Ok(found)
    }

    fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO entries (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
            )?;
            let now = chrono::Utc::now().to_rfc3339();
            for (key, value) in &entries {
                stmt.execute(params![key, serde_json::to_string(value)?, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key FROM entries ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }
}
