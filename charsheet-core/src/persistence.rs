//! SQLite adapter for the settings port.
//!
//! Each settings key of the extension namespace is one row:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS extension_settings (
//!     namespace  TEXT NOT NULL,
//!     key        TEXT NOT NULL,
//!     value      TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     PRIMARY KEY (namespace, key)
//! );
//! ```
//!
//! The whole namespace is loaded on open and served from memory. `set` only
//! marks keys dirty; `save` upserts the dirty rows in one transaction.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, params};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{Result, SheetError};
use crate::settings::SettingsStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS extension_settings (
    namespace  TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
);";

/// Settings namespace persisted in an SQLite database.
pub struct SqliteSettings {
    conn: Connection,
    namespace: String,
    values: BTreeMap<String, Value>,
    dirty: BTreeSet<String>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSettings")
            .field("db_path", &self.db_path)
            .field("namespace", &self.namespace)
            .field("keys", &self.values.len())
            .field("dirty", &self.dirty.len())
            .finish_non_exhaustive()
    }
}

impl SqliteSettings {
    /// Open (or create) the database at `config.db_path` and load the
    /// configured namespace.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::Database`] on SQLite failures.
    pub fn open(config: &PersistenceConfig) -> Result<Self> {
        Self::open_at(&config.db_path, config)
    }

    /// Like [`open`](Self::open) with an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::Database`] on SQLite failures.
    pub fn open_at<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        let store = Self::load(conn, &config.namespace, db_path)?;
        info!(
            path = %store.db_path.display(),
            namespace = %store.namespace,
            keys = store.values.len(),
            "Settings store opened"
        );
        Ok(store)
    }

    /// In-memory database, useful for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::Database`] on SQLite failures.
    pub fn open_in_memory(namespace: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Self::load(conn, namespace, PathBuf::from(":memory:"))
    }

    fn load(conn: Connection, namespace: &str, db_path: PathBuf) -> Result<Self> {
        let mut values = BTreeMap::new();
        {
            let mut stmt = conn
                .prepare_cached("SELECT key, value FROM extension_settings WHERE namespace = ?1")?;
            let rows = stmt.query_map(params![namespace], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (key, raw) = row?;
                match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => {
                        values.insert(key, value);
                    }
                    Err(e) => warn!(key = %key, error = %e, "Skipping unreadable settings row"),
                }
            }
        }

        Ok(Self {
            conn,
            namespace: namespace.to_string(),
            values,
            dirty: BTreeSet::new(),
            db_path,
        })
    }

    /// Number of keys with unsaved changes.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.dirty.len()
    }

    /// All keys currently held for the namespace.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// The whole namespace as one JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }
}

impl SettingsStore for SqliteSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        self.dirty.insert(key.to_string());
    }

    fn save(&mut self) -> Result<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO extension_settings (namespace, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(namespace, key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
            )?;
            for key in &self.dirty {
                let Some(value) = self.values.get(key) else {
                    continue;
                };
                let json = serde_json::to_string(value)
                    .map_err(|e| SheetError::Serialization(e.to_string()))?;
                stmt.execute(params![self.namespace, key, json, now])?;
            }
        }
        tx.commit()?;

        debug!(
            namespace = %self.namespace,
            rows = self.dirty.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved settings"
        );
        self.dirty.clear();
        Ok(())
    }
}
