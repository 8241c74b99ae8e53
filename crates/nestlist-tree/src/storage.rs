use crate::model::Node;
use anyhow::Result;
use async_trait::async_trait;
use nestlist_core::db;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, warn};

/// Key the whole tree is stored under.
pub const TREE_KEY: &str = "nestedListData";
/// Only schema this build reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ── Adapter trait ────────────────────────────────────────────────────

/// Asynchronous key-value store holding whole serialized values.
///
/// `put` overwrites; there are no partial updates and the last writer wins.
/// Implementations must apply writes in the order they are issued.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn put(&self, key: &str, value: &Value) -> Result<(), StorageError>;
}

// ── SQLite ───────────────────────────────────────────────────────────

/// `KvStore` backed by a single SQLite table.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Wrap `conn`, creating the table and checking the schema version.
    pub fn open(conn: Connection) -> Result<Self> {
        db::ensure_schema_version(&conn, SCHEMA_VERSION)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS nested_list (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM nested_list WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.conn.lock().execute(
            "INSERT INTO nested_list (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            rusqlite::params![key, text],
        )?;
        Ok(())
    }
}

/// Open the SQLite store at `path`.
///
/// A database that cannot be opened, or carries a schema this build does not
/// know, yields an [`UnavailableKvStore`] instead: the app still starts on the
/// default tree and the file is left untouched.
pub fn open_sqlite_store(path: &Path) -> Arc<dyn KvStore> {
    match db::open_db(path).and_then(SqliteKvStore::open) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            let reason = format!("{err:#}");
            error!(path = %path.display(), error = %reason, "cannot open tree store");
            Arc::new(UnavailableKvStore::new(reason))
        }
    }
}

// ── Unavailable ──────────────────────────────────────────────────────

/// `KvStore` standing in for a store that failed to open. Every call fails.
#[derive(Debug, Clone)]
pub struct UnavailableKvStore {
    reason: String,
}

impl UnavailableKvStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl KvStore for UnavailableKvStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    async fn put(&self, _key: &str, _value: &Value) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}

// ── In-memory ────────────────────────────────────────────────────────

/// `KvStore` kept in process memory. Can be told to fail upcoming writes.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Value>>,
    failing_writes: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls to `put` fail.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let failing = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::Unavailable("write rejected".to_string()));
        }
        self.entries.lock().insert(key.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Typed tree access ────────────────────────────────────────────────

/// Read the persisted tree, if any.
pub async fn load_tree(store: &dyn KvStore) -> Result<Option<Node>, StorageError> {
    match store.get(TREE_KEY).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Overwrite the persisted tree with `root`. A failed write is retried once.
pub async fn save_tree(store: &dyn KvStore, root: &Node) -> Result<(), StorageError> {
    let value = serde_json::to_value(root)?;
    match store.put(TREE_KEY, &value).await {
        Ok(()) => {
            debug!(nodes = root.node_count(), "tree saved");
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, "saving tree failed, retrying once");
            store.put(TREE_KEY, &value).await
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
