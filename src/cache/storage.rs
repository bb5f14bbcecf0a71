//! Key-value storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::error::StorageError;

/// A stored string value and when it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
  pub value: String,
  pub stored_at: DateTime<Utc>,
}

/// Trait for durable string-keyed storage backends.
pub trait KvStorage: Send + Sync {
  /// Read one slot.
  fn get(&self, key: &str) -> Result<Option<StoredValue>, StorageError>;

  /// Write several slots as one unit.
  fn put_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

  /// Remove several slots. Missing keys are ignored.
  fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// Storage implementation that doesn't keep anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl KvStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<StoredValue>, StorageError> {
    Ok(None) // Always miss
  }

  fn put_all(&self, _entries: &[(&str, &str)]) -> Result<(), StorageError> {
    Ok(()) // Discard
  }

  fn remove_all(&self, _keys: &[&str]) -> Result<(), StorageError> {
    Ok(())
  }
}

/// SQLite-based storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

/// Schema for the key-value table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStorage {
  /// Open or create the database file, creating parent directories.
  pub fn open(path: &Path) -> Result<Self, StorageError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    Self::with_connection(conn)
  }

  /// Database that lives only as long as this value.
  #[allow(dead_code)]
  pub fn open_in_memory() -> Result<Self, StorageError> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self, StorageError> {
    conn.execute_batch(CACHE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }
}

impl KvStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<StoredValue>, StorageError> {
    let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

    let row: Option<(String, String)> = conn
      .query_row(
        "SELECT value, stored_at FROM kv_cache WHERE key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    match row {
      Some((value, stored_at)) => Ok(Some(StoredValue {
        value,
        stored_at: parse_datetime(&stored_at)?,
      })),
      None => Ok(None),
    }
  }

  fn put_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
    let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

    let tx = conn.transaction()?;
    for (key, value) in entries {
      tx.execute(
        "INSERT OR REPLACE INTO kv_cache (key, value, stored_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )?;
    }
    tx.commit()?;

    Ok(())
  }

  fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
    let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

    let tx = conn.transaction()?;
    for key in keys {
      tx.execute("DELETE FROM kv_cache WHERE key = ?", params![key])?;
    }
    tx.commit()?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StorageError> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|_| StorageError::Timestamp(s.to_string()))
}
