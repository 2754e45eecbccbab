use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create storage directory: {0}")]
    DirectoryError(String),
}

/// Durable string key-value storage. Values are overwritten wholesale.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read-modify-write of one key with no other writer in between.
    ///
    /// `f` receives the current value and returns the value to write
    /// (`None` leaves storage untouched) plus a result for the caller.
    fn update<T, F>(&mut self, key: &str, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(Option<String>) -> (Option<String>, T),
    {
        let (value, out) = f(self.get(key)?);
        if let Some(value) = value {
            self.set(key, &value)?;
        }
        Ok(out)
    }

    /// Whether another writer may have changed the data since the last call.
    /// Backends that cannot tell always answer yes.
    fn changed(&mut self) -> Result<bool, StorageError> {
        Ok(true)
    }
}

/// Key-value storage in a single SQLite table
pub struct SqliteStore {
    conn: Connection,
    /// Last `PRAGMA data_version` seen; it moves when another connection commits
    data_version: Option<i64>,
}

impl SqliteStore {
    /// Open (or create) the storage file and initialize the schema
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        let store = SqliteStore {
            conn,
            data_version: None,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let store = SqliteStore {
            conn: Connection::open_in_memory()?,
            data_version: None,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StorageError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key     TEXT PRIMARY KEY,
                value   TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn update<T, F>(&mut self, key: &str, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(Option<String>) -> (Option<String>, T),
    {
        // IMMEDIATE takes the write lock before reading
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<String> = tx
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        let (value, out) = f(current);
        if let Some(value) = value {
            tx.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                rusqlite::params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(out)
    }

    fn changed(&mut self) -> Result<bool, StorageError> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        let changed = self.data_version != Some(version);
        self.data_version = Some(version);
        Ok(changed)
    }
}

/// Process-local storage, used by tests and as a throwaway backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}


