use crate::infrastructure::error::CoreError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable key-value persistence. Keys are independent; no atomicity is
/// assumed across them.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, CoreError>;
    async fn save(&self, key: &str, payload: &str) -> Result<(), CoreError>;
    async fn remove(&self, key: &str) -> Result<(), CoreError>;
    async fn remove_many(&self, keys: &[&str]) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    db_path: PathBuf,
}

impl SqliteSnapshotStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, CoreError> {
        Connection::open(&self.db_path).map_err(CoreError::from)
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        let connection = self.connect()?;
        let payload: Option<String> = connection
            .query_row(
                "SELECT payload FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    async fn save(&self, key: &str, payload: &str) -> Result<(), CoreError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO snapshots (key, payload, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               payload = excluded.payload,
               updated_at = excluded.updated_at",
            params![key, payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM snapshots WHERE key = ?1", params![key])?;
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), CoreError> {
        let connection = self.connect()?;
        for key in keys {
            connection.execute("DELETE FROM snapshots WHERE key = ?1", params![key])?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemorySnapshotStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CoreError> {
        self.entries
            .lock()
            .map_err(|error| CoreError::Storage(format!("in-memory lock poisoned: {error}")))
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn save(&self, key: &str, payload: &str) -> Result<(), CoreError> {
        self.lock()?.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), CoreError> {
        let mut entries = self.lock()?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}
