use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use validtime_core::{KeyValueStore, KeyValueStoreError};

const BUSY_TIMEOUT: Duration = Duration::from_millis(500);

/// Key-value store backed by a SQLite file. Every daemon opening the same
/// file shares one storage scope.
pub struct SqliteKeyValueStore {
    connection: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    pub fn new(path: &Path) -> Result<Self, KeyValueStoreError> {
        let connection = Connection::open(path).map_err(storage_error)?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(storage_error)?;

        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        debug!(?path, "sqlite key-value store opened");

        Ok(store)
    }

    pub fn in_memory() -> Result<Self, KeyValueStoreError> {
        let connection = Connection::open_in_memory().map_err(storage_error)?;

        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;

        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), KeyValueStoreError> {
        let connection = self.lock()?;
        connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS key_value (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(storage_error)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, KeyValueStoreError> {
        self.connection
            .lock()
            .map_err(|_| KeyValueStoreError::Unavailable {
                message: "connexion sqlite empoisonnée".to_string(),
            })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError> {
        let connection = self.lock()?;

        connection
            .query_row(
                "SELECT value FROM key_value WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(storage_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KeyValueStoreError> {
        let connection = self.lock()?;

        connection
            .execute(
                "INSERT OR REPLACE INTO key_value (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(storage_error)?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KeyValueStoreError> {
        let connection = self.lock()?;

        connection
            .execute("DELETE FROM key_value WHERE key = ?1", params![key])
            .map_err(storage_error)?;

        Ok(())
    }
}

fn storage_error(error: rusqlite::Error) -> KeyValueStoreError {
    KeyValueStoreError::Storage {
        message: error.to_string(),
    }
}
