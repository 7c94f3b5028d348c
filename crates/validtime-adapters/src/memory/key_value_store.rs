use std::collections::HashMap;
use std::sync::Mutex;

use validtime_core::{KeyValueStore, KeyValueStoreError};

/// Process-local store, lost on restart. Used when no database is available.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> KeyValueStoreError {
        KeyValueStoreError::Unavailable {
            message: "stockage mémoire empoisonné".to_string(),
        }
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError> {
        let values = self.values.lock().map_err(|_| Self::poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KeyValueStoreError> {
        let mut values = self.values.lock().map_err(|_| Self::poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KeyValueStoreError> {
        let mut values = self.values.lock().map_err(|_| Self::poisoned())?;
        values.remove(key);
        Ok(())
    }
}
