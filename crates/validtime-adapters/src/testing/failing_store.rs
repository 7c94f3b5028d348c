use validtime_core::{KeyValueStore, KeyValueStoreError};

/// Store whose every call fails with the configured error.
pub struct FailingKeyValueStore {
    error: KeyValueStoreError,
}

impl FailingKeyValueStore {
    pub fn unavailable() -> Self {
        Self {
            error: KeyValueStoreError::Unavailable {
                message: "storage disabled".to_string(),
            },
        }
    }

    pub fn with_error(error: KeyValueStoreError) -> Self {
        Self { error }
    }
}

impl KeyValueStore for FailingKeyValueStore {
    fn get(&self, _key: &str) -> Result<Option<String>, KeyValueStoreError> {
        Err(self.error.clone())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), KeyValueStoreError> {
        Err(self.error.clone())
    }

    fn remove(&self, _key: &str) -> Result<(), KeyValueStoreError> {
        Err(self.error.clone())
    }
}
