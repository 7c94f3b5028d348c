use std::sync::Arc;

use tracing::{error, warn};

use crate::ports::{KeyValueStore, KeyValueStoreError};

pub const DEFAULT_STORAGE_KEY: &str = "_valid_operating_time";

/// Total valid time, in milliseconds, persisted under a single key.
///
/// The plain accessors never fail: read errors become 0 and write errors are
/// logged and dropped. The `try_` variants surface the store error for
/// callers that must tell "absent" apart from "unreadable".
#[derive(Clone)]
pub struct PersistentAccumulator {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl PersistentAccumulator {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Same store, different accumulator key.
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self::new(Arc::clone(&self.store), key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn total(&self) -> u64 {
        self.read_value(&self.key)
    }

    pub fn try_total(&self) -> Result<u64, KeyValueStoreError> {
        self.try_read_value(&self.key)
    }

    pub fn try_add(&self, delta_ms: u64) -> Result<u64, KeyValueStoreError> {
        let total = self.try_total()?.saturating_add(delta_ms);
        self.store.set(&self.key, &total.to_string())?;
        Ok(total)
    }

    pub fn read_value(&self, key: &str) -> u64 {
        match self.try_read_value(key) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, key, "failed to read stored valid time, using 0");
                0
            }
        }
    }

    pub fn try_read_value(&self, key: &str) -> Result<u64, KeyValueStoreError> {
        let stored = self.store.get(key)?;
        Ok(stored.map(|raw| parse_millis(key, &raw)).unwrap_or(0))
    }

    pub fn write_value(&self, key: &str, value: u64) {
        if let Err(error) = self.store.set(key, &value.to_string()) {
            error!(%error, key, value, "failed to persist valid time");
        }
    }

    pub fn remove_value(&self, key: &str) {
        if let Err(error) = self.store.remove(key) {
            error!(%error, key, "failed to remove stored valid time");
        }
    }
}

fn parse_millis(key: &str, raw: &str) -> u64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }

    match trimmed.parse::<u64>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, raw, "malformed stored valid time, using 0");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeStore;

    fn accumulator_with(store: &Arc<FakeStore>) -> PersistentAccumulator {
        PersistentAccumulator::new(store.clone(), DEFAULT_STORAGE_KEY)
    }

    #[test]
    fn absent_key_reads_as_zero() {
        let store = Arc::new(FakeStore::new());
        let accumulator = accumulator_with(&store);

        assert_eq!(accumulator.total(), 0);
        assert_eq!(accumulator.try_total().unwrap(), 0);
    }

    #[test]
    fn reads_stored_value() {
        let store = Arc::new(FakeStore::new());
        store.given(DEFAULT_STORAGE_KEY, "1500");

        assert_eq!(accumulator_with(&store).total(), 1500);
    }

    #[test]
    fn malformed_value_reads_as_zero() {
        let store = Arc::new(FakeStore::new());
        store.given(DEFAULT_STORAGE_KEY, "not-a-number");
        assert_eq!(accumulator_with(&store).total(), 0);

        store.given(DEFAULT_STORAGE_KEY, "-20");
        assert_eq!(accumulator_with(&store).total(), 0);

        store.given(DEFAULT_STORAGE_KEY, "");
        assert_eq!(accumulator_with(&store).total(), 0);
    }

    #[test]
    fn read_failure_is_swallowed() {
        let store = Arc::new(FakeStore::new());
        store.given(DEFAULT_STORAGE_KEY, "900");
        store.fail_reads(true);

        let accumulator = accumulator_with(&store);

        assert_eq!(accumulator.total(), 0);
        assert!(accumulator.try_total().is_err());
    }

    #[test]
    fn try_add_persists_new_total() {
        let store = Arc::new(FakeStore::new());
        store.given(DEFAULT_STORAGE_KEY, "1000");
        let accumulator = accumulator_with(&store);

        let total = accumulator.try_add(500).unwrap();

        assert_eq!(total, 1500);
        assert_eq!(store.value(DEFAULT_STORAGE_KEY).as_deref(), Some("1500"));
    }

    #[test]
    fn try_add_does_not_write_when_read_fails() {
        let store = Arc::new(FakeStore::new());
        store.given(DEFAULT_STORAGE_KEY, "1000");
        store.fail_reads(true);

        let result = accumulator_with(&store).try_add(500);

        assert!(result.is_err());
        assert_eq!(store.value(DEFAULT_STORAGE_KEY).as_deref(), Some("1000"));
    }

    #[test]
    fn write_failure_is_ignored() {
        let store = Arc::new(FakeStore::new());
        store.fail_writes(true);
        let accumulator = accumulator_with(&store);

        accumulator.write_value("snapshot", 10);
        accumulator.remove_value("snapshot");

        assert!(store.value("snapshot").is_none());
    }

    #[test]
    fn with_key_targets_another_entry() {
        let store = Arc::new(FakeStore::new());
        store.given("custom", "42");

        let accumulator = accumulator_with(&store).with_key("custom");

        assert_eq!(accumulator.key(), "custom");
        assert_eq!(accumulator.total(), 42);
    }
}
