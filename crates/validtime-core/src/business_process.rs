//! Valid-time cost of a business process spanning several instances.
//!
//! Starting a process stores the accumulator total under the caller's key;
//! ending it subtracts that snapshot from the current total. Any instance
//! sharing the storage scope can end a process another one started.

use tracing::{debug, warn};

use crate::accumulator::PersistentAccumulator;
use crate::domain::BusinessKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartBusinessProcess {
    pub unique_business_key: String,
}

impl StartBusinessProcess {
    pub fn new(unique_business_key: impl Into<String>) -> Self {
        Self {
            unique_business_key: unique_business_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndBusinessProcess {
    pub unique_business_key: String,
    pub auto_clear_storage: bool,
}

impl EndBusinessProcess {
    pub fn new(unique_business_key: impl Into<String>) -> Self {
        Self {
            unique_business_key: unique_business_key.into(),
            auto_clear_storage: true,
        }
    }

    pub fn keep_snapshot(mut self) -> Self {
        self.auto_clear_storage = false;
        self
    }
}

pub fn start(accumulator: &PersistentAccumulator, request: &StartBusinessProcess) {
    let Some(key) = resolve_key(accumulator, &request.unique_business_key) else {
        return;
    };

    let snapshot = accumulator.total();
    accumulator.write_value(key.as_str(), snapshot);
    debug!(%key, snapshot, "business process started");
}

/// Returns the valid time consumed since the matching start. Negative only
/// if the accumulator shrank in between.
pub fn end(accumulator: &PersistentAccumulator, request: &EndBusinessProcess) -> i64 {
    let Some(key) = resolve_key(accumulator, &request.unique_business_key) else {
        return 0;
    };

    let readings = accumulator.try_total().and_then(|total| {
        accumulator
            .try_read_value(key.as_str())
            .map(|snapshot| (total, snapshot))
    });

    let (total, snapshot) = match readings {
        Ok(readings) => readings,
        Err(error) => {
            warn!(%error, %key, "failed to read business process snapshot");
            return 0;
        }
    };

    if request.auto_clear_storage {
        accumulator.remove_value(key.as_str());
    }

    let duration = total as i64 - snapshot as i64;
    debug!(%key, duration, "business process ended");
    duration
}

fn resolve_key(accumulator: &PersistentAccumulator, raw: &str) -> Option<BusinessKey> {
    let key = BusinessKey::parse(raw)?;
    if key.as_str() == accumulator.key() {
        warn!(%key, "business key collides with the accumulator key, ignoring");
        return None;
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::accumulator::DEFAULT_STORAGE_KEY;
    use crate::fakes::FakeStore;

    fn setup(total: &str) -> (Arc<FakeStore>, PersistentAccumulator) {
        let store = Arc::new(FakeStore::new());
        store.given(DEFAULT_STORAGE_KEY, total);
        let accumulator = PersistentAccumulator::new(store.clone(), DEFAULT_STORAGE_KEY);
        (store, accumulator)
    }

    #[test]
    fn start_snapshots_current_total() {
        let (store, accumulator) = setup("1500");

        start(&accumulator, &StartBusinessProcess::new("A"));

        assert_eq!(store.value("A").as_deref(), Some("1500"));
    }

    #[test]
    fn start_overwrites_previous_snapshot() {
        let (store, accumulator) = setup("1500");
        store.given("A", "200");

        start(&accumulator, &StartBusinessProcess::new("A"));

        assert_eq!(store.value("A").as_deref(), Some("1500"));
    }

    #[test]
    fn end_returns_growth_and_clears_snapshot() {
        let (store, accumulator) = setup("1500");
        start(&accumulator, &StartBusinessProcess::new("A"));
        store.given(DEFAULT_STORAGE_KEY, "4200");

        let duration = end(&accumulator, &EndBusinessProcess::new("A"));

        assert_eq!(duration, 2700);
        assert!(store.value("A").is_none());
    }

    #[test]
    fn end_without_start_returns_full_total() {
        let (_store, accumulator) = setup("4200");

        assert_eq!(end(&accumulator, &EndBusinessProcess::new("never")), 4200);
    }

    #[test]
    fn start_then_end_immediately_is_zero() {
        let (_store, accumulator) = setup("777");
        start(&accumulator, &StartBusinessProcess::new("A"));

        assert_eq!(end(&accumulator, &EndBusinessProcess::new("A")), 0);
    }

    #[test]
    fn keep_snapshot_allows_repeated_end() {
        let (store, accumulator) = setup("100");
        start(&accumulator, &StartBusinessProcess::new("A"));
        store.given(DEFAULT_STORAGE_KEY, "350");

        let request = EndBusinessProcess::new("A").keep_snapshot();
        let first = end(&accumulator, &request);
        let second = end(&accumulator, &request);

        assert_eq!(first, 250);
        assert_eq!(second, 250);
        assert_eq!(store.value("A").as_deref(), Some("100"));
    }

    #[test]
    fn empty_key_is_a_no_op() {
        let (store, accumulator) = setup("100");

        start(&accumulator, &StartBusinessProcess::new(""));
        assert!(store.value("").is_none());

        assert_eq!(end(&accumulator, &EndBusinessProcess::new("")), 0);
    }

    #[test]
    fn accumulator_key_cannot_be_used_as_business_key() {
        let (store, accumulator) = setup("100");

        start(&accumulator, &StartBusinessProcess::new(DEFAULT_STORAGE_KEY));

        assert_eq!(store.value(DEFAULT_STORAGE_KEY).as_deref(), Some("100"));
        assert_eq!(
            end(&accumulator, &EndBusinessProcess::new(DEFAULT_STORAGE_KEY)),
            0
        );
    }

    #[test]
    fn read_failure_returns_zero_and_keeps_snapshot() {
        let (store, accumulator) = setup("100");
        store.given("A", "40");
        store.fail_reads(true);

        assert_eq!(end(&accumulator, &EndBusinessProcess::new("A")), 0);

        store.fail_reads(false);
        assert_eq!(store.value("A").as_deref(), Some("40"));
    }

    #[test]
    fn shrunken_accumulator_yields_negative_duration() {
        let (store, accumulator) = setup("500");
        store.given("A", "800");

        assert_eq!(end(&accumulator, &EndBusinessProcess::new("A")), -300);
    }
}
