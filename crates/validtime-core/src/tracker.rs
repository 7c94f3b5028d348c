use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::accumulator::{PersistentAccumulator, DEFAULT_STORAGE_KEY};
use crate::business_process::{self, EndBusinessProcess, StartBusinessProcess};
use crate::config::TrackerConfig;
use crate::domain::Visibility;
use crate::ports::{Clock, KeyValueStore};
use crate::session::{FlushOutcome, SessionTracker, TimerHandle, DEFAULT_INTERVAL_MS};
use crate::visibility_controller::VisibilityController;

/// Overrides applied by [`ValidTimeTracker::initialize`]. A zero interval or
/// an empty key counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    pub interval_time: Option<u64>,
    pub storage_key: Option<String>,
}

impl From<&TrackerConfig> for InitOptions {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            interval_time: Some(config.interval_ms),
            storage_key: Some(config.storage_key.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerStatus {
    pub initialized: bool,
    pub visibility: Visibility,
    pub timer_active: bool,
    pub interval_ms: u64,
    pub storage_key: String,
    pub stored_ms: u64,
    pub pending_ms: u64,
}

/// One tracked instance. The host owns it and feeds it visibility changes
/// and timer ticks; no operation here fails or panics.
pub struct ValidTimeTracker {
    clock: Arc<dyn Clock>,
    accumulator: PersistentAccumulator,
    session: SessionTracker,
    visibility: VisibilityController,
    initialized: bool,
    disposed: bool,
}

impl ValidTimeTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_millis();

        Self {
            clock,
            accumulator: PersistentAccumulator::new(store, DEFAULT_STORAGE_KEY),
            session: SessionTracker::new(now, DEFAULT_INTERVAL_MS),
            visibility: VisibilityController::new(),
            initialized: false,
            disposed: false,
        }
    }

    /// Applies the options and starts the flush timer. Only the first call
    /// has any effect; returns whether this call was that one.
    pub fn initialize(&mut self, options: InitOptions) -> bool {
        if self.initialized {
            debug!("tracker already initialized, ignoring options");
            return false;
        }
        self.initialized = true;

        if let Some(interval_ms) = options.interval_time.filter(|interval| *interval > 0) {
            self.session.set_interval_ms(interval_ms);
        }
        if let Some(storage_key) = options.storage_key.filter(|key| !key.is_empty()) {
            self.accumulator = self.accumulator.with_key(storage_key);
        }

        let handle = self.session.start();
        info!(
            interval_ms = self.session.interval_ms(),
            storage_key = self.accumulator.key(),
            ?handle,
            "valid time tracking enabled"
        );
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn valid_time(&self) -> u64 {
        self.accumulator.total()
    }

    pub fn start_business_process(&self, request: &StartBusinessProcess) {
        business_process::start(&self.accumulator, request);
    }

    pub fn end_business_process(&self, request: &EndBusinessProcess) -> i64 {
        business_process::end(&self.accumulator, request)
    }

    /// Visibility changes are only observed between `initialize` and
    /// `dispose`.
    pub fn handle_visibility(&mut self, next: Visibility) -> Option<FlushOutcome> {
        if !self.initialized || self.disposed {
            debug!(%next, "visibility change ignored, tracker not active");
            return None;
        }

        let now = self.clock.now_millis();
        self.visibility
            .transition(next, now, &mut self.session, &self.accumulator)
    }

    pub fn on_tick(&mut self, handle: TimerHandle) -> Option<FlushOutcome> {
        let now = self.clock.now_millis();
        self.session.on_tick(handle, now, &self.accumulator)
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.session.timer()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.session.interval_ms())
    }

    /// Stops the timer and commits the current slice, like a hidden
    /// transition. The tracker stays inert afterwards.
    pub fn dispose(&mut self) -> Option<FlushOutcome> {
        self.initialized = true;
        if self.disposed {
            return None;
        }
        self.disposed = true;

        let now = self.clock.now_millis();
        let outcome = self.session.suspend(now, &self.accumulator);
        info!(?outcome, "valid time tracking disposed");
        outcome
    }

    pub fn status(&self) -> TrackerStatus {
        let now = self.clock.now_millis();

        TrackerStatus {
            initialized: self.initialized,
            visibility: self.visibility.state(),
            timer_active: self.session.is_running(),
            interval_ms: self.session.interval_ms(),
            storage_key: self.accumulator.key().to_string(),
            stored_ms: self.accumulator.total(),
            pending_ms: self.session.pending_ms(now),
        }
    }
}
