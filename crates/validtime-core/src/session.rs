use tracing::{debug, error, trace};

use crate::accumulator::PersistentAccumulator;

pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Identifies one periodic flush timer. A fresh handle is issued on every
/// start, so ticks scheduled for a cancelled timer can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Committed { added_ms: u64, total_ms: u64 },
    ClockWentBackwards { elapsed_ms: i64 },
    StorageFailed,
}

/// Current visible slice plus the single periodic flush timer.
#[derive(Debug)]
pub struct SessionTracker {
    session_start: i64,
    interval_ms: u64,
    timer: Option<TimerHandle>,
    next_timer_id: u64,
    carried_ms: u64,
}

impl SessionTracker {
    pub fn new(now: i64, interval_ms: u64) -> Self {
        Self {
            session_start: now,
            interval_ms,
            timer: None,
            next_timer_id: 0,
            carried_ms: 0,
        }
    }

    pub fn session_start(&self) -> i64 {
        self.session_start
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub(crate) fn set_interval_ms(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    /// Time from a slice whose final flush failed, waiting for the next
    /// visible slice.
    pub fn carried_ms(&self) -> u64 {
        self.carried_ms
    }

    /// Stops the timer and commits the current slice. A slice that cannot be
    /// committed is carried into the next [`resume`](Self::resume).
    pub fn suspend(
        &mut self,
        now: i64,
        accumulator: &PersistentAccumulator,
    ) -> Option<FlushOutcome> {
        let stopped = self.stop()?;
        trace!(?stopped, "timer stopped");

        let outcome = self.flush_now(now, accumulator);
        if outcome == FlushOutcome::StorageFailed {
            self.carried_ms = u64::try_from(now - self.session_start).unwrap_or(0);
            debug!(carried_ms = self.carried_ms, "unflushed slice carried over");
        }
        Some(outcome)
    }

    /// Opens a new slice at `now`, backdated by any carried time, and starts
    /// a fresh timer.
    pub fn resume(&mut self, now: i64) -> TimerHandle {
        self.session_start = now - std::mem::take(&mut self.carried_ms) as i64;
        self.start()
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn start(&mut self) -> TimerHandle {
        if let Some(previous) = self.stop() {
            trace!(?previous, "replacing active timer");
        }

        let handle = TimerHandle(self.next_timer_id);
        self.next_timer_id += 1;
        self.timer = Some(handle);
        handle
    }

    pub fn stop(&mut self) -> Option<TimerHandle> {
        self.timer.take()
    }

    /// Time accrued in the current slice but not yet committed.
    pub fn pending_ms(&self, now: i64) -> u64 {
        if !self.is_running() {
            return 0;
        }
        u64::try_from(now - self.session_start).unwrap_or(0)
    }

    /// Periodic callback. Commits only once a full interval has elapsed and
    /// only for the currently active timer.
    pub fn on_tick(
        &mut self,
        handle: TimerHandle,
        now: i64,
        accumulator: &PersistentAccumulator,
    ) -> Option<FlushOutcome> {
        if self.timer != Some(handle) {
            trace!(?handle, "ignoring tick from cancelled timer");
            return None;
        }

        let elapsed = now - self.session_start;
        if elapsed < self.interval_ms as i64 {
            return None;
        }

        Some(self.flush_now(now, accumulator))
    }

    pub fn flush_now(&mut self, now: i64, accumulator: &PersistentAccumulator) -> FlushOutcome {
        let elapsed_ms = now - self.session_start;
        if elapsed_ms < 0 {
            debug!(elapsed_ms, "clock went backwards, skipping flush");
            return FlushOutcome::ClockWentBackwards { elapsed_ms };
        }

        let added_ms = elapsed_ms as u64;
        match accumulator.try_add(added_ms) {
            Ok(total_ms) => {
                self.session_start = now;
                debug!(added_ms, total_ms, "valid time flushed");
                FlushOutcome::Committed { added_ms, total_ms }
            }
            Err(error) => {
                error!(%error, added_ms, "failed to flush valid time, slice kept for next flush");
                FlushOutcome::StorageFailed
            }
        }
    }
}
