use tracing::{debug, trace};

use crate::accumulator::PersistentAccumulator;
use crate::domain::Visibility;
use crate::session::{FlushOutcome, SessionTracker};

/// Maps visible/hidden transitions onto the session timer.
///
/// Hidden stops the timer and flushes the partial slice at once. Visible
/// opens a fresh slice and restarts the timer, so hidden gaps never count.
/// A hidden flush that fails is carried into the next visible slice.
#[derive(Debug, Default)]
pub struct VisibilityController {
    state: Visibility,
}

impl VisibilityController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn transition(
        &mut self,
        next: Visibility,
        now: i64,
        session: &mut SessionTracker,
        accumulator: &PersistentAccumulator,
    ) -> Option<FlushOutcome> {
        if next == self.state {
            trace!(%next, "visibility unchanged");
            return None;
        }
        self.state = next;

        match next {
            Visibility::Hidden => {
                let outcome = session.suspend(now, accumulator);
                debug!(?outcome, "hidden, timer stopped");
                outcome
            }
            Visibility::Visible => {
                let handle = session.resume(now);
                debug!(?handle, "visible, timer restarted");
                None
            }
        }
    }
}
