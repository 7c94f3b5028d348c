use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use validtime_core::Visibility;

const CHANNEL_CAPACITY: usize = 16;

/// Publishes visible/hidden transitions of the tracked instance. Repeating
/// the current state is not a transition and is not published.
pub struct VisibilitySignal {
    sender: broadcast::Sender<Visibility>,
    current: Mutex<Visibility>,
}

impl VisibilitySignal {
    pub fn new(initial: Visibility) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            current: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> Visibility {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, next: Visibility) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == next {
            return false;
        }
        *current = next;

        if self.sender.send(next).is_err() {
            debug!(%next, "no visibility subscriber");
        }
        true
    }

    pub fn subscribe(&self) -> VisibilitySubscription {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        VisibilitySubscription {
            initial: *current,
            receiver: self.sender.subscribe(),
        }
    }
}

pub struct VisibilitySubscription {
    initial: Visibility,
    receiver: broadcast::Receiver<Visibility>,
}

impl VisibilitySubscription {
    /// State at subscription time.
    pub fn initial(&self) -> Visibility {
        self.initial
    }

    /// Next transition, or `None` once the signal is gone.
    pub async fn changed(&mut self) -> Option<Visibility> {
        loop {
            match self.receiver.recv().await {
                Ok(visibility) => return Some(visibility),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "visibility transitions dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        debug!("visibility subscription released");
    }
}
