use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use validtime_core::{
    EndBusinessProcess, FlushOutcome, InitOptions, StartBusinessProcess, TimerHandle,
    TrackerStatus, ValidTimeTracker, Visibility,
};

use crate::visibility::VisibilitySubscription;

pub enum TrackerMessage {
    GetValidTime {
        reply: oneshot::Sender<u64>,
    },
    GetStatus {
        reply: oneshot::Sender<TrackerStatus>,
    },
    StartBusinessProcess {
        request: StartBusinessProcess,
        reply: oneshot::Sender<()>,
    },
    EndBusinessProcess {
        request: EndBusinessProcess,
        reply: oneshot::Sender<i64>,
    },
    Shutdown {
        reply: oneshot::Sender<Option<FlushOutcome>>,
    },
}

struct ActiveTimer {
    handle: TimerHandle,
    interval: Interval,
}

impl ActiveTimer {
    fn start(handle: TimerHandle, period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { handle, interval }
    }
}

/// Owns the tracker. Requests, visibility transitions and timer ticks are
/// all handled on this one task.
pub struct TrackerActor {
    receiver: mpsc::Receiver<TrackerMessage>,
    visibility: VisibilitySubscription,
    tracker: ValidTimeTracker,
    options: InitOptions,
    timer: Option<ActiveTimer>,
}

#[derive(Clone)]
pub struct TrackerHandle {
    sender: mpsc::Sender<TrackerMessage>,
}

impl TrackerHandle {
    pub async fn valid_time(&self) -> Option<u64> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(TrackerMessage::GetValidTime { reply })
            .await
            .ok()?;
        receiver.await.ok()
    }

    pub async fn status(&self) -> Option<TrackerStatus> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(TrackerMessage::GetStatus { reply })
            .await
            .ok()?;
        receiver.await.ok()
    }

    pub async fn start_business_process(&self, unique_business_key: String) -> Option<()> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(TrackerMessage::StartBusinessProcess {
                request: StartBusinessProcess::new(unique_business_key),
                reply,
            })
            .await
            .ok()?;
        receiver.await.ok()
    }

    pub async fn end_business_process(
        &self,
        unique_business_key: String,
        auto_clear_storage: bool,
    ) -> Option<i64> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(TrackerMessage::EndBusinessProcess {
                request: EndBusinessProcess {
                    unique_business_key,
                    auto_clear_storage,
                },
                reply,
            })
            .await
            .ok()?;
        receiver.await.ok()
    }

    /// Stops the actor after a final flush and returns that flush.
    pub async fn shutdown(&self) -> Option<FlushOutcome> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(TrackerMessage::Shutdown { reply })
            .await
            .ok()?;
        receiver.await.ok().flatten()
    }
}

impl TrackerActor {
    pub fn new(
        tracker: ValidTimeTracker,
        options: InitOptions,
        visibility: VisibilitySubscription,
    ) -> (Self, TrackerHandle) {
        let (sender, receiver) = mpsc::channel(32);

        let actor = Self {
            receiver,
            visibility,
            tracker,
            options,
            timer: None,
        };

        let handle = TrackerHandle { sender };

        (actor, handle)
    }

    pub async fn run(mut self) {
        self.tracker.initialize(std::mem::take(&mut self.options));
        if self.visibility.initial() == Visibility::Hidden {
            self.tracker.handle_visibility(Visibility::Hidden);
        }
        self.sync_timer();

        let mut visibility_open = true;

        loop {
            tokio::select! {
                message = self.receiver.recv() => {
                    let keep_running = match message {
                        Some(message) => self.handle_message(message),
                        None => {
                            self.tracker.dispose();
                            false
                        }
                    };
                    if !keep_running {
                        break;
                    }
                }
                changed = self.visibility.changed(), if visibility_open => {
                    match changed {
                        Some(next) => {
                            info!(%next, "visibility changed");
                            self.tracker.handle_visibility(next);
                        }
                        None => {
                            debug!("visibility signal closed");
                            visibility_open = false;
                        }
                    }
                }
                handle = next_tick(&mut self.timer) => {
                    trace!(?handle, "flush timer tick");
                    self.tracker.on_tick(handle);
                }
            }

            self.sync_timer();
        }

        self.visibility.unsubscribe();
        debug!("tracker actor stopped");
    }

    fn handle_message(&mut self, message: TrackerMessage) -> bool {
        match message {
            TrackerMessage::GetValidTime { reply } => {
                let _ = reply.send(self.tracker.valid_time());
            }
            TrackerMessage::GetStatus { reply } => {
                let _ = reply.send(self.tracker.status());
            }
            TrackerMessage::StartBusinessProcess { request, reply } => {
                self.tracker.start_business_process(&request);
                let _ = reply.send(());
            }
            TrackerMessage::EndBusinessProcess { request, reply } => {
                let duration = self.tracker.end_business_process(&request);
                let _ = reply.send(duration);
            }
            TrackerMessage::Shutdown { reply } => {
                let _ = reply.send(self.tracker.dispose());
                return false;
            }
        }
        true
    }

    /// Keeps the tokio interval in step with the tracker's timer handle.
    fn sync_timer(&mut self) {
        let wanted = self.tracker.timer();
        let running = self.timer.as_ref().map(|active| active.handle);
        if wanted == running {
            return;
        }

        self.timer = wanted.map(|handle| ActiveTimer::start(handle, self.tracker.interval()));
    }
}

async fn next_tick(timer: &mut Option<ActiveTimer>) -> TimerHandle {
    match timer {
        Some(active) => {
            active.interval.tick().await;
            active.handle
        }
        None => std::future::pending().await,
    }
}
