use crate::actors::TrackerHandle;
use crate::visibility::VisibilitySignal;
use anyhow::{Context, Result};
use interprocess::local_socket::{tokio::prelude::*, GenericFilePath, ListenerOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, instrument};
use validtime_protocol::{read_message, write_message, Request, Response};

pub struct Server {
    socket_path: PathBuf,
    tracker_handle: TrackerHandle,
    visibility: Arc<VisibilitySignal>,
}

impl Server {
    pub fn new(
        instance: &str,
        tracker_handle: TrackerHandle,
        visibility: Arc<VisibilitySignal>,
    ) -> Self {
        Self {
            socket_path: validtime_protocol::socket_path(instance),
            tracker_handle,
            visibility,
        }
    }

    fn cleanup_stale_socket(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .context("impossible de supprimer l'ancien socket")?;
            debug!("removed stale socket file");
        }
        Ok(())
    }

    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) -> Result<()> {
        self.cleanup_stale_socket()?;

        let listener = ListenerOptions::new()
            .name(self.socket_path.as_os_str().to_fs_name::<GenericFilePath>()?)
            .create_tokio()?;

        info!(path = %self.socket_path.display(), "server listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok(stream) => {
                            let tracker_handle = self.tracker_handle.clone();
                            let visibility = Arc::clone(&self.visibility);
                            tokio::spawn(async move {
                                if let Err(error) = handle_connection(stream, tracker_handle, visibility).await {
                                    error!(%error, "connection handler failed");
                                }
                            });
                        }
                        Err(error) => {
                            error!(%error, "failed to accept connection");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.cleanup_socket();
        Ok(())
    }

    fn cleanup_socket(&self) {
        if let Err(error) = std::fs::remove_file(&self.socket_path) {
            debug!(%error, "socket file already removed");
        } else {
            debug!("socket file cleaned up");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.cleanup_socket();
    }
}

async fn handle_connection<S>(
    mut stream: S,
    tracker_handle: TrackerHandle,
    visibility: Arc<VisibilitySignal>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!("new connection accepted");

    let request: Request = read_message(&mut stream)
        .await
        .context("failed to read request")?;
    debug!(?request, "received request");

    let response = handle_request(request, &tracker_handle, &visibility).await;
    debug!(?response, "sending response");

    write_message(&mut stream, &response)
        .await
        .context("failed to send response")?;
    Ok(())
}

async fn handle_request(
    request: Request,
    tracker_handle: &TrackerHandle,
    visibility: &VisibilitySignal,
) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::GetValidTime => match tracker_handle.valid_time().await {
            Some(total_ms) => Response::ValidTime { total_ms },
            None => unavailable(),
        },

        Request::GetStatus => match tracker_handle.status().await {
            Some(status) => Response::Status {
                initialized: status.initialized,
                visibility: status.visibility,
                timer_active: status.timer_active,
                interval_ms: status.interval_ms,
                storage_key: status.storage_key,
                stored_ms: status.stored_ms,
                pending_ms: status.pending_ms,
            },
            None => unavailable(),
        },

        Request::SetVisibility { visibility: next } => {
            if !visibility.publish(next) {
                debug!(%next, "visibility unchanged");
            }
            Response::Ok
        }

        Request::StartBusinessProcess {
            unique_business_key,
        } => match tracker_handle
            .start_business_process(unique_business_key)
            .await
        {
            Some(()) => Response::Ok,
            None => unavailable(),
        },

        Request::EndBusinessProcess {
            unique_business_key,
            auto_clear_storage,
        } => match tracker_handle
            .end_business_process(unique_business_key, auto_clear_storage)
            .await
        {
            Some(duration_ms) => Response::BusinessProcessDuration { duration_ms },
            None => unavailable(),
        },
    }
}

fn unavailable() -> Response {
    Response::Error {
        message: "le suivi du temps n'est plus actif".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::TrackerActor;
    use validtime_adapters::InMemoryKeyValueStore;
    use validtime_core::{InitOptions, ManualClock, ValidTimeTracker, Visibility};

    fn spawn_tracker(signal: &VisibilitySignal, clock: Arc<ManualClock>) -> TrackerHandle {
        let tracker = ValidTimeTracker::new(Arc::new(InMemoryKeyValueStore::new()), clock);
        let (actor, handle) =
            TrackerActor::new(tracker, InitOptions::default(), signal.subscribe());
        tokio::spawn(actor.run());
        handle
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let signal = VisibilitySignal::new(Visibility::Visible);
        let handle = spawn_tracker(&signal, Arc::new(ManualClock::new(0)));

        let response = handle_request(Request::Ping, &handle, &signal).await;

        assert_eq!(response, Response::Pong);
    }

    #[tokio::test]
    async fn set_visibility_publishes_transition() {
        let signal = VisibilitySignal::new(Visibility::Visible);
        let clock = Arc::new(ManualClock::new(0));
        let handle = spawn_tracker(&signal, clock.clone());
        handle.status().await.unwrap();

        clock.set(700);
        let response = handle_request(
            Request::SetVisibility {
                visibility: Visibility::Hidden,
            },
            &handle,
            &signal,
        )
        .await;
        assert_eq!(response, Response::Ok);
        assert_eq!(signal.current(), Visibility::Hidden);

        let mut total = 0;
        for _ in 0..10 {
            tokio::task::yield_now().await;
            if let Response::ValidTime { total_ms } =
                handle_request(Request::GetValidTime, &handle, &signal).await
            {
                total = total_ms;
            }
            if total == 700 {
                break;
            }
        }
        assert_eq!(total, 700);
    }

    #[tokio::test]
    async fn business_process_round_trip() {
        let signal = VisibilitySignal::new(Visibility::Visible);
        let handle = spawn_tracker(&signal, Arc::new(ManualClock::new(0)));

        let started = handle_request(
            Request::StartBusinessProcess {
                unique_business_key: "A".to_string(),
            },
            &handle,
            &signal,
        )
        .await;
        let ended = handle_request(
            Request::EndBusinessProcess {
                unique_business_key: "A".to_string(),
                auto_clear_storage: true,
            },
            &handle,
            &signal,
        )
        .await;

        assert_eq!(started, Response::Ok);
        assert_eq!(ended, Response::BusinessProcessDuration { duration_ms: 0 });
    }

    #[tokio::test]
    async fn connection_answers_one_framed_request() {
        let signal = Arc::new(VisibilitySignal::new(Visibility::Visible));
        let handle = spawn_tracker(&signal, Arc::new(ManualClock::new(0)));
        let (mut client, server_side) = tokio::io::duplex(1024);

        let connection = tokio::spawn(handle_connection(server_side, handle, signal));
        write_message(&mut client, &Request::GetValidTime)
            .await
            .unwrap();
        let response: Response = read_message(&mut client).await.unwrap();

        assert_eq!(response, Response::ValidTime { total_ms: 0 });
        connection.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn status_after_shutdown_is_an_error() {
        let signal = VisibilitySignal::new(Visibility::Visible);
        let handle = spawn_tracker(&signal, Arc::new(ManualClock::new(0)));
        handle.shutdown().await;

        let response = handle_request(Request::GetStatus, &handle, &signal).await;

        assert!(matches!(response, Response::Error { .. }));
    }
}
