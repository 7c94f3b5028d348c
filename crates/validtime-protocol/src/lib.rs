//! validtime protocol definitions for CLI-daemon communication
//!
//! This crate defines the IPC protocol between the validtime CLI and daemon.
//! Messages are bincode-encoded and framed with a little-endian `u32` length
//! prefix.

use std::path::PathBuf;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub use validtime_core::Visibility;

/// Requests sent from CLI to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Ping the daemon to check if it's alive
    Ping,
    /// Read the accumulated valid time
    GetValidTime,
    /// Get the tracker state
    GetStatus,
    /// Report a visibility change of the tracked instance
    SetVisibility { visibility: Visibility },
    /// Snapshot the accumulator under a business key
    StartBusinessProcess { unique_business_key: String },
    /// Measure the valid time consumed since the matching start
    EndBusinessProcess {
        unique_business_key: String,
        /// Remove the snapshot after reading it
        auto_clear_storage: bool,
    },
}

/// Responses sent from daemon to CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// Accumulated valid time in milliseconds
    ValidTime { total_ms: u64 },
    /// Valid time consumed by a business process, in milliseconds
    BusinessProcessDuration { duration_ms: i64 },
    /// Tracker state
    Status {
        initialized: bool,
        visibility: Visibility,
        timer_active: bool,
        interval_ms: u64,
        storage_key: String,
        /// Time already committed to storage
        stored_ms: u64,
        /// Time accrued in the current slice, not yet committed
        pending_ms: u64,
    },
    /// Generic success acknowledgment
    Ok,
    /// Error response with message
    Error { message: String },
    /// Pong response to ping
    Pong,
}

/// Largest frame body accepted by [`read_message`].
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("erreur d'entrée/sortie: {0}")]
    Io(#[from] std::io::Error),
    #[error("erreur de sérialisation: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("message trop volumineux: {length} octets")]
    TooLarge { length: usize },
}

/// Writes one length-prefixed message and flushes the stream.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = bincode::serialize(message)?;
    let length = u32::try_from(body.len())
        .ok()
        .filter(|length| *length as usize <= MAX_FRAME_LENGTH)
        .ok_or(FrameError::TooLarge { length: body.len() })?;

    writer.write_all(&length.to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_message<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut length_buffer = [0u8; 4];
    reader.read_exact(&mut length_buffer).await?;
    let length = u32::from_le_bytes(length_buffer) as usize;
    if length > MAX_FRAME_LENGTH {
        return Err(FrameError::TooLarge { length });
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(bincode::deserialize(&body)?)
}

/// Local socket of the daemon tracking `instance`.
#[cfg(unix)]
pub fn socket_path(instance: &str) -> PathBuf {
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/run/user/{}/validtime-{}.sock", uid, instance))
}

#[cfg(windows)]
pub fn socket_path(instance: &str) -> PathBuf {
    let local_app_data = std::env::var("LOCALAPPDATA").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(format!(
        r"{}\validtime\validtime-{}.sock",
        local_app_data, instance
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_visibility_serialization() {
        for visibility in [Visibility::Visible, Visibility::Hidden] {
            let request = Request::SetVisibility { visibility };

            let bytes = bincode::serialize(&request).unwrap();
            let decoded: Request = bincode::deserialize(&bytes).unwrap();

            assert_eq!(request, decoded);
        }
    }

    #[test]
    fn end_business_process_keeps_flags() {
        let request = Request::EndBusinessProcess {
            unique_business_key: "order-42".to_string(),
            auto_clear_storage: false,
        };

        let bytes = bincode::serialize(&request).unwrap();
        let decoded: Request = bincode::deserialize(&bytes).unwrap();

        assert_eq!(request, decoded);
    }

    #[test]
    fn negative_duration_survives_encoding() {
        let response = Response::BusinessProcessDuration { duration_ms: -300 };

        let bytes = bincode::serialize(&response).unwrap();
        let decoded: Response = bincode::deserialize(&bytes).unwrap();

        assert_eq!(response, decoded);
    }

    #[test]
    fn status_serialization() {
        let response = Response::Status {
            initialized: true,
            visibility: Visibility::Hidden,
            timer_active: false,
            interval_ms: 1000,
            storage_key: "_valid_operating_time".to_string(),
            stored_ms: 1500,
            pending_ms: 0,
        };

        let bytes = bincode::serialize(&response).unwrap();
        let decoded: Response = bincode::deserialize(&bytes).unwrap();

        assert_eq!(response, decoded);
    }

    #[tokio::test]
    async fn framed_messages_cross_a_stream_in_order() {
        let (mut client, mut server) = tokio::io::duplex(256);

        write_message(&mut client, &Request::Ping).await.unwrap();
        write_message(
            &mut client,
            &Request::StartBusinessProcess {
                unique_business_key: "A".to_string(),
            },
        )
        .await
        .unwrap();

        let first: Request = read_message(&mut server).await.unwrap();
        let second: Request = read_message(&mut server).await.unwrap();

        assert_eq!(first, Request::Ping);
        assert_eq!(
            second,
            Request::StartBusinessProcess {
                unique_business_key: "A".to_string()
            }
        );
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let length = (MAX_FRAME_LENGTH as u32 + 1).to_le_bytes();
        client.write_all(&length).await.unwrap();

        let result: Result<Request, _> = read_message(&mut server).await;

        assert!(matches!(result, Err(FrameError::TooLarge { .. })));
    }

    #[tokio::test]
    async fn truncated_frame_is_an_io_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&8u32.to_le_bytes()).await.unwrap();
        client.write_all(&[1, 2]).await.unwrap();
        drop(client);

        let result: Result<Response, _> = read_message(&mut server).await;

        assert!(matches!(result, Err(FrameError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn socket_path_includes_instance() {
        let path = socket_path("tab-2");

        assert!(path.to_string_lossy().ends_with("validtime-tab-2.sock"));
    }
}
