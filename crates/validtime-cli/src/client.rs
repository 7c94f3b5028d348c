use interprocess::local_socket::{
    tokio::{prelude::*, Stream},
    GenericFilePath,
};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use validtime_protocol::{read_message, write_message, FrameError, Request, Response};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("le daemon n'est pas en cours d'exécution")]
    DaemonNotRunning,
    #[error("timeout lors de la communication avec le daemon")]
    Timeout,
    #[error("erreur de connexion: {0}")]
    Connection(String),
    #[error("erreur de sérialisation: {0}")]
    Serialization(String),
    #[error("erreur d'entrée/sortie: {0}")]
    InputOutput(String),
}

pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(instance: &str) -> Self {
        Self::at(validtime_protocol::socket_path(instance))
    }

    pub fn at(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// True only when a daemon answers a ping on the socket.
    pub async fn is_alive(&self) -> bool {
        matches!(self.send(Request::Ping).await, Ok(Response::Pong))
    }

    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let stream = self.connect().await?;
        self.send_request(stream, request).await
    }

    async fn connect(&self) -> Result<Stream, ClientError> {
        let connect_future = Stream::connect(
            self.socket_path
                .as_os_str()
                .to_fs_name::<GenericFilePath>()
                .map_err(|error| ClientError::Connection(error.to_string()))?,
        );

        match timeout(self.timeout, connect_future).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(_)) => Err(ClientError::DaemonNotRunning),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    async fn send_request(
        &self,
        mut stream: Stream,
        request: Request,
    ) -> Result<Response, ClientError> {
        timeout(self.timeout, write_message(&mut stream, &request))
            .await
            .map_err(|_| ClientError::Timeout)??;

        let response = timeout(self.timeout, read_message(&mut stream))
            .await
            .map_err(|_| ClientError::Timeout)??;
        Ok(response)
    }
}

impl From<FrameError> for ClientError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Io(error) => ClientError::InputOutput(error.to_string()),
            other => ClientError::Serialization(other.to_string()),
        }
    }
}
