use crate::client::{ClientError, DaemonClient};
use anyhow::{bail, Result};
use validtime_protocol::{Request, Response};

pub async fn execute(instance: &str) -> Result<()> {
    let client = DaemonClient::new(instance);

    match client.send(Request::Ping).await {
        Ok(Response::Pong) => println!("✓ Le daemon répond ({})", instance),
        Ok(other) => bail!("Réponse inattendue du daemon: {:?}", other),
        Err(ClientError::DaemonNotRunning) => super::daemon_not_running(),
        Err(error) => bail!("{}", error),
    }

    Ok(())
}
