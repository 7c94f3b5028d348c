use crate::client::{ClientError, DaemonClient};
use anyhow::{bail, Result};
use validtime_protocol::{Request, Response};

use super::format_duration;

pub async fn execute(instance: &str, raw: bool) -> Result<()> {
    let client = DaemonClient::new(instance);

    match client.send(Request::GetValidTime).await {
        Ok(Response::ValidTime { total_ms }) => {
            if raw {
                println!("{}", total_ms);
            } else {
                println!("⏱️  Temps valide cumulé: {}", format_duration(total_ms));
            }
        }
        Ok(Response::Error { message }) => bail!("{}", message),
        Ok(_) => bail!("Réponse inattendue du daemon"),
        Err(ClientError::DaemonNotRunning) => super::daemon_not_running(),
        Err(ClientError::Timeout) => bail!("Timeout de connexion au daemon"),
        Err(error) => bail!("{}", error),
    }

    Ok(())
}
