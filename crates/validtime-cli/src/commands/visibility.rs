use crate::client::{ClientError, DaemonClient};
use anyhow::{bail, Result};
use validtime_protocol::{Request, Response, Visibility};

pub async fn execute(instance: &str, visibility: Visibility) -> Result<()> {
    let client = DaemonClient::new(instance);

    match client.send(Request::SetVisibility { visibility }).await {
        Ok(Response::Ok) => match visibility {
            Visibility::Visible => println!("👁️  Instance visible, suivi actif"),
            Visibility::Hidden => println!("🙈 Instance masquée, suivi en pause"),
        },
        Ok(Response::Error { message }) => bail!("{}", message),
        Ok(_) => bail!("Réponse inattendue du daemon"),
        Err(ClientError::DaemonNotRunning) => super::daemon_not_running(),
        Err(ClientError::Timeout) => bail!("Timeout de connexion au daemon"),
        Err(error) => bail!("{}", error),
    }

    Ok(())
}
