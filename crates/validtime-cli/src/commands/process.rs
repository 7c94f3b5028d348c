use crate::client::{ClientError, DaemonClient};
use anyhow::{bail, Result};
use serde::Serialize;
use validtime_protocol::{Request, Response};

use super::format_signed_duration;

#[derive(Serialize)]
struct ProcessOutput {
    unique_business_key: String,
    duration_ms: i64,
    duration_formatted: String,
    snapshot_cleared: bool,
}

pub async fn start(instance: &str, key: String) -> Result<()> {
    let client = DaemonClient::new(instance);
    let request = Request::StartBusinessProcess {
        unique_business_key: key.clone(),
    };

    match client.send(request).await {
        Ok(Response::Ok) => println!("▶️  Processus '{}' démarré", key),
        Ok(Response::Error { message }) => bail!("{}", message),
        Ok(_) => bail!("Réponse inattendue du daemon"),
        Err(ClientError::DaemonNotRunning) => super::daemon_not_running(),
        Err(ClientError::Timeout) => bail!("Timeout de connexion au daemon"),
        Err(error) => bail!("{}", error),
    }

    Ok(())
}

pub async fn end(instance: &str, key: String, keep: bool, json: bool) -> Result<()> {
    let client = DaemonClient::new(instance);
    let request = Request::EndBusinessProcess {
        unique_business_key: key.clone(),
        auto_clear_storage: !keep,
    };

    match client.send(request).await {
        Ok(Response::BusinessProcessDuration { duration_ms }) => {
            let output = ProcessOutput {
                unique_business_key: key,
                duration_ms,
                duration_formatted: format_signed_duration(duration_ms),
                snapshot_cleared: !keep,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!(
                    "⏹️  Processus '{}' terminé: {}",
                    output.unique_business_key, output.duration_formatted
                );
                if keep {
                    println!("   Instantané conservé");
                }
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
