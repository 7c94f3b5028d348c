use crate::client::{ClientError, DaemonClient};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use validtime_protocol::{Request, Response};

const DAEMON_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
const DAEMON_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn ensure_daemon_running(instance: &str) -> Result<()> {
    let socket_path = validtime_protocol::socket_path(instance);
    ensure_daemon_at(instance, &socket_path, find_daemon_binary).await
}

/// Starts the daemon unless one already answers on `socket_path`. A socket
/// file left behind by a daemon that died is removed first.
async fn ensure_daemon_at(
    instance: &str,
    socket_path: &Path,
    daemon_binary: impl FnOnce() -> Result<PathBuf>,
) -> Result<()> {
    let client = DaemonClient::at(socket_path.to_path_buf());

    match client.send(Request::Ping).await {
        Ok(Response::Pong) => return Ok(()),
        Ok(other) => bail!("réponse inattendue du daemon: {:?}", other),
        Err(ClientError::DaemonNotRunning) => remove_stale_socket(socket_path)?,
        Err(error) => bail!("le daemon ne répond pas: {}", error),
    }

    println!("🔄 Démarrage du daemon ({})...", instance);

    spawn_daemon(&daemon_binary()?, instance)?;
    wait_until_alive(&client).await
}

fn remove_stale_socket(socket_path: &Path) -> Result<()> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)
            .with_context(|| format!("impossible de supprimer {}", socket_path.display()))?;
        println!("🧹 Socket orphelin supprimé");
    }
    Ok(())
}

fn spawn_daemon(daemon_path: &Path, instance: &str) -> Result<()> {
    Command::new(daemon_path)
        .env("VALIDTIME_INSTANCE", instance)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("impossible de lancer {}", daemon_path.display()))?;

    Ok(())
}

fn find_daemon_binary() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("VALIDTIME_DAEMON_PATH") {
        return Ok(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe().context("impossible de trouver l'exécutable")?;
    let exe_dir = current_exe
        .parent()
        .context("impossible de trouver le répertoire de l'exécutable")?;

    let daemon_name = if cfg!(windows) {
        "validtime-daemon.exe"
    } else {
        "validtime-daemon"
    };

    let sibling_path = exe_dir.join(daemon_name);
    if sibling_path.exists() {
        return Ok(sibling_path);
    }

    if let Ok(path) = which::which(daemon_name) {
        return Ok(path);
    }

    bail!(
        "validtime-daemon introuvable. Assurez-vous qu'il est installé ou définissez VALIDTIME_DAEMON_PATH"
    );
}

async fn wait_until_alive(client: &DaemonClient) -> Result<()> {
    let start = Instant::now();

    while start.elapsed() < DAEMON_STARTUP_TIMEOUT {
        if client.is_alive().await {
            return Ok(());
        }
        sleep(DAEMON_POLL_INTERVAL).await;
    }

    bail!(
        "timeout: le daemon n'a pas démarré après {} secondes",
        DAEMON_STARTUP_TIMEOUT.as_secs()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cleanup_socket, serve_once, test_socket_path};

    fn missing_binary() -> Result<PathBuf> {
        Ok(PathBuf::from("/nonexistent/validtime-daemon"))
    }

    #[tokio::test]
    async fn live_daemon_is_left_alone() {
        let path = test_socket_path("launcher-live");
        cleanup_socket(&path);

        let server_handle = serve_once(path.clone(), Request::Ping, Response::Pong);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let result = ensure_daemon_at("test", &path, || {
            Err(anyhow::anyhow!("must not spawn"))
        })
        .await;

        assert!(result.is_ok(), "expected Ok, got {:?}", result);
        server_handle.await.unwrap();
        cleanup_socket(&path);
    }

    #[tokio::test]
    async fn stale_socket_file_is_removed_before_spawning() {
        let path = test_socket_path("launcher-stale");
        cleanup_socket(&path);
        std::fs::write(&path, b"").unwrap();

        let result = ensure_daemon_at("test", &path, missing_binary).await;

        let error = result.unwrap_err().to_string();
        assert!(error.contains("impossible de lancer"), "got: {}", error);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_daemon_binary_is_reported() {
        let path = test_socket_path("launcher-missing");
        cleanup_socket(&path);

        let result = ensure_daemon_at("test", &path, missing_binary).await;

        assert!(result.is_err());
    }
}
