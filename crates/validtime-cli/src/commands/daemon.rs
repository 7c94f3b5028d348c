use crate::daemon_launcher::ensure_daemon_running;
use anyhow::Result;

pub async fn execute(instance: &str) -> Result<()> {
    ensure_daemon_running(instance).await?;
    println!("🟢 Daemon actif ({})", instance);
    Ok(())
}
