mod actors;
mod server;
mod visibility;

use std::sync::Arc;

use actors::TrackerActor;
use anyhow::Result;
use server::Server;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use validtime_adapters::{InMemoryKeyValueStore, SqliteKeyValueStore};
use validtime_core::{
    Config, InitOptions, KeyValueStore, StorageConfig, SystemClock, ValidTimeTracker, Visibility,
};
use visibility::VisibilitySignal;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("validtime_daemon=debug".parse()?),
        )
        .init();

    info!("validtime daemon starting");

    let config = Config::load().unwrap_or_else(|error| {
        warn!(%error, "failed to load config, using defaults");
        Config::default()
    });
    let instance =
        std::env::var("VALIDTIME_INSTANCE").unwrap_or_else(|_| config.daemon.instance.clone());

    let (shutdown_sender, shutdown_receiver) = broadcast::channel::<()>(1);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("SIGINT received, initiating shutdown");
        shutdown_sender.send(()).ok();
    });

    let store = create_store(&config.storage);
    let tracker = ValidTimeTracker::new(store, Arc::new(SystemClock));
    let visibility = Arc::new(VisibilitySignal::new(Visibility::Visible));

    let (tracker_actor, tracker_handle) = TrackerActor::new(
        tracker,
        InitOptions::from(&config.tracker),
        visibility.subscribe(),
    );
    let tracker_task = tokio::spawn(tracker_actor.run());

    let server = Server::new(&instance, tracker_handle.clone(), visibility);
    let server_result = server.run(shutdown_receiver).await;

    let outcome = tracker_handle.shutdown().await;
    info!(?outcome, "final flush done");
    tracker_task.await.ok();

    info!("validtime daemon stopped");
    server_result
}

fn create_store(storage: &StorageConfig) -> Arc<dyn KeyValueStore> {
    let Some(database_path) = storage.resolve_database_path() else {
        warn!("no data directory, valid time will not survive a restart");
        return Arc::new(InMemoryKeyValueStore::new());
    };

    if let Some(parent) = database_path.parent() {
        if let Err(error) = std::fs::create_dir_all(parent) {
            warn!(%error, "failed to create data directory, valid time will not survive a restart");
            return Arc::new(InMemoryKeyValueStore::new());
        }
    }

    match SqliteKeyValueStore::new(&database_path) {
        Ok(store) => {
            info!(?database_path, "valid time persistence enabled");
            Arc::new(store)
        }
        Err(error) => {
            warn!(%error, "failed to open store, valid time will not survive a restart");
            Arc::new(InMemoryKeyValueStore::new())
        }
    }
}
