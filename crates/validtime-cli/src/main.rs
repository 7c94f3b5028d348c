mod client;
mod commands;
mod daemon_launcher;
#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::{Parser, Subcommand};
use validtime_core::Config;
use validtime_protocol::Visibility;

#[derive(Parser)]
#[command(name = "validtime")]
#[command(about = "validtime CLI - Measure valid operating time", long_about = None)]
struct Cli {
    /// Daemon instance to talk to (defaults to the configured instance)
    #[arg(long, global = true)]
    instance: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tracker state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the accumulated valid time
    Total {
        /// Print raw milliseconds
        #[arg(long)]
        raw: bool,
    },
    /// Mark the tracked instance as visible
    Visible,
    /// Mark the tracked instance as hidden
    Hidden,
    /// Start a business process measurement
    StartProcess {
        /// Unique business key
        key: String,
    },
    /// End a business process and print the valid time it consumed
    EndProcess {
        /// Unique business key
        key: String,
        /// Keep the start snapshot in storage
        #[arg(long)]
        keep: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the daemon answers
    Ping,
    /// Start the daemon if it is not running
    Daemon,
}

fn resolve_instance(flag: Option<String>) -> String {
    flag.unwrap_or_else(|| {
        Config::load()
            .map(|config| config.daemon.instance)
            .unwrap_or_else(|_| "default".to_string())
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let instance = resolve_instance(cli.instance);

    match cli.command {
        Commands::Status { json } => commands::status(&instance, json).await,
        Commands::Total { raw } => commands::total(&instance, raw).await,
        Commands::Visible => commands::visibility(&instance, Visibility::Visible).await,
        Commands::Hidden => commands::visibility(&instance, Visibility::Hidden).await,
        Commands::StartProcess { key } => commands::start_process(&instance, key).await,
        Commands::EndProcess { key, keep, json } => {
            commands::end_process(&instance, key, keep, json).await
        }
        Commands::Ping => commands::ping(&instance).await,
        Commands::Daemon => commands::daemon(&instance).await,
    }
}
