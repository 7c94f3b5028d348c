use crate::client::{ClientError, DaemonClient};
use anyhow::Result;
use serde::Serialize;
use validtime_protocol::{Request, Response, Visibility};

use super::format_duration;

#[derive(Serialize)]
struct StatusOutput {
    running: bool,
    initialized: bool,
    visibility: Visibility,
    timer_active: bool,
    interval_ms: u64,
    storage_key: String,
    stored_ms: u64,
    pending_ms: u64,
    valid_time_formatted: String,
}

pub async fn execute(instance: &str, json: bool) -> Result<()> {
    let client = DaemonClient::new(instance);

    match client.send(Request::GetStatus).await {
        Ok(Response::Status {
            initialized,
            visibility,
            timer_active,
            interval_ms,
            storage_key,
            stored_ms,
            pending_ms,
        }) => {
            let output = StatusOutput {
                running: true,
                initialized,
                visibility,
                timer_active,
                interval_ms,
                storage_key,
                stored_ms,
                pending_ms,
                valid_time_formatted: format_duration(stored_ms),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_formatted(instance, &output);
            }
        }
        Ok(Response::Error { message }) => {
            if json {
                println!("{}", serde_json::json!({ "error": message }));
            } else {
                eprintln!("Erreur: {}", message);
            }
            std::process::exit(1);
        }
        Ok(_) => {
            if json {
                println!(r#"{{"error": "unexpected response"}}"#);
            } else {
                eprintln!("Erreur: réponse inattendue du daemon");
            }
            std::process::exit(1);
        }
        Err(ClientError::DaemonNotRunning) => {
            if json {
                println!(r#"{{"error": "daemon not running", "running": false}}"#);
            } else {
                println!("⚫ Daemon non démarré ({})", instance);
            }
        }
        Err(ClientError::Timeout) => {
            if json {
                println!(r#"{{"error": "timeout"}}"#);
            } else {
                eprintln!("Erreur: timeout de connexion au daemon");
            }
            std::process::exit(1);
        }
        Err(error) => {
            if json {
                println!("{}", serde_json::json!({ "error": error.to_string() }));
            } else {
                eprintln!("Erreur: {}", error);
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_formatted(instance: &str, output: &StatusOutput) {
    if !output.initialized {
        println!("⚪ Suivi non initialisé ({})", instance);
        return;
    }

    let (icon, label) = if output.timer_active {
        ("🟢", "actif")
    } else {
        ("⏸️ ", "en pause")
    };

    println!("{} Suivi {} ({})", icon, label, instance);
    println!("   Visibilité: {}", output.visibility);
    println!("   Temps valide: {}", output.valid_time_formatted);
    if output.timer_active {
        println!("   En attente: {}", format_duration(output.pending_ms));
    }
    println!("   Intervalle: {} ms", output.interval_ms);
    println!("   Clé de stockage: {}", output.storage_key);
}
