//! # Admin Console Example
//!
//! A line-oriented operator console for a real gamebus over WebSocket.
//!
//! ## Running
//!
//! ```sh
//! # Start a gamebus on localhost:9001, then:
//! GAMEBUS_TOKEN=secret cargo run --example admin_console
//!
//! # Derive the server from a production console host instead:
//! GAMEBUS_ADMIN_HOST=mobile-app-admin-demo.example.com cargo run --example admin_console
//! ```
//!
//! ## Commands
//!
//! ```text
//! login <token>            connect and register
//! state <phase>            title | demo | play | pause | game-over
//! selfie <open|closed>     open or close the selfie booth
//! set <field> <value>      opacity | scale | speed | background | goldenSnitch | bp
//! show                     print the session snapshot
//! disconnect               close without reconnecting
//! clear                    clear local storage
//! quit
//! ```

use std::sync::Arc;
use std::time::Duration;

use gamebus_admin_client::endpoint::StaticHost;
use gamebus_admin_client::{
    AdminClient, AdminConfig, AdminEvent, ConfigEdit, Endpoint, GamePhase, MemoryStorage,
    SelfiePhase, WebSocketConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};

fn parse_edit(field: &str, value: &str) -> Result<ConfigEdit, String> {
    let number = || value.parse::<f64>().map_err(|e| format!("{field}: {e}"));
    let flag = || value.parse::<bool>().map_err(|e| format!("{field}: {e}"));
    match field {
        "opacity" => Ok(ConfigEdit::Opacity(number()?)),
        "scale" => Ok(ConfigEdit::Scale(number()?)),
        "speed" => Ok(ConfigEdit::Speed(number()?)),
        "background" => Ok(ConfigEdit::Background(value.to_string())),
        "goldenSnitch" => Ok(ConfigEdit::GoldenSnitch(flag()?)),
        "bp" => Ok(ConfigEdit::Bypass(flag()?)),
        other => Err(format!("unknown field {other:?}")),
    }
}

/// Run one console line. Returns `false` on `quit`.
fn run_command(client: &AdminClient, line: &str) -> bool {
    let mut words = line.split_whitespace();
    let result = match (words.next(), words.next(), words.next()) {
        (Some("login"), Some(token), None) => client.login(token).map_err(|e| e.to_string()),
        (Some("state"), Some(name), None) => match GamePhase::from_name(name) {
            Some(phase) => client.change_state(phase).map_err(|e| e.to_string()),
            None => Err(format!("unknown game state {name:?}")),
        },
        (Some("selfie"), Some(name), None) => match SelfiePhase::from_name(name) {
            Some(phase) => client.change_selfie_state(phase).map_err(|e| e.to_string()),
            None => Err(format!("unknown selfie state {name:?}")),
        },
        (Some("set"), Some(field), Some(value)) => parse_edit(field, value)
            .and_then(|edit| client.edit_configuration(edit).map_err(|e| e.to_string())),
        (Some("show"), None, None) => {
            println!("{:#?}", client.snapshot());
            Ok(())
        }
        (Some("disconnect"), None, None) => client.disconnect().map_err(|e| e.to_string()),
        (Some("clear"), None, None) => client.clear_local_storage().map_err(|e| e.to_string()),
        (Some("quit"), None, None) => return false,
        (None, _, _) => Ok(()),
        _ => Err(format!("unrecognized command {line:?}")),
    };
    if let Err(e) = result {
        tracing::warn!("{e}");
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let endpoint = match std::env::var("GAMEBUS_ADMIN_HOST") {
        Ok(host) => Endpoint::production(StaticHost(host)),
        Err(_) => Endpoint::default(),
    };
    let mut config = AdminConfig::new(endpoint)
        .with_local_storage(Arc::new(MemoryStorage::new()));
    if let Ok(token) = std::env::var("GAMEBUS_TOKEN") {
        config = config.with_prior_session(token);
    }

    let connector = WebSocketConnector::new().with_connect_timeout(Duration::from_secs(5));
    let (mut client, mut event_rx) = AdminClient::start(connector, config);

    // ── Event loop ──────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(AdminEvent::Notice { message }) => println!("** {message}"),
                    Some(AdminEvent::GameStateChanged { phase, is_paused, .. }) => {
                        let label = phase.map_or("-", GamePhase::label);
                        println!("game: {label}{}", if is_paused { " (paused)" } else { "" });
                    }
                    Some(AdminEvent::SelfieStateChanged { state }) => println!("selfie: {state}"),
                    Some(other) => tracing::info!("event: {other:?}"),
                    None => break,
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) if run_command(&client, line.trim()) => {}
                    _ => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
