//! # Loopback Admin Example
//!
//! Drives an [`AdminClient`] against an in-process fake gamebus. The
//! [`Connector`] hands out one channel pair per connect attempt, and a small
//! server task answers `register` with the current state and echoes every
//! command back as a push, the way the real server confirms them.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_admin
//! ```

use async_trait::async_trait;
use gamebus_admin_client::{
    AdminClient, AdminConfig, AdminError, AdminEvent, ConfigEdit, Connector, Endpoint, GamePhase,
    SelfiePhase, Transport,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A channel-backed transport
// ─────────────────────────────────────────────────────────────────────

pub struct LoopbackTransport {
    /// Frames the client sends (the server reads the other end).
    tx: mpsc::UnboundedSender<String>,
    /// Frames the server pushes.
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), AdminError> {
        self.tx
            .send(message)
            .map_err(|e| AdminError::TransportSend(e.to_string()))
    }

    /// Cancel-safe because `mpsc::UnboundedReceiver::recv` is.
    async fn recv(&mut self) -> Option<Result<String, AdminError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), AdminError> {
        self.rx.close();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: A connector that spawns a fake gamebus per connection
// ─────────────────────────────────────────────────────────────────────

struct LoopbackConnector;

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, AdminError> {
        tracing::info!("fake gamebus accepting {url}");
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();
        tokio::spawn(fake_gamebus(server_rx, server_tx));
        Ok(Box::new(LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        }))
    }
}

/// Answer `register` with the current state and echo commands as pushes.
async fn fake_gamebus(
    mut inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
) {
    let mut configuration = json!({ "opacity": 100, "scale": 1, "bp": null });

    while let Some(raw) = inbound.recv().await {
        let Ok(frame) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        tracing::info!("fake gamebus received: {frame}");

        let replies = match frame["type"].as_str() {
            Some("register") => vec![
                json!({ "type": "state", "state": "title" }),
                json!({ "type": "selfie-state", "state": "closed" }),
                json!({ "type": "configuration", "configuration": configuration }),
            ],
            Some("state-change") => vec![json!({ "type": "state", "state": frame["state"] })],
            Some("selfie-state-change") => {
                vec![json!({ "type": "selfie-state", "state": frame["state"] })]
            }
            Some("configuration") => {
                configuration = frame["configuration"].clone();
                vec![json!({ "type": "configuration", "configuration": configuration })]
            }
            _ => Vec::new(),
        };

        for reply in replies {
            if outbound.send(reply.to_string()).is_err() {
                return;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Drive a short operator session
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AdminConfig::new(Endpoint::default());
    let (mut client, mut event_rx) = AdminClient::start(LoopbackConnector, config);
    client.login("demo-operator")?;

    let mut started = false;
    let mut edited = false;
    while let Some(event) = event_rx.recv().await {
        match &event {
            AdminEvent::ConfigurationUpdated { configuration } if !started => {
                tracing::info!("configuration received: {configuration:?}");
                started = true;
                client.change_state(GamePhase::Play)?;
            }
            AdminEvent::ConfigurationUpdated { configuration } if !edited => {
                tracing::info!("game id: {:?}", configuration.game_id());
                edited = true;
                client.edit_configuration(ConfigEdit::Opacity(50.0))?;
                client.change_selfie_state(SelfiePhase::Open)?;
            }
            AdminEvent::SelfieStateChanged { state } if state == "open" => {
                tracing::info!("selfie booth is open");
                break;
            }
            AdminEvent::Disconnected { reason, .. } => {
                tracing::info!("disconnected: {}", reason.as_deref().unwrap_or("clean"));
                break;
            }
            other => tracing::info!("event: {other:?}"),
        }
    }

    let snapshot = client.snapshot();
    tracing::info!(
        "final state: phase={:?} playing={} selfie={:?}",
        snapshot.game_phase,
        snapshot.is_playing,
        snapshot.selfie_state
    );

    client.shutdown().await;
    Ok(())
}
