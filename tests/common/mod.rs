#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Gamebus admin client integration tests.
//!
//! Provides a channel-backed [`MockTransport`], the [`MockServer`] end that a
//! test drives, a [`MockConnector`] that hands out one server per accepted
//! connect attempt, and helper functions for server frame JSON.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use gamebus_admin_client::{AdminError, AdminEvent, Connector, Transport};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// How long helpers wait before failing a test. Under a paused clock this is
/// virtual time and only elapses when nothing else can run.
const WAIT: Duration = Duration::from_secs(30);

// ── MockTransport ───────────────────────────────────────────────────

/// The client end of an in-memory connection.
///
/// Frames sent by the client are forwarded to the paired [`MockServer`];
/// frames the server pushes are returned from `recv()`. Dropping the server's
/// push handle ends the stream, which the client sees as a closed connection.
pub struct MockTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), AdminError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(AdminError::TransportClosed);
        }
        self.outbound
            .send(message)
            .map_err(|e| AdminError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, AdminError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), AdminError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockServer ──────────────────────────────────────────────────────

/// The server end of one accepted connection.
pub struct MockServer {
    sent: mpsc::UnboundedReceiver<String>,
    push: Option<mpsc::UnboundedSender<String>>,
    closed: Arc<AtomicBool>,
}

impl MockServer {
    /// The next frame the client sent, parsed as JSON.
    pub async fn next_frame(&mut self) -> Value {
        let raw = tokio::time::timeout(WAIT, self.sent.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client side of the connection is gone");
        serde_json::from_str(&raw).expect("client frames are JSON")
    }

    /// A frame the client already sent, if any.
    pub fn try_next_frame(&mut self) -> Option<Value> {
        self.sent
            .try_recv()
            .ok()
            .map(|raw| serde_json::from_str(&raw).expect("client frames are JSON"))
    }

    /// Push a server frame.
    pub fn push(&self, frame: Value) {
        self.push_raw(&frame.to_string());
    }

    /// Push raw text, which need not be valid JSON.
    pub fn push_raw(&self, raw: &str) {
        self.push
            .as_ref()
            .expect("server already hung up")
            .send(raw.to_string())
            .expect("client side of the connection is gone");
    }

    /// Close the connection from the server side.
    pub fn hang_up(&mut self) {
        self.push = None;
    }

    /// Whether the client closed this connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// A [`Connector`] that records every attempt and either refuses it or
/// hands a fresh [`MockServer`] to the paired [`ConnectorHandle`].
pub struct MockConnector {
    servers: mpsc::UnboundedSender<MockServer>,
    attempts: Arc<StdMutex<Vec<String>>>,
    refuse: Arc<AtomicBool>,
}

/// Test-side view of a [`MockConnector`].
pub struct ConnectorHandle {
    servers: mpsc::UnboundedReceiver<MockServer>,
    attempts: Arc<StdMutex<Vec<String>>>,
    refuse: Arc<AtomicBool>,
}

pub fn mock_connector() -> (MockConnector, ConnectorHandle) {
    let (servers_tx, servers_rx) = mpsc::unbounded_channel();
    let attempts = Arc::new(StdMutex::new(Vec::new()));
    let refuse = Arc::new(AtomicBool::new(false));
    (
        MockConnector {
            servers: servers_tx,
            attempts: Arc::clone(&attempts),
            refuse: Arc::clone(&refuse),
        },
        ConnectorHandle {
            servers: servers_rx,
            attempts,
            refuse,
        },
    )
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, AdminError> {
        self.attempts.lock().unwrap().push(url.to_string());
        if self.refuse.load(Ordering::Relaxed) {
            return Err(AdminError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )));
        }

        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let server = MockServer {
            sent: server_rx,
            push: Some(server_tx),
            closed: Arc::clone(&closed),
        };
        self.servers
            .send(server)
            .map_err(|_| AdminError::TransportClosed)?;

        Ok(Box::new(MockTransport {
            outbound: client_tx,
            inbound: client_rx,
            closed,
        }))
    }
}

impl ConnectorHandle {
    /// The server end of the next accepted connection.
    pub async fn accept(&mut self) -> MockServer {
        tokio::time::timeout(WAIT, self.servers.recv())
            .await
            .expect("timed out waiting for a connect attempt")
            .expect("connector dropped")
    }

    /// Every URL a connect attempt was made against, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Refuse (or accept again) subsequent connect attempts.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }
}

// ── Event helpers ───────────────────────────────────────────────────

/// Skip events until one matches `pred`, and return it.
pub async fn wait_for_event(
    events: &mut mpsc::Receiver<AdminEvent>,
    pred: impl Fn(&AdminEvent) -> bool,
) -> AdminEvent {
    loop {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

// ── JSON helper functions ───────────────────────────────────────────

pub fn state_json(state: &str) -> Value {
    json!({ "type": "state", "state": state })
}

pub fn selfie_state_json(state: &str) -> Value {
    json!({ "type": "selfie-state", "state": state })
}

pub fn configuration_json(configuration: Value) -> Value {
    json!({ "type": "configuration", "configuration": configuration })
}

pub fn auth_failed_json() -> Value {
    json!({ "type": "auth-failed" })
}

/// A configuration as the server typically pushes it.
pub fn sample_configuration() -> Value {
    json!({
        "opacity": 85,
        "scale": 1.5,
        "background": "#000000",
        "speed": 3,
        "goldenSnitch": false,
        "bp": null,
        "theme": "keynote"
    })
}

/// Whether `id` is five hyphen-separated lowercase hex groups (8-4-4-4-12).
pub fn is_game_id(id: &str) -> bool {
    let groups: Vec<&str> = id.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| {
                group.len() == len
                    && group
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
            })
}
