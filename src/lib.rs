//! # Gamebus Admin Client
//!
//! Async Rust client for the operator side of the Gamebus game control protocol.
//!
//! An admin session registers with the Gamebus server using an operator token,
//! then drives the game through its phases (title, demo, play, pause, game
//! over), opens and closes the selfie booth, and edits the shared game
//! configuration. The server pushes state back; the client mirrors it and
//! reconnects on a fixed interval after losing an authenticated connection.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   `WebSocketConnector`
//! - **Event-driven**: receive typed [`AdminEvent`]s via a channel, or watch
//!   [`SessionSnapshot`]s
//! - **Sans-IO core**: [`session::Session`] and [`router::route`] hold every
//!   protocol rule and can be driven without a runtime
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gamebus_admin_client::{AdminClient, AdminConfig, AdminEvent, Endpoint, GamePhase};
//! use gamebus_admin_client::WebSocketConnector;
//!
//! let config = AdminConfig::new(Endpoint::default());
//! let (client, mut events) = AdminClient::start(WebSocketConnector::new(), config);
//! client.login("operator-token")?;
//!
//! while let Some(event) = events.recv().await {
//!     if let AdminEvent::Authenticated = event {
//!         client.change_state(GamePhase::Play)?;
//!     }
//! }
//! ```

pub mod client;
pub mod configuration;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod game;
pub mod protocol;
pub mod router;
pub mod selfie;
pub mod session;
pub mod storage;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{AdminClient, AdminConfig};
pub use configuration::ConfigEdit;
pub use endpoint::{Endpoint, HostSource};
pub use error::AdminError;
pub use event::AdminEvent;
pub use protocol::{ClientMessage, Configuration, GamePhase, SelfiePhase, ServerMessage};
pub use session::{ConnectionState, SessionSnapshot};
pub use storage::{LocalStorage, MemoryStorage};
pub use transport::{Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
