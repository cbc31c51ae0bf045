//! Transport abstraction for the Gamebus admin protocol.
//!
//! The [`Transport`] trait defines one open, bidirectional text message
//! channel to the server. The admin protocol exchanges JSON objects, one per
//! frame, so every transport implementation handles framing internally.
//!
//! Opening connections is the job of a [`Connector`]. The session manager
//! holds one connector for its whole lifetime and asks it for a fresh
//! transport on every connect attempt, including reconnects.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use gamebus_admin_client::error::AdminError;
//! use gamebus_admin_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), AdminError> {
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, AdminError>> {
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), AdminError> {
//!         todo!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, AdminError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::AdminError;

/// A bidirectional text message transport for the admin protocol.
///
/// Implementors shuttle serialized JSON strings between the client and server
/// and hold no protocol knowledge. Each call to [`send`](Transport::send)
/// transmits one complete frame; each call to [`recv`](Transport::recv)
/// returns one complete frame.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because the
/// session loop polls it inside `tokio::select!`. Channel-based
/// implementations (e.g., wrapping `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::TransportSend`] if the frame could not be sent, or
    /// [`AdminError::TransportClosed`] if the transport was already closed.
    async fn send(&mut self, message: String) -> Result<(), AdminError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection was closed
    async fn recv(&mut self) -> Option<Result<String, AdminError>>;

    /// Close the transport connection.
    ///
    /// Closing through this method never triggers the reconnect policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources even if the handshake fails.
    async fn close(&mut self) -> Result<(), AdminError>;
}

/// Opens new [`Transport`] connections against a resolved endpoint URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establish a connection to `url`.
    ///
    /// A failed attempt is reported to the session as a closed connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, AdminError>;
}
