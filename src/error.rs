//! Error types for the Gamebus admin client.

use thiserror::Error;

/// Errors that can occur when using the admin client.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection is already closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operator command requires an open connection, but there is none.
    #[error("not connected to server")]
    NotConnected,

    /// A configuration edit arrived before the server pushed any configuration.
    #[error("no configuration has been received from the server")]
    NoConfiguration,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for admin client operations.
pub type Result<T> = std::result::Result<T, AdminError>;
