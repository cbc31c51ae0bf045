//! Transport implementations for the Gamebus admin protocol.
//!
//! Concrete [`Transport`](crate::Transport) and
//! [`Connector`](crate::Connector) implementations live behind feature gates:
//!
//! | Feature                | Types                                             |
//! |------------------------|---------------------------------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`], [`WebSocketConnector`]    |

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
