//! WebSocket transport built on `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] carries admin frames as WebSocket text messages.
//! [`WebSocketConnector`] is the [`Connector`] the session manager uses to
//! open one on every connect attempt. Both `ws://` and `wss://` URLs work;
//! TLS is handled by [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Feature gate
//!
//! Only available with the `transport-websocket` feature (enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), gamebus_admin_client::AdminError> {
//! use gamebus_admin_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:9001/game/admin").await?;
//! transport
//!     .send(r#"{"type":"register","token":"secret"}"#.to_string())
//!     .await?;
//!
//! if let Some(Ok(frame)) = transport.recv().await {
//!     println!("server pushed: {frame}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::AdminError;
use crate::transport::{Connector, Transport};

/// The underlying WebSocket stream type.
///
/// Public so callers can wrap a stream they connected themselves with
/// [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: dropping its future before it
/// completes does not lose any frame.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Io`] if the URL is invalid or the connection
    /// cannot be established. I/O error kinds are preserved; every other
    /// failure maps to [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, AdminError> {
        tracing::debug!(url = %url, "connecting to gamebus");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            AdminError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "gamebus connection established");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    /// Like [`connect`](Self::connect), but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Timeout`] if the deadline elapses, or any error
    /// [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, AdminError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| AdminError::Timeout)?
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), AdminError> {
        if self.closed {
            return Err(AdminError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| AdminError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, AdminError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return Some(Err(AdminError::TransportReceive(e.to_string()))),
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                // tungstenite queues the pong reply itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::warn!("gamebus sent a binary frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), AdminError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| AdminError::TransportSend(e.to_string()))
    }
}

/// Opens a [`WebSocketTransport`] per connect attempt.
///
/// Without a timeout the attempt is bounded only by the operating system's
/// own TCP connect timeout.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    /// Create a connector with no connect timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort connect attempts that take longer than `timeout`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, AdminError> {
        let transport = match self.connect_timeout {
            Some(timeout) => WebSocketTransport::connect_with_timeout(url, timeout).await?,
            None => WebSocketTransport::connect(url).await?,
        };
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn websocket_types_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
        assert_send::<WebSocketConnector>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Io(_)));
    }

    #[tokio::test]
    async fn connector_reports_unreachable_host_as_io_error() {
        let result = WebSocketConnector::new().connect("ws://127.0.0.1:1").await;
        assert!(matches!(result, Err(AdminError::Io(_))));
    }

    #[tokio::test]
    async fn connector_times_out_on_unroutable_address() {
        let connector = WebSocketConnector::new().with_connect_timeout(Duration::from_millis(50));
        let result = connector.connect("ws://192.0.2.1:1").await;
        assert!(matches!(result, Err(AdminError::Timeout)));
    }

    /// Start a local gamebus stand-in that runs `handler` on the accepted
    /// connection and returns its URL.
    async fn start_mock_gamebus<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}/game/admin")
    }

    #[tokio::test]
    async fn register_then_receive_state_push() {
        let url = start_mock_gamebus(|mut ws| async move {
            let Some(Ok(Message::Text(register))) = ws.next().await else {
                panic!("expected register frame");
            };
            assert!(register.as_str().contains("\"register\""));
            ws.send(Message::Text(r#"{"type":"state","state":"demo"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector::new().connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"register","token":"t"}"#.to_string())
            .await
            .unwrap();

        let frame = transport.recv().await.unwrap().unwrap();
        assert_eq!(frame, r#"{"type":"state","state":"demo"}"#);
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_ping_and_binary_frames() {
        let url = start_mock_gamebus(|mut ws| async move {
            ws.send(Message::Ping(vec![1].into())).await.unwrap();
            ws.send(Message::Binary(vec![0xBE, 0xEF].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"auth-failed"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let frame = transport.recv().await.unwrap().unwrap();
        assert_eq!(frame, r#"{"type":"auth-failed"}"#);
    }

    #[tokio::test]
    async fn send_after_close_is_rejected_and_close_is_idempotent() {
        let url =
            start_mock_gamebus(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, AdminError::TransportClosed));
    }
}
