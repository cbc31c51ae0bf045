//! Async admin client for the Gamebus protocol.
//!
//! [`AdminClient`] is a thin handle that talks to a background session loop
//! over an unbounded MPSC channel. The loop owns the [`Session`], opens
//! transports through a [`Connector`], sends `register` on every open, routes
//! inbound frames, and reconnects on a fixed interval while the session is
//! authenticated. Events are emitted on a bounded channel returned from
//! [`AdminClient::start`]; state can be read at any time through
//! [`AdminClient::snapshot`].
//!
//! # Example
//!
//! ```rust,ignore
//! let config = AdminConfig::new(Endpoint::default());
//! let (client, mut events) = AdminClient::start(WebSocketConnector::new(), config);
//!
//! client.login("operator-token")?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         AdminEvent::ConfigurationUpdated { .. } => client.change_state(GamePhase::Play)?,
//!         AdminEvent::AuthFailed => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::configuration::ConfigEdit;
use crate::endpoint::Endpoint;
use crate::error::{AdminError, Result};
use crate::event::AdminEvent;
use crate::protocol::{ClientMessage, GamePhase, SelfiePhase};
use crate::router::{self, Routed};
use crate::session::{ConnectionState, Session, SessionSnapshot};
use crate::storage::LocalStorage;
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default delay between a lost connection and the next connect attempt.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for an [`AdminClient`].
///
/// # Example
///
/// ```
/// use gamebus_admin_client::client::AdminConfig;
/// use gamebus_admin_client::endpoint::Endpoint;
/// use std::time::Duration;
///
/// let config = AdminConfig::new(Endpoint::default())
///     .with_reconnect_interval(Duration::from_secs(2))
///     .with_prior_session("operator-token");
/// assert_eq!(config.reconnect_interval, Duration::from_secs(2));
/// assert_eq!(config.prior_session.as_deref(), Some("operator-token"));
/// ```
#[derive(Clone)]
pub struct AdminConfig {
    /// Where to connect; resolved again on every attempt.
    pub endpoint: Endpoint,
    /// Token of an earlier authenticated session. When set, the client
    /// connects on start and retries a failed first attempt.
    pub prior_session: Option<String>,
    /// Delay before each reconnect attempt. Defaults to **5 seconds**.
    pub reconnect_interval: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped with a warning.
    /// Only the final `Disconnected` sent on shutdown waits for room.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`AdminClient::shutdown`] waits for the loop before aborting
    /// it. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Cache cleared by [`AdminClient::clear_local_storage`].
    pub local_storage: Option<Arc<dyn LocalStorage>>,
}

impl AdminConfig {
    /// Create a configuration for `endpoint` with default values.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            prior_session: None,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            local_storage: None,
        }
    }

    /// Resume an earlier authenticated session on start.
    #[must_use]
    pub fn with_prior_session(mut self, token: impl Into<String>) -> Self {
        self.prior_session = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_local_storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        self.local_storage = Some(storage);
        self
    }
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("endpoint", &self.endpoint)
            .field("prior_session", &self.prior_session.as_ref().map(|_| "<redacted>"))
            .field("reconnect_interval", &self.reconnect_interval)
            .field("event_channel_capacity", &self.event_channel_capacity)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("local_storage", &self.local_storage.is_some())
            .finish()
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// Operator commands queued from the handle to the session loop.
#[derive(Debug)]
enum Command {
    Login { token: String },
    ChangeState(GamePhase),
    ChangeSelfieState(SelfiePhase),
    EditConfiguration(ConfigEdit),
    Disconnect,
}

// ── Client handle ───────────────────────────────────────────────────

/// Async handle to one admin session.
///
/// Operator methods queue a command for the session loop and return
/// immediately; nothing waits on the server.
pub struct AdminClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
    local_storage: Option<Arc<dyn LocalStorage>>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl AdminClient {
    /// Spawn the session loop and return a handle plus event receiver.
    ///
    /// The loop starts idle unless `config.prior_session` is set, in which case
    /// it connects right away.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        connector: impl Connector,
        config: AdminConfig,
    ) -> (Self, mpsc::Receiver<AdminEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        // tokio panics on a zero-capacity channel.
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<AdminEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let session = match config.prior_session {
            Some(token) => Session::resumed(token),
            None => Session::new(String::new()),
        };

        let snapshot = Arc::new(watch::Sender::new(session.snapshot()));

        let session_loop = SessionLoop {
            connector,
            endpoint: config.endpoint,
            reconnect_interval: config.reconnect_interval,
            session,
            transport: None,
            retry_at: None,
            event_tx,
            snapshot: Arc::clone(&snapshot),
        };
        let task = tokio::spawn(session_loop.run(cmd_rx, shutdown_rx));

        let client = Self {
            cmd_tx,
            snapshot,
            local_storage: config.local_storage,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Operator commands ───────────────────────────────────────────

    /// Connect with `token`. Ignored while a connection is open or opening.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotConnected`] if the client has shut down.
    pub fn login(&self, token: impl Into<String>) -> Result<()> {
        self.send(Command::Login {
            token: token.into(),
        })
    }

    /// Request a game phase.
    ///
    /// Pause acts as a toggle, and a play request stamps a new game id into
    /// the configuration. A `state-change` frame goes out followed by the full
    /// configuration snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotConnected`] unless the connection is open.
    pub fn change_state(&self, phase: GamePhase) -> Result<()> {
        self.require_open()?;
        self.send(Command::ChangeState(phase))
    }

    /// Request a selfie booth phase. The server confirms it with a push.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotConnected`] unless the connection is open.
    pub fn change_selfie_state(&self, phase: SelfiePhase) -> Result<()> {
        self.require_open()?;
        self.send(Command::ChangeSelfieState(phase))
    }

    /// Edit one configuration field and republish the full snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotConnected`] unless the connection is open, or
    /// [`AdminError::NoConfiguration`] before the server pushed any
    /// configuration.
    pub fn edit_configuration(&self, edit: ConfigEdit) -> Result<()> {
        self.require_open()?;
        if self.snapshot.borrow().configuration.is_none() {
            return Err(AdminError::NoConfiguration);
        }
        self.send(Command::EditConfiguration(edit))
    }

    /// Close the connection without scheduling a reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotConnected`] if the client has shut down.
    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    /// Clear the configured local storage. Session state is not touched.
    ///
    /// # Errors
    ///
    /// Returns whatever error the storage reports.
    pub fn clear_local_storage(&self) -> Result<()> {
        match &self.local_storage {
            Some(storage) => {
                storage.clear()?;
                info!("local storage cleared");
            }
            None => debug!("no local storage configured, nothing to clear"),
        }
        Ok(())
    }

    /// Shut down the session loop, closing any open connection.
    pub async fn shutdown(&mut self) {
        debug!("AdminClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.snapshot.send_modify(|snapshot| {
            snapshot.connection = ConnectionState::Closed;
            snapshot.authenticated = false;
            snapshot.reconnecting = false;
        });
    }

    // ── State accessors ─────────────────────────────────────────────

    /// A copy of the current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// A receiver that is notified whenever session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.borrow().connection == ConnectionState::Open
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.borrow().authenticated
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn require_open(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(AdminError::NotConnected)
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.cmd_tx
            .send(command)
            .map_err(|_| AdminError::NotConnected)
    }
}

impl fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminClient")
            .field("connected", &self.is_connected())
            .field("authenticated", &self.is_authenticated())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for AdminClient {
    fn drop(&mut self) {
        // No executor is available to drive a graceful close from `Drop`.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

struct SessionLoop<C> {
    connector: C,
    endpoint: Endpoint,
    reconnect_interval: Duration,
    session: Session,
    transport: Option<Box<dyn Transport>>,
    /// When the next reconnect attempt fires. At most one is ever armed, and
    /// connect attempts run inline, so two attempts can never overlap.
    retry_at: Option<Instant>,
    event_tx: mpsc::Sender<AdminEvent>,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
}

impl<C: Connector> SessionLoop<C> {
    /// Multiplex operator commands, shutdown, inbound frames, and the
    /// reconnect timer until shutdown or until the handle is dropped.
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        debug!("session loop started");

        if self.session.is_authenticated() {
            debug!("resuming prior session");
            self.connect().await;
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            debug!("command channel closed, shutting down session loop");
                            break;
                        }
                    }
                }

                _ = &mut shutdown_rx => {
                    debug!("shutdown signal received");
                    break;
                }

                incoming = next_frame(&mut self.transport) => {
                    self.handle_incoming(incoming).await;
                }

                () = retry_deadline(self.retry_at) => {
                    self.retry_at = None;
                    debug!("reconnect timer fired");
                    self.connect().await;
                }
            }
        }

        let was_active = self.transport.is_some() || self.retry_at.is_some();
        self.close_transport().await;
        self.retry_at = None;
        self.session.disconnected();
        self.publish();
        if was_active {
            emit_final(
                &self.event_tx,
                AdminEvent::Disconnected {
                    reason: Some("client shut down".into()),
                    will_retry: false,
                },
            )
            .await;
        }

        debug!("session loop exited");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Login { token } => self.login(token).await,
            Command::Disconnect => self.disconnect().await,
            Command::ChangeState(phase) => match self.session.request_phase(phase) {
                Ok(frames) => {
                    if self.send_all(frames).await {
                        let game = self.session.game();
                        let event = AdminEvent::GameStateChanged {
                            phase: game.current(),
                            is_paused: game.is_paused(),
                            is_playing: game.is_playing(),
                        };
                        self.publish();
                        emit(&self.event_tx, event);
                    }
                }
                Err(e) => warn!(phase = %phase, "dropping state change: {e}"),
            },
            Command::ChangeSelfieState(phase) => match self.session.request_selfie(phase) {
                Ok(frame) => {
                    self.send_all(vec![frame]).await;
                }
                Err(e) => warn!(phase = %phase, "dropping selfie state change: {e}"),
            },
            Command::EditConfiguration(edit) => {
                let field = edit.field();
                match self.session.edit_configuration(edit) {
                    Ok(frame) => {
                        if self.send_all(vec![frame]).await {
                            self.publish();
                        }
                    }
                    Err(e) => warn!(field, "dropping configuration edit: {e}"),
                }
            }
        }
    }

    async fn login(&mut self, token: String) {
        match self.session.connection() {
            ConnectionState::Connecting | ConnectionState::Open => {
                debug!("login ignored: connection already active");
            }
            ConnectionState::Idle | ConnectionState::Closed => {
                self.session.set_token(token);
                self.retry_at = None;
                self.connect().await;
            }
        }
    }

    async fn disconnect(&mut self) {
        if self.transport.is_none() && self.retry_at.is_none() {
            debug!("disconnect ignored: nothing to close");
            return;
        }
        self.close_transport().await;
        self.retry_at = None;
        self.session.disconnected();
        self.publish();
        emit(&self.event_tx, AdminEvent::Disconnected {
            reason: Some("disconnected by operator".into()),
            will_retry: false,
        });
    }

    /// One connect attempt against a freshly resolved endpoint.
    async fn connect(&mut self) {
        let url = self.endpoint.resolve();
        self.session.begin_connect();
        self.publish();
        info!(url = %url, "connecting to gamebus");
        emit(&self.event_tx, AdminEvent::Connecting { url: url.clone() });

        match self.connector.connect(&url).await {
            Ok(transport) => {
                self.transport = Some(transport);
                let register = self.session.opened();
                self.publish();
                if self.send_all(vec![register]).await {
                    info!(url = %url, "connected, register sent");
                    emit(&self.event_tx, AdminEvent::Connected);
                }
            }
            Err(e) => {
                warn!(url = %url, "connect attempt failed: {e}");
                self.on_closed(Some(format!("connect failed: {e}")));
            }
        }
    }

    async fn handle_incoming(&mut self, incoming: Option<Result<String>>) {
        match incoming {
            Some(Ok(text)) => match router::route(&mut self.session, &text) {
                Routed::Dropped => {}
                Routed::AuthFailed => {
                    warn!("gamebus rejected the session token");
                    self.close_transport().await;
                    self.retry_at = None;
                    self.publish();
                    emit(&self.event_tx, AdminEvent::AuthFailed);
                    emit(&self.event_tx, AdminEvent::Disconnected {
                        reason: Some("authentication failed".into()),
                        will_retry: false,
                    });
                }
                Routed::Applied(events) => {
                    self.publish();
                    for event in events {
                        emit(&self.event_tx, event);
                    }
                }
            },
            Some(Err(e)) => {
                error!("transport receive error: {e}");
                self.on_closed(Some(format!("transport receive error: {e}")));
            }
            None => {
                debug!("connection closed by gamebus");
                self.on_closed(None);
            }
        }
    }

    /// Encode and send `frames` in order. A failed send counts as a lost
    /// connection; returns whether every frame went out.
    async fn send_all(&mut self, frames: Vec<ClientMessage>) -> bool {
        for frame in frames {
            let Some(transport) = self.transport.as_mut() else {
                warn!(kind = frame.kind(), "no open connection, dropping frame");
                return false;
            };
            let json = match router::encode(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!(kind = frame.kind(), "failed to serialize frame: {e}");
                    continue;
                }
            };
            debug!(kind = frame.kind(), "sending frame");
            if let Err(e) = transport.send(json).await {
                error!("transport send error: {e}");
                self.on_closed(Some(format!("transport send error: {e}")));
                return false;
            }
        }
        true
    }

    /// Handle a lost connection or failed attempt, arming the reconnect
    /// timer when the session is eligible.
    fn on_closed(&mut self, reason: Option<String>) {
        self.transport = None;
        let will_retry = self.session.closed();
        self.retry_at = if will_retry {
            info!(interval = ?self.reconnect_interval, "scheduling reconnect");
            Some(Instant::now() + self.reconnect_interval)
        } else {
            debug!("session not authenticated, no reconnect scheduled");
            None
        };
        self.publish();
        emit(&self.event_tx, AdminEvent::Disconnected { reason, will_retry });
    }

    async fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("error while closing transport: {e}");
            }
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.session.snapshot());
    }
}

/// Emit an event without blocking the loop; dropped with a warning when the
/// consumer falls behind.
fn emit(event_tx: &mpsc::Sender<AdminEvent>, event: AdminEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit the last event the loop will ever send, waiting for room so it is
/// not lost when the consumer is behind.
async fn emit_final(event_tx: &mpsc::Sender<AdminEvent>, event: AdminEvent) {
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

/// The next frame from the current transport, or never if there is none.
async fn next_frame(transport: &mut Option<Box<dyn Transport>>) -> Option<Result<String>> {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

/// Resolves at the armed reconnect deadline, or never if none is armed.
async fn retry_deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A connector whose every attempt is refused.
    struct RefusingConnector {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for RefusingConnector {
        async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AdminError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )))
        }
    }

    fn refusing() -> (RefusingConnector, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        (
            RefusingConnector {
                attempts: Arc::clone(&attempts),
            },
            attempts,
        )
    }

    #[test]
    fn config_defaults() {
        let config = AdminConfig::new(Endpoint::default());
        assert_eq!(config.reconnect_interval, Duration::from_millis(5000));
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert!(config.prior_session.is_none());
        assert!(config.local_storage.is_none());
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = AdminConfig::new(Endpoint::default()).with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn config_debug_redacts_token() {
        let config = AdminConfig::new(Endpoint::default()).with_prior_session("hunter2");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn starts_idle_without_prior_session() {
        let (connector, attempts) = refusing();
        let (mut client, _events) =
            AdminClient::start(connector, AdminConfig::new(Endpoint::default()));

        tokio::task::yield_now().await;
        assert_eq!(client.snapshot().connection, ConnectionState::Idle);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn commands_are_rejected_while_not_connected() {
        let (connector, _attempts) = refusing();
        let (mut client, _events) =
            AdminClient::start(connector, AdminConfig::new(Endpoint::default()));

        assert!(matches!(
            client.change_state(GamePhase::Play),
            Err(AdminError::NotConnected)
        ));
        assert!(matches!(
            client.change_selfie_state(SelfiePhase::Open),
            Err(AdminError::NotConnected)
        ));
        assert!(matches!(
            client.edit_configuration(ConfigEdit::Bypass(true)),
            Err(AdminError::NotConnected)
        ));

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_login_is_not_retried() {
        let (connector, attempts) = refusing();
        let (mut client, mut events) =
            AdminClient::start(connector, AdminConfig::new(Endpoint::default()));

        client.login("tok").unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            AdminEvent::Connecting { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            AdminEvent::Disconnected {
                will_retry: false,
                ..
            }
        ));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn prior_session_retries_on_fixed_interval() {
        let (connector, attempts) = refusing();
        let config = AdminConfig::new(Endpoint::default()).with_prior_session("tok");
        let (mut client, mut events) = AdminClient::start(connector, config);

        let started = Instant::now();
        let mut connect_times = Vec::new();
        while connect_times.len() < 3 {
            if let AdminEvent::Connecting { .. } = events.recv().await.unwrap() {
                connect_times.push(started.elapsed());
            }
        }

        assert_eq!(connect_times[0], Duration::ZERO);
        assert_eq!(connect_times[1], Duration::from_secs(5));
        assert_eq!(connect_times[2], Duration::from_secs(10));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(client.snapshot().reconnecting);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn retries_continue_when_events_are_not_read() {
        let (connector, attempts) = refusing();
        let config = AdminConfig::new(Endpoint::default())
            .with_prior_session("tok")
            .with_event_channel_capacity(4);
        let (mut client, mut events) = AdminClient::start(connector, config);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(
            attempts.load(Ordering::SeqCst) >= 20,
            "only {} attempts in 120s",
            attempts.load(Ordering::SeqCst)
        );
        assert!(client.snapshot().reconnecting);

        // The oldest events were kept and the overflow dropped.
        let mut kept = Vec::new();
        while let Ok(event) = events.try_recv() {
            kept.push(event);
        }
        assert_eq!(kept.len(), 4);
        assert!(matches!(kept[0], AdminEvent::Connecting { .. }));

        drop(events);
        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let (connector, attempts) = refusing();
        let config = AdminConfig::new(Endpoint::default()).with_prior_session("tok");
        let (mut client, mut events) = AdminClient::start(connector, config);

        loop {
            if let AdminEvent::Disconnected { will_retry, .. } = events.recv().await.unwrap() {
                assert!(will_retry);
                break;
            }
        }
        client.disconnect().unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            AdminEvent::Disconnected {
                reason: Some("disconnected by operator".into()),
                will_retry: false,
            }
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(!client.snapshot().reconnecting);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn clear_local_storage_leaves_session_alone() {
        let (connector, _attempts) = refusing();
        let storage = Arc::new(MemoryStorage::new());
        storage.set("token", "tok").unwrap();
        let config = AdminConfig::new(Endpoint::default())
            .with_local_storage(Arc::clone(&storage) as Arc<dyn LocalStorage>);
        let (mut client, _events) = AdminClient::start(connector, config);

        let before = client.snapshot();
        client.clear_local_storage().unwrap();
        assert!(storage.is_empty().unwrap());
        assert_eq!(client.snapshot(), before);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn commands_fail_after_shutdown() {
        let (connector, _attempts) = refusing();
        let (mut client, _events) =
            AdminClient::start(connector, AdminConfig::new(Endpoint::default()));
        client.shutdown().await;

        assert!(matches!(client.login("tok"), Err(AdminError::NotConnected)));
        assert!(!client.is_connected());
    }
}
