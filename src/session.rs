//! Session state, independent of any I/O.
//!
//! [`Session`] owns everything one admin session knows: the operator token,
//! the authenticated flag, the connection state, and the game, selfie, and
//! configuration sub-machines. The session loop in [`client`](crate::client)
//! feeds it lifecycle events and operator commands and sends whatever
//! frames it hands back. Presentation code only ever sees the read-only
//! [`SessionSnapshot`].

use crate::configuration::{ConfigEdit, ConfigurationStore};
use crate::error::{AdminError, Result};
use crate::game::{new_game_id, GameStateMachine};
use crate::protocol::{ClientMessage, Configuration, GamePhase, SelfiePhase};
use crate::selfie::SelfieTracker;

/// Connection lifecycle as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Nothing attempted yet.
    #[default]
    Idle,
    /// A connect attempt is in flight.
    Connecting,
    /// Connected; `register` has been sent.
    Open,
    /// Disconnected, rejected, or a connect attempt failed.
    Closed,
}

/// A read-only copy of session state for presentation code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    pub authenticated: bool,
    /// Set while the session is in a reconnect cycle.
    pub reconnecting: bool,
    pub game_phase: Option<GamePhase>,
    pub is_paused: bool,
    pub is_playing: bool,
    pub selfie_state: Option<String>,
    pub configuration: Option<Configuration>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    token: String,
    authenticated: bool,
    // Survives the authenticated flag being cleared on close, so a reconnect
    // cycle keeps going until the server talks again or rejects the token.
    reconnecting: bool,
    connection: ConnectionState,
    game: GameStateMachine,
    selfie: SelfieTracker,
    configuration: ConfigurationStore,
}

impl Session {
    /// A fresh, unauthenticated session.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// A session resumed from an earlier authenticated run. A failed first
    /// connect attempt is retried.
    pub fn resumed(token: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            ..Self::new(token)
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }

    pub fn game(&self) -> &GameStateMachine {
        &self.game
    }

    pub fn selfie(&self) -> &SelfieTracker {
        &self.selfie
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.snapshot()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// A connect attempt is starting.
    pub fn begin_connect(&mut self) {
        self.connection = ConnectionState::Connecting;
    }

    /// The connection opened. Returns the `register` frame to send.
    pub fn opened(&mut self) -> ClientMessage {
        self.connection = ConnectionState::Open;
        ClientMessage::Register {
            token: self.token.clone(),
        }
    }

    /// The connection closed or a connect attempt failed.
    ///
    /// Returns whether a reconnect should be scheduled: only if the session was
    /// authenticated or is already reconnecting.
    pub fn closed(&mut self) -> bool {
        let retry = self.authenticated || self.reconnecting;
        self.authenticated = false;
        self.reconnecting = retry;
        self.connection = ConnectionState::Closed;
        retry
    }

    /// The server rejected the token. Terminal until the next login.
    pub fn auth_failed(&mut self) {
        self.authenticated = false;
        self.reconnecting = false;
        self.connection = ConnectionState::Closed;
    }

    /// The operator closed the connection. No reconnect follows.
    pub fn disconnected(&mut self) {
        self.authenticated = false;
        self.reconnecting = false;
        self.connection = ConnectionState::Closed;
    }

    /// Any non-failure frame from the server confirms the session.
    ///
    /// Returns `true` if this flipped the session to authenticated.
    pub fn confirm(&mut self) -> bool {
        let flipped = !self.authenticated;
        self.authenticated = true;
        self.reconnecting = false;
        flipped
    }

    // ── Server pushes ───────────────────────────────────────────────

    pub fn apply_state_push(&mut self, name: &str) -> Option<GamePhase> {
        self.game.apply_push(name)
    }

    pub fn apply_selfie_push(&mut self, state: impl Into<String>) {
        self.selfie.apply_push(state);
    }

    pub fn apply_configuration_push(&mut self, configuration: Configuration) {
        self.configuration.replace(configuration);
    }

    // ── Operator commands ───────────────────────────────────────────

    /// Resolve and apply a phase request.
    ///
    /// Returns the `state-change` frame followed by one `configuration` frame.
    /// The configuration frame is omitted while no snapshot exists.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotConnected`] unless the connection is open; the
    /// session is left untouched in that case.
    pub fn request_phase(&mut self, requested: GamePhase) -> Result<Vec<ClientMessage>> {
        self.require_open()?;

        let change = self.game.request(requested);
        let mut frames = vec![ClientMessage::StateChange {
            state: change.outgoing,
            token: self.token.clone(),
        }];

        if change.starts_new_game {
            if let Err(e) = self.configuration.set_game_id(new_game_id()) {
                tracing::debug!("no game id stamped: {e}");
            }
        }

        match self.configuration.snapshot() {
            Some(snapshot) => frames.push(self.configuration_frame(snapshot.clone())),
            None => tracing::debug!("no configuration to republish after state change"),
        }

        Ok(frames)
    }

    /// Build the `selfie-state-change` frame for a booth request.
    ///
    /// The booth phase is not applied locally; the server confirms it with a
    /// `selfie-state` push.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotConnected`] unless the connection is open.
    pub fn request_selfie(&self, requested: SelfiePhase) -> Result<ClientMessage> {
        self.require_open()?;
        Ok(ClientMessage::SelfieStateChange {
            state: requested,
            token: self.token.clone(),
        })
    }

    /// Apply one configuration edit and return the republish frame.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotConnected`] unless the connection is open, or
    /// [`AdminError::NoConfiguration`] before the first configuration push.
    pub fn edit_configuration(&mut self, edit: ConfigEdit) -> Result<ClientMessage> {
        self.require_open()?;
        let snapshot = self.configuration.edit(edit)?.clone();
        Ok(self.configuration_frame(snapshot))
    }

    /// Copy the current state for presentation code.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection: self.connection,
            authenticated: self.authenticated,
            reconnecting: self.reconnecting,
            game_phase: self.game.current(),
            is_paused: self.game.is_paused(),
            is_playing: self.game.is_playing(),
            selfie_state: self.selfie.current().map(str::to_string),
            configuration: self.configuration.snapshot().cloned(),
        }
    }

    fn configuration_frame(&self, configuration: Configuration) -> ClientMessage {
        ClientMessage::Configuration {
            configuration,
            token: self.token.clone(),
        }
    }

    fn require_open(&self) -> Result<()> {
        if self.connection == ConnectionState::Open {
            Ok(())
        } else {
            Err(AdminError::NotConnected)
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn open_session() -> Session {
        let mut session = Session::new("tok");
        session.begin_connect();
        session.opened();
        session
    }

    fn open_with_configuration() -> Session {
        let mut session = open_session();
        session.apply_configuration_push(
            serde_json::from_value(serde_json::json!({ "opacity": 85 })).unwrap(),
        );
        session
    }

    fn configuration_frames(frames: &[ClientMessage]) -> usize {
        frames
            .iter()
            .filter(|f| matches!(f, ClientMessage::Configuration { .. }))
            .count()
    }

    #[test]
    fn opened_produces_register_with_token() {
        let mut session = Session::new("secret");
        session.begin_connect();
        assert_eq!(session.connection(), ConnectionState::Connecting);
        assert_eq!(
            session.opened(),
            ClientMessage::Register {
                token: "secret".into()
            }
        );
        assert_eq!(session.connection(), ConnectionState::Open);
    }

    #[test]
    fn close_while_unauthenticated_does_not_retry() {
        let mut session = open_session();
        assert!(!session.closed());
        assert_eq!(session.connection(), ConnectionState::Closed);
    }

    #[test]
    fn close_while_authenticated_retries_until_confirmed() {
        let mut session = open_session();
        session.confirm();
        assert!(session.closed());
        assert!(!session.is_authenticated());

        // A failed reconnect attempt keeps the cycle going.
        session.begin_connect();
        assert!(session.closed());

        // So does an open that closes before the server says anything.
        session.begin_connect();
        session.opened();
        assert!(session.closed());

        session.begin_connect();
        session.opened();
        assert!(session.confirm());
        assert!(!session.is_reconnecting());
    }

    #[test]
    fn auth_failure_ends_reconnect_cycle() {
        let mut session = open_session();
        session.confirm();
        session.closed();
        session.begin_connect();
        session.opened();
        session.auth_failed();
        assert!(!session.is_authenticated());
        assert!(!session.closed());
    }

    #[test]
    fn resumed_session_retries_first_failure() {
        let mut session = Session::resumed("tok");
        session.begin_connect();
        assert!(session.closed());
    }

    #[test]
    fn confirm_flips_only_once() {
        let mut session = open_session();
        assert!(session.confirm());
        assert!(!session.confirm());
    }

    #[test]
    fn commands_require_open_connection() {
        let mut session = Session::new("tok");
        assert!(matches!(
            session.request_phase(GamePhase::Play),
            Err(AdminError::NotConnected)
        ));
        assert_eq!(session.game().current(), None, "rejected request must not apply");
        assert!(matches!(
            session.request_selfie(SelfiePhase::Open),
            Err(AdminError::NotConnected)
        ));
        assert!(matches!(
            session.edit_configuration(ConfigEdit::Bypass(true)),
            Err(AdminError::NotConnected)
        ));
    }

    #[test]
    fn pause_request_sends_state_change_then_configuration() {
        let mut session = open_with_configuration();
        session.apply_state_push("play");

        let frames = session.request_phase(GamePhase::Pause).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0],
            ClientMessage::StateChange {
                state: GamePhase::Pause,
                token: "tok".into()
            }
        );
        assert_eq!(configuration_frames(&frames), 1);
        assert!(session.game().is_paused());
        assert!(!session.game().is_playing());
    }

    #[test]
    fn play_request_stamps_fresh_game_id() {
        let mut session = open_with_configuration();

        let first = session.request_phase(GamePhase::Play).unwrap();
        let first_id = session.configuration().unwrap().game_id().unwrap().to_string();
        let ClientMessage::Configuration { configuration, .. } = &first[1] else {
            panic!("expected configuration frame, got {:?}", first[1]);
        };
        assert_eq!(configuration.game_id(), Some(first_id.as_str()));

        session.request_phase(GamePhase::GameOver).unwrap();
        assert_eq!(
            session.configuration().unwrap().game_id(),
            Some(first_id.as_str()),
            "only game starts replace the id"
        );

        session.request_phase(GamePhase::Play).unwrap();
        assert_ne!(
            session.configuration().unwrap().game_id(),
            Some(first_id.as_str())
        );
    }

    #[test]
    fn resume_does_not_stamp_game_id() {
        let mut session = open_with_configuration();
        session.request_phase(GamePhase::Pause).unwrap();
        let frames = session.request_phase(GamePhase::Pause).unwrap();
        assert!(matches!(
            frames[0],
            ClientMessage::StateChange {
                state: GamePhase::Play,
                ..
            }
        ));
        assert_eq!(session.configuration().unwrap().game_id(), None);
    }

    #[test]
    fn state_change_without_configuration_sends_only_state() {
        let mut session = open_session();
        let frames = session.request_phase(GamePhase::Play).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn selfie_request_is_not_applied_locally() {
        let session = open_session();
        let frame = session.request_selfie(SelfiePhase::Closed).unwrap();
        assert_eq!(frame.kind(), "selfie-state-change");
        assert_eq!(session.selfie().current(), None);
    }

    #[test]
    fn edit_returns_full_snapshot() {
        let mut session = open_with_configuration();
        let frame = session.edit_configuration(ConfigEdit::Scale(0.5)).unwrap();
        let ClientMessage::Configuration { configuration, token } = frame else {
            panic!("expected configuration frame");
        };
        assert_eq!(token, "tok");
        assert_eq!(configuration.scale(), Some(0.5));
        assert_eq!(configuration.get("opacity"), Some(&serde_json::json!(85)));
    }

    #[test]
    fn edit_without_configuration_is_rejected() {
        let mut session = open_session();
        assert!(matches!(
            session.edit_configuration(ConfigEdit::Opacity(1.0)),
            Err(AdminError::NoConfiguration)
        ));
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut session = open_with_configuration();
        session.confirm();
        session.apply_state_push("pause");
        session.apply_selfie_push("open");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.connection, ConnectionState::Open);
        assert!(snapshot.authenticated);
        assert_eq!(snapshot.game_phase, Some(GamePhase::Pause));
        assert!(snapshot.is_paused);
        assert_eq!(snapshot.selfie_state.as_deref(), Some("open"));
        assert_eq!(snapshot.configuration.unwrap().opacity(), Some(85.0));
    }
}
