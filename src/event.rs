//! Events emitted by the admin client.
//!
//! Presentation code consumes these from the receiver returned by
//! [`AdminClient::start`](crate::AdminClient::start) instead of reaching into
//! session state. [`AdminEvent::ConfigurationUpdated`] is the cue to re-render
//! configuration controls; [`AdminEvent::Notice`] carries short text meant
//! for a transient notification.

use crate::protocol::{Configuration, GamePhase};

/// Notice text shown after every configuration push.
pub const CONFIGURATION_UPDATED_NOTICE: &str = "Game Configuration Updated!";

/// A notification from the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminEvent {
    /// A connect attempt to `url` has started.
    Connecting { url: String },
    /// The connection is open and `register` has been sent.
    Connected,
    /// The server has started talking to this session.
    Authenticated,
    /// The server rejected the session token. The connection is closed and
    /// will not be retried until the operator logs in again.
    AuthFailed,
    /// The connection closed or a connect attempt failed.
    Disconnected {
        /// Why, if known.
        reason: Option<String>,
        /// Whether a reconnect attempt has been scheduled.
        will_retry: bool,
    },
    /// The game phase or its pause/play flags changed.
    GameStateChanged {
        phase: Option<GamePhase>,
        is_paused: bool,
        is_playing: bool,
    },
    /// The server pushed a selfie booth phase.
    SelfieStateChanged { state: String },
    /// The server pushed a new configuration snapshot.
    ConfigurationUpdated { configuration: Box<Configuration> },
    /// Short text for a transient operator notification.
    Notice { message: String },
}
