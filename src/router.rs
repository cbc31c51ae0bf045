//! Inbound frame classification and outbound frame encoding.

use tracing::{debug, warn};

use crate::error::Result;
use crate::event::{AdminEvent, CONFIGURATION_UPDATED_NOTICE};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::Session;

/// What routing one inbound frame did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// The frame could not be decoded and was dropped. Nothing changed.
    Dropped,
    /// The server rejected the token. The caller must close the connection.
    AuthFailed,
    /// The frame was applied; these events describe the changes.
    Applied(Vec<AdminEvent>),
}

/// Decode one inbound frame.
///
/// # Errors
///
/// Returns [`AdminError::Serialization`](crate::AdminError::Serialization) if the
/// frame is not a JSON object with a `type` field, or a known type is missing
/// its fields.
pub fn decode(raw: &str) -> Result<ServerMessage> {
    Ok(serde_json::from_str(raw)?)
}

/// Encode one outbound frame.
///
/// # Errors
///
/// Returns [`AdminError::Serialization`](crate::AdminError::Serialization) if
/// the message cannot be serialized.
pub fn encode(message: &ClientMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode `raw` and apply it to `session`.
///
/// Every decodable frame other than `auth-failed` confirms the session,
/// including frames of a type this client ignores.
pub fn route(session: &mut Session, raw: &str) -> Routed {
    let message = match decode(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!("dropping malformed frame: {e}; raw frame: {raw}");
            return Routed::Dropped;
        }
    };

    if message == ServerMessage::AuthFailed {
        session.auth_failed();
        return Routed::AuthFailed;
    }

    let mut events = Vec::new();
    if session.confirm() {
        debug!("session authenticated");
        events.push(AdminEvent::Authenticated);
    }

    match message {
        ServerMessage::State { state } => match session.apply_state_push(&state) {
            Some(phase) => {
                debug!(phase = %phase, "game state pushed");
                let game = session.game();
                events.push(AdminEvent::GameStateChanged {
                    phase: Some(phase),
                    is_paused: game.is_paused(),
                    is_playing: game.is_playing(),
                });
            }
            None => debug!(state = %state, "ignoring unknown game state"),
        },
        ServerMessage::SelfieState { state } => {
            debug!(state = %state, "selfie state pushed");
            session.apply_selfie_push(state.clone());
            events.push(AdminEvent::SelfieStateChanged { state });
        }
        ServerMessage::Configuration { configuration } => {
            debug!("configuration pushed");
            session.apply_configuration_push(configuration.clone());
            events.push(AdminEvent::ConfigurationUpdated {
                configuration: Box::new(configuration),
            });
            events.push(AdminEvent::Notice {
                message: CONFIGURATION_UPDATED_NOTICE.to_string(),
            });
        }
        ServerMessage::Unknown => debug!("ignoring frame of unknown type"),
        ServerMessage::AuthFailed => {}
    }

    Routed::Applied(events)
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
    use crate::protocol::GamePhase;
    use crate::session::ConnectionState;

    fn open_session() -> Session {
        let mut session = Session::new("tok");
        session.begin_connect();
        session.opened();
        session
    }

    #[test]
    fn state_push_sets_phase_and_flags() {
        let mut session = open_session();
        let routed = route(&mut session, r#"{"type":"state","state":"play"}"#);
        assert_eq!(
            routed,
            Routed::Applied(vec![
                AdminEvent::Authenticated,
                AdminEvent::GameStateChanged {
                    phase: Some(GamePhase::Play),
                    is_paused: false,
                    is_playing: true,
                },
            ])
        );
        assert_eq!(session.game().current(), Some(GamePhase::Play));
    }

    #[test]
    fn selfie_push_is_last_write_wins() {
        let mut session = open_session();
        route(&mut session, r#"{"type":"selfie-state","state":"open"}"#);
        route(&mut session, r#"{"type":"selfie-state","state":"closed"}"#);
        assert_eq!(session.selfie().current(), Some("closed"));
    }

    #[test]
    fn configuration_push_normalizes_bp_and_notifies() {
        let mut session = open_session();
        let routed = route(
            &mut session,
            r#"{"type":"configuration","configuration":{"opacity":85,"bp":null}}"#,
        );
        let Routed::Applied(events) = routed else {
            panic!("expected Applied");
        };
        assert!(events.contains(&AdminEvent::Notice {
            message: "Game Configuration Updated!".into()
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, AdminEvent::ConfigurationUpdated { .. })));
        assert!(!session.configuration().unwrap().bp);
    }

    #[test]
    fn configuration_push_keeps_bp_true() {
        let mut session = open_session();
        route(
            &mut session,
            r#"{"type":"configuration","configuration":{"bp":true}}"#,
        );
        assert!(session.configuration().unwrap().bp);
    }

    #[test]
    fn configuration_push_with_blank_field_is_stored() {
        let mut session = open_session();
        let routed = route(
            &mut session,
            r#"{"type":"configuration","configuration":{"opacity":"","bp":false}}"#,
        );
        assert!(matches!(routed, Routed::Applied(_)));
        assert!(session.is_authenticated());
        let configuration = session.configuration().unwrap();
        assert_eq!(configuration.get("opacity"), Some(&serde_json::json!("")));
        assert_eq!(configuration.opacity(), None);
    }

    #[test]
    fn auth_failed_closes_session() {
        let mut session = open_session();
        session.confirm();
        assert_eq!(
            route(&mut session, r#"{"type":"auth-failed"}"#),
            Routed::AuthFailed
        );
        assert!(!session.is_authenticated());
        assert_eq!(session.connection(), ConnectionState::Closed);
    }

    #[test]
    fn malformed_frames_change_nothing() {
        for raw in ["not json", "[]", r#"{"state":"play"}"#, r#"{"type":"state"}"#] {
            let mut session = open_session();
            assert_eq!(route(&mut session, raw), Routed::Dropped, "{raw}");
            assert!(!session.is_authenticated(), "{raw}");
        }
    }

    #[test]
    fn unknown_type_still_confirms_session() {
        let mut session = open_session();
        let routed = route(&mut session, r#"{"type":"leaderboard"}"#);
        assert_eq!(routed, Routed::Applied(vec![AdminEvent::Authenticated]));
        assert!(session.is_authenticated());
    }

    #[test]
    fn repeated_frames_confirm_idempotently() {
        let mut session = open_session();
        route(&mut session, r#"{"type":"selfie-state","state":"open"}"#);
        let routed = route(&mut session, r#"{"type":"selfie-state","state":"open"}"#);
        assert_eq!(
            routed,
            Routed::Applied(vec![AdminEvent::SelfieStateChanged {
                state: "open".into()
            }])
        );
    }

    #[test]
    fn encode_includes_type_and_token() {
        let json = encode(&ClientMessage::Register {
            token: "tok".into(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "register", "token": "tok" }));
    }
}
