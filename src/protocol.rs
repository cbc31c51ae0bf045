//! Wire types for the Gamebus admin protocol.
//!
//! Every frame is a single JSON object discriminated by a kebab-case `type`
//! field. Outbound frames always carry the operator's session `token`:
//!
//! ```text
//! → {"type":"state-change","state":"pause","token":"…"}
//! ← {"type":"selfie-state","state":"closed"}
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Phases ──────────────────────────────────────────────────────────

/// One discrete phase of the overall game flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum GamePhase {
    /// Title screen.
    Title,
    /// Attract-mode demo.
    Demo,
    /// Game in progress.
    Play,
    /// Game paused.
    Pause,
    /// Final scores.
    GameOver,
}

impl GamePhase {
    /// Every game phase, in the order the operator console lists them.
    pub const ALL: [GamePhase; 5] = [
        GamePhase::Title,
        GamePhase::Demo,
        GamePhase::Play,
        GamePhase::Pause,
        GamePhase::GameOver,
    ];

    /// The wire name of this phase (e.g. `"game-over"`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Demo => "demo",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::GameOver => "game-over",
        }
    }

    /// The label an operator console shows for this phase.
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Demo => "Demo",
            Self::Play => "Start Game",
            Self::Pause => "Pause",
            Self::GameOver => "Game Over",
        }
    }

    /// Look up a phase by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.name() == name)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the selfie booth is accepting photos.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SelfiePhase {
    Open,
    Closed,
}

impl SelfiePhase {
    /// Both booth phases.
    pub const ALL: [SelfiePhase; 2] = [SelfiePhase::Open, SelfiePhase::Closed];

    /// The wire name of this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// The label an operator console shows for this phase.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
        }
    }

    /// Look up a phase by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.name() == name)
    }
}

impl fmt::Display for SelfiePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// Wire key of the opacity field.
pub const OPACITY: &str = "opacity";
/// Wire key of the scale field.
pub const SCALE: &str = "scale";
/// Wire key of the background field.
pub const BACKGROUND: &str = "background";
/// Wire key of the speed field.
pub const SPEED: &str = "speed";
/// Wire key of the golden snitch flag.
pub const GOLDEN_SNITCH: &str = "goldenSnitch";
/// Wire key of the bypass flag.
pub const BYPASS: &str = "bp";
/// Wire key of the current game identifier.
pub const GAME_ID: &str = "gameId";

/// Live game configuration, always transmitted as a whole snapshot.
///
/// Every field is kept exactly as the server sent it and goes back out
/// unchanged on republish, including values the typed accessors cannot read.
/// Only `bp` (bypass) is normalized: a missing or `null` value is stored as
/// `false`.
///
/// # Example
///
/// ```
/// use gamebus_admin_client::protocol::Configuration;
///
/// let config: Configuration =
///     serde_json::from_str(r#"{"opacity":"85","speed":3,"bp":null}"#).unwrap();
/// assert_eq!(config.opacity(), Some(85.0));
/// assert!(!config.bp);
///
/// let out = serde_json::to_value(&config).unwrap();
/// assert_eq!(out["opacity"], "85");
/// assert_eq!(out["speed"], 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Bypass flag.
    #[serde(default, deserialize_with = "null_as_false")]
    pub bp: bool,
    /// Every other field, verbatim.
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Configuration {
    /// The raw value of `key`. `bp` is read through [`Configuration::bp`].
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set `key` to `value`. Setting `bp` stores `true` only for JSON `true`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if key == BYPASS {
            self.bp = value == Value::Bool(true);
        } else {
            self.fields.insert(key, value);
        }
    }

    /// All fields except `bp`, as received or last set.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn opacity(&self) -> Option<f64> {
        self.number(OPACITY)
    }

    pub fn scale(&self) -> Option<f64> {
        self.number(SCALE)
    }

    pub fn speed(&self) -> Option<f64> {
        self.number(SPEED)
    }

    /// The background as text. Numbers are rendered as written.
    pub fn background(&self) -> Option<String> {
        match self.fields.get(BACKGROUND)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn golden_snitch(&self) -> Option<bool> {
        self.fields.get(GOLDEN_SNITCH)?.as_bool()
    }

    pub fn game_id(&self) -> Option<&str> {
        self.fields.get(GAME_ID)?.as_str()
    }

    // Older consoles published numbers as the raw text of an input field.
    fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

// ── Messages ────────────────────────────────────────────────────────

/// Frames sent from the admin console to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Sent once after every successful open.
    Register { token: String },
    /// Move the game to a new phase.
    StateChange { state: GamePhase, token: String },
    /// Open or close the selfie booth.
    SelfieStateChange { state: SelfiePhase, token: String },
    /// The full current configuration snapshot.
    Configuration {
        configuration: Configuration,
        token: String,
    },
}

impl ClientMessage {
    /// The wire `type` of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::StateChange { .. } => "state-change",
            Self::SelfieStateChange { .. } => "selfie-state-change",
            Self::Configuration { .. } => "configuration",
        }
    }
}

/// Frames pushed from the server to the admin console.
///
/// Types this client does not know decode as [`ServerMessage::Unknown`] so the
/// protocol can grow without breaking older consoles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// The session token was rejected.
    AuthFailed,
    /// The current game phase, by wire name.
    State { state: String },
    /// The current selfie booth phase, by wire name.
    SelfieState { state: String },
    /// A new configuration snapshot.
    Configuration { configuration: Configuration },
    /// Any type this client does not handle.
    #[serde(other)]
    Unknown,
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
    use serde_json::json;

    #[test]
    fn game_phase_names_and_labels() {
        assert_eq!(GamePhase::GameOver.name(), "game-over");
        assert_eq!(GamePhase::Play.label(), "Start Game");
        assert_eq!(GamePhase::from_name("pause"), Some(GamePhase::Pause));
        assert_eq!(GamePhase::from_name("start-game"), None);
        for phase in GamePhase::ALL {
            assert_eq!(
                serde_json::to_value(phase).unwrap(),
                json!(phase.name()),
                "serde name and wire name must agree for {phase:?}"
            );
        }
    }

    #[test]
    fn selfie_phase_names_and_labels() {
        assert_eq!(SelfiePhase::from_name("closed"), Some(SelfiePhase::Closed));
        assert_eq!(SelfiePhase::Open.label(), "Open");
        assert_eq!(SelfiePhase::from_name("ajar"), None);
    }

    #[test]
    fn configuration_missing_bp_becomes_false() {
        let config: Configuration = serde_json::from_value(json!({ "opacity": 85 })).unwrap();
        assert!(!config.bp);
        assert_eq!(config.opacity(), Some(85.0));
    }

    #[test]
    fn configuration_null_bp_becomes_false() {
        let config: Configuration = serde_json::from_value(json!({ "bp": null })).unwrap();
        assert!(!config.bp);
        assert_eq!(serde_json::to_value(&config).unwrap(), json!({ "bp": false }));
    }

    #[test]
    fn configuration_reads_numeric_strings() {
        let config: Configuration = serde_json::from_value(json!({
            "opacity": "70",
            "scale": 0.3,
            "speed": " 2.5 ",
            "background": 3
        }))
        .unwrap();
        assert_eq!(config.opacity(), Some(70.0));
        assert_eq!(config.scale(), Some(0.3));
        assert_eq!(config.speed(), Some(2.5));
        assert_eq!(config.background().as_deref(), Some("3"));
    }

    #[test]
    fn configuration_keeps_unreadable_values() {
        let config: Configuration =
            serde_json::from_value(json!({ "opacity": "", "goldenSnitch": "yes" })).unwrap();
        assert_eq!(config.opacity(), None);
        assert_eq!(config.golden_snitch(), None);
        assert_eq!(config.get("opacity"), Some(&json!("")));
    }

    #[test]
    fn configuration_set_routes_bp_to_flag() {
        let mut config = Configuration::default();
        config.set("bp", true);
        config.set("gameId", "abc");
        assert!(config.bp);
        assert_eq!(config.get("bp"), None);
        assert_eq!(config.game_id(), Some("abc"));
    }

    #[test]
    fn configuration_keeps_unknown_fields() {
        let config: Configuration = serde_json::from_value(json!({
            "goldenSnitch": true,
            "gameId": "abc",
            "points": { "red": 10 }
        }))
        .unwrap();
        assert_eq!(config.golden_snitch(), Some(true));
        assert_eq!(config.game_id(), Some("abc"));
        assert_eq!(config.get("points"), Some(&json!({ "red": 10 })));

        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out["points"], json!({ "red": 10 }));
        assert_eq!(out["gameId"], json!("abc"));
        assert_eq!(out["bp"], json!(false));
    }

    #[test]
    fn client_message_kind_matches_wire_type() {
        let msg = ClientMessage::SelfieStateChange {
            state: SelfiePhase::Open,
            token: "t".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], json!(msg.kind()));
    }

    #[test]
    fn server_message_unknown_type_is_tolerated() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"leaderboard","top":[1,2,3]}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn server_message_without_type_is_rejected() {
        assert!(serde_json::from_str::<ServerMessage>(r#"{"state":"play"}"#).is_err());
    }
}
